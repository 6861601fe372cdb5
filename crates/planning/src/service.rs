//! Planning service: the operations exposed to planning views and forms.
//!
//! Reads go through the store, computation through the pure core. The caller
//! always supplies the date window; nothing here looks at the current date.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;
use navette_core::claims::{DayClaimSet, Direction};
use navette_core::conflict::{
    conflicting_cells, find_conflicts_for_set, Conflict, OccupancySet, ResourceKey,
};
use navette_core::error::CoreError;
use navette_core::occurrence::{materialize, Occurrence, OccurrenceOverride};
use navette_core::recurrence::{is_active_on, RecurrenceDefinition};
use navette_core::store::ScheduleStore;
use navette_core::types::DbId;

use crate::config::ScheduleConfig;
use crate::error::PlanningResult;

/// Pre-submit validation of a claim set against a snapshot of occupancy.
///
/// One entry per conflicting candidate claim, in weekday order.
pub fn validate_claim_set(candidates: &DayClaimSet, occupancy: &OccupancySet) -> Vec<Conflict> {
    find_conflicts_for_set(occupancy, candidates)
}

/// Scheduling operations over a [`ScheduleStore`].
pub struct PlanningService<S> {
    store: Arc<S>,
    config: ScheduleConfig,
}

impl<S> Clone for PlanningService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config,
        }
    }
}

impl<S: ScheduleStore> PlanningService<S> {
    pub fn new(store: Arc<S>, config: ScheduleConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &ScheduleConfig {
        &self.config
    }

    /// Reject windows longer than the configured maximum.
    ///
    /// Inverted windows are allowed; they simply contain no dates.
    fn check_window(&self, from: NaiveDate, to: NaiveDate) -> Result<(), CoreError> {
        let days = (to - from).num_days() + 1;
        if days > self.config.max_window_days {
            return Err(CoreError::Validation(format!(
                "Date window of {days} days exceeds the maximum of {} days",
                self.config.max_window_days
            )));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Occurrences of every owner in `owner_ids` over the closed range
    /// `[from, to]`, ordered by date, owner, then direction.
    ///
    /// Owners without a live definition (never configured, or deleted) are
    /// skipped, so orphaned overrides never resurface.
    pub async fn query_occurrences(
        &self,
        owner_ids: &[DbId],
        from: NaiveDate,
        to: NaiveDate,
    ) -> PlanningResult<Vec<Occurrence>> {
        self.check_window(from, to)?;
        if from > to {
            return Ok(Vec::new());
        }

        let owners: BTreeSet<DbId> = owner_ids.iter().copied().collect();
        let mut occurrences = Vec::new();
        for owner_id in owners {
            let Some(definition) = self.store.get_recurrence_definition(owner_id).await? else {
                tracing::debug!(owner_id, "No live recurrence definition, skipping owner");
                continue;
            };
            let overrides = self.store.list_overrides(owner_id, from, to).await?;
            occurrences.extend(materialize(&definition, &overrides, from, to));
        }
        occurrences.sort_by_key(|o| (o.date, o.owner_id, o.direction));

        tracing::debug!(
            owners = owner_ids.len(),
            count = occurrences.len(),
            %from,
            %to,
            "Materialized occurrences"
        );
        Ok(occurrences)
    }

    /// Live definition of `owner_id`.
    pub async fn get_definition(&self, owner_id: DbId) -> PlanningResult<RecurrenceDefinition> {
        self.store
            .get_recurrence_definition(owner_id)
            .await?
            .ok_or_else(|| {
                CoreError::NotFound {
                    entity: "RecurrenceDefinition",
                    id: owner_id,
                }
                .into()
            })
    }

    /// Overrides of `owner_id` within the closed range `[from, to]`.
    pub async fn list_overrides(
        &self,
        owner_id: DbId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> PlanningResult<Vec<OccurrenceOverride>> {
        self.check_window(from, to)?;
        let overrides = self.store.list_overrides(owner_id, from, to).await?;
        Ok(overrides.into_values().collect())
    }

    /// Load the occupancy for `key` (excluding `exclude_owner_id`) and
    /// validate `candidates` against it.
    pub async fn validate_claims_for(
        &self,
        key: &ResourceKey,
        exclude_owner_id: DbId,
        candidates: &DayClaimSet,
    ) -> PlanningResult<Vec<Conflict>> {
        let occupancy = self.store.get_occupancy(key, exclude_owner_id).await?;
        Ok(validate_claim_set(candidates, &occupancy))
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Validate and save a definition as one unit.
    ///
    /// Every claimed cell of both directions is checked first; a single
    /// conflict rejects the whole definition with [`CoreError::Conflicts`]
    /// listing all conflicting cells.
    pub async fn save_definition(&self, definition: &RecurrenceDefinition) -> PlanningResult<()> {
        definition.validate()?;

        let mut conflicts = Vec::new();
        for direction in Direction::BOTH {
            let occupancy = self
                .store
                .get_occupancy(&definition.resource_key(direction), definition.owner_id)
                .await?;
            conflicts.extend(conflicting_cells(&occupancy, definition.claims(direction)));
        }
        if !conflicts.is_empty() {
            tracing::info!(
                owner_id = definition.owner_id,
                conflicts = conflicts.len(),
                "Rejected recurrence definition with conflicting claims"
            );
            return Err(CoreError::Conflicts(conflicts).into());
        }

        self.store
            .save_recurrence_definition(definition.owner_id, definition)
            .await?;
        tracing::info!(owner_id = definition.owner_id, "Saved recurrence definition");
        Ok(())
    }

    /// Record an override ("avenant") for one date of `owner_id`.
    ///
    /// The owner must run on that date in at least one direction, and the
    /// status change relative to any earlier override must be allowed.
    pub async fn record_override(
        &self,
        owner_id: DbId,
        ov: &OccurrenceOverride,
    ) -> PlanningResult<()> {
        ov.validate()?;
        let definition = self.get_definition(owner_id).await?;

        let runs = Direction::BOTH
            .iter()
            .any(|&direction| is_active_on(&definition, direction, ov.date));
        if !runs {
            return Err(CoreError::Validation(format!(
                "Owner {owner_id} has no scheduled run on {}",
                ov.date
            ))
            .into());
        }

        let existing = self.store.list_overrides(owner_id, ov.date, ov.date).await?;
        if let Some(previous) = existing.get(&ov.date) {
            previous.status.validate_transition(ov.status)?;
        }

        self.store.save_override(owner_id, ov).await?;
        tracing::info!(
            owner_id,
            date = %ov.date,
            status = %ov.status,
            "Recorded occurrence override"
        );
        Ok(())
    }

    /// Soft-delete the definition of `owner_id`.
    pub async fn delete_definition(&self, owner_id: DbId) -> PlanningResult<()> {
        if self.store.delete_recurrence_definition(owner_id).await? {
            tracing::info!(owner_id, "Deleted recurrence definition");
            Ok(())
        } else {
            Err(CoreError::NotFound {
                entity: "RecurrenceDefinition",
                id: owner_id,
            }
            .into())
        }
    }
}
