//! [`ScheduleStore`] backed by Postgres.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use navette_core::conflict::{OccupancySet, OccupiedClaim, ResourceKey};
use navette_core::occurrence::OccurrenceOverride;
use navette_core::recurrence::RecurrenceDefinition;
use navette_core::store::{ScheduleStore, StoreError};
use navette_core::types::DbId;

use crate::error::store_error;
use crate::repositories::{OccupancyRepo, OverrideRepo, RecurrenceRepo};
use crate::DbPool;

/// Postgres implementation of the scheduling store port.
#[derive(Debug, Clone)]
pub struct PgScheduleStore {
    pool: DbPool,
}

impl PgScheduleStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

impl ScheduleStore for PgScheduleStore {
    async fn get_occupancy(
        &self,
        key: &ResourceKey,
        exclude_owner_id: DbId,
    ) -> Result<OccupancySet, StoreError> {
        let rows = OccupancyRepo::list_for_key(&self.pool, key, exclude_owner_id)
            .await
            .map_err(store_error)?;
        let entries = rows
            .into_iter()
            .map(OccupiedClaim::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(OccupancySet::from_entries(entries))
    }

    async fn get_recurrence_definition(
        &self,
        owner_id: DbId,
    ) -> Result<Option<RecurrenceDefinition>, StoreError> {
        let Some(row) = RecurrenceRepo::find_live(&self.pool, owner_id)
            .await
            .map_err(store_error)?
        else {
            return Ok(None);
        };
        let claims = RecurrenceRepo::list_claims(&self.pool, owner_id)
            .await
            .map_err(store_error)?;
        row.into_definition(claims).map(Some)
    }

    async fn list_overrides(
        &self,
        owner_id: DbId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<BTreeMap<NaiveDate, OccurrenceOverride>, StoreError> {
        if from > to {
            return Ok(BTreeMap::new());
        }
        let rows = OverrideRepo::list_in_range(&self.pool, owner_id, from, to)
            .await
            .map_err(store_error)?;
        rows.into_iter()
            .map(|row| OccurrenceOverride::try_from(row).map(|ov| (ov.date, ov)))
            .collect()
    }

    async fn save_recurrence_definition(
        &self,
        owner_id: DbId,
        definition: &RecurrenceDefinition,
    ) -> Result<(), StoreError> {
        RecurrenceRepo::upsert(&self.pool, owner_id, definition)
            .await
            .map_err(|e| {
                let err = store_error(e);
                tracing::warn!(owner_id, error = %err, "Failed to save recurrence definition");
                err
            })
    }

    async fn save_override(
        &self,
        owner_id: DbId,
        ov: &OccurrenceOverride,
    ) -> Result<(), StoreError> {
        OverrideRepo::upsert(&self.pool, owner_id, ov)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn delete_recurrence_definition(&self, owner_id: DbId) -> Result<bool, StoreError> {
        RecurrenceRepo::soft_delete(&self.pool, owner_id)
            .await
            .map_err(store_error)
    }
}
