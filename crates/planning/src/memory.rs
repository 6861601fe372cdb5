//! In-process [`ScheduleStore`] for tests, demos and local tooling.
//!
//! Enforces the same per-cell uniqueness rule as the Postgres schema, so a
//! racing double booking surfaces as [`StoreError::Conflict`] here too.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::NaiveDate;
use navette_core::claims::Direction;
use navette_core::conflict::{conflicting_cells, OccupancySet, ResourceKey};
use navette_core::occurrence::OccurrenceOverride;
use navette_core::recurrence::RecurrenceDefinition;
use navette_core::store::{ScheduleStore, StoreError};
use navette_core::types::DbId;

#[derive(Debug, Default)]
struct Inner {
    definitions: BTreeMap<DbId, RecurrenceDefinition>,
    overrides: BTreeMap<(DbId, NaiveDate), OccurrenceOverride>,
    fail_saves: bool,
    save_delay: Option<Duration>,
    definition_saves: usize,
}

/// Cheaply cloneable shared store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent save fail with [`StoreError::Unavailable`].
    pub fn set_fail_saves(&self, fail: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.fail_saves = fail;
        }
    }

    /// Delay every definition save, simulating a slow backend.
    pub fn set_save_delay(&self, delay: Option<Duration>) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.save_delay = delay;
        }
    }

    /// Number of successful definition saves so far.
    pub fn definition_saves(&self) -> usize {
        self.inner.lock().map(|i| i.definition_saves).unwrap_or(0)
    }

    /// Insert a definition directly, bypassing conflict checks.
    pub fn seed_definition(&self, definition: RecurrenceDefinition) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.definitions.insert(definition.owner_id, definition);
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".into()))
    }

    fn save_delay(&self) -> Result<Option<Duration>, StoreError> {
        Ok(self.lock()?.save_delay)
    }
}

fn occupancy_of(inner: &Inner, key: &ResourceKey, exclude_owner_id: DbId) -> OccupancySet {
    let mut occupancy = OccupancySet::new();
    for def in inner.definitions.values() {
        if def.owner_id == exclude_owner_id || def.resource_scope != key.scope {
            continue;
        }
        occupancy.extend_from_set(def.owner_id, &def.owner_label, def.claims(key.direction));
    }
    occupancy
}

impl ScheduleStore for InMemoryStore {
    async fn get_occupancy(
        &self,
        key: &ResourceKey,
        exclude_owner_id: DbId,
    ) -> Result<OccupancySet, StoreError> {
        let inner = self.lock()?;
        Ok(occupancy_of(&inner, key, exclude_owner_id))
    }

    async fn get_recurrence_definition(
        &self,
        owner_id: DbId,
    ) -> Result<Option<RecurrenceDefinition>, StoreError> {
        Ok(self.lock()?.definitions.get(&owner_id).cloned())
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
        let inner = self.lock()?;
        Ok(inner
            .overrides
            .range((owner_id, from)..=(owner_id, to))
            .map(|(&(_, date), ov)| (date, ov.clone()))
            .collect())
    }

    async fn save_recurrence_definition(
        &self,
        owner_id: DbId,
        definition: &RecurrenceDefinition,
    ) -> Result<(), StoreError> {
        if let Some(delay) = self.save_delay()? {
            tokio::time::sleep(delay).await;
        }

        let mut inner = self.lock()?;
        if inner.fail_saves {
            return Err(StoreError::Unavailable("simulated save failure".into()));
        }
        for direction in Direction::BOTH {
            let key = definition.resource_key(direction);
            let taken = conflicting_cells(
                &occupancy_of(&inner, &key, owner_id),
                definition.claims(direction),
            );
            if let Some(first) = taken.first() {
                return Err(StoreError::Conflict(format!("{key}: {first}")));
            }
        }

        let mut stored = definition.clone();
        stored.owner_id = owner_id;
        inner.definitions.insert(owner_id, stored);
        inner.definition_saves += 1;
        Ok(())
    }

    async fn save_override(
        &self,
        owner_id: DbId,
        ov: &OccurrenceOverride,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        if inner.fail_saves {
            return Err(StoreError::Unavailable("simulated save failure".into()));
        }
        inner.overrides.insert((owner_id, ov.date), ov.clone());
        Ok(())
    }

    async fn delete_recurrence_definition(&self, owner_id: DbId) -> Result<bool, StoreError> {
        let mut inner = self.lock()?;
        if inner.definitions.remove(&owner_id).is_none() {
            return Ok(false);
        }
        inner.overrides.retain(|&(owner, _), _| owner != owner_id);
        Ok(true)
    }
}
