//! Persistence port for recurrence definitions, overrides and occupancy.
//!
//! The core never talks to a database directly. Implementations live in
//! `navette-db` (Postgres) and `navette-planning::memory` (in-process).

use std::collections::BTreeMap;
use std::future::Future;

use chrono::NaiveDate;

use crate::conflict::{OccupancySet, ResourceKey};
use crate::occurrence::OccurrenceOverride;
use crate::recurrence::RecurrenceDefinition;
use crate::types::DbId;

/// Errors reported by a [`ScheduleStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store refused the write because a uniqueness rule was violated,
    /// typically two owners racing for the same day/parity cell.
    #[error("Store conflict: {0}")]
    Conflict(String),

    /// Stored data could not be mapped back into domain types.
    #[error("Corrupt stored data: {0}")]
    Corrupt(String),

    /// The backend could not be reached or failed mid-operation.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Load and commit operations the scheduling core depends on.
pub trait ScheduleStore: Send + Sync {
    /// Claims held on `key` by every owner except `exclude_owner_id`.
    fn get_occupancy(
        &self,
        key: &ResourceKey,
        exclude_owner_id: DbId,
    ) -> impl Future<Output = Result<OccupancySet, StoreError>> + Send;

    /// The live definition of `owner_id`, or `None` if absent or deleted.
    fn get_recurrence_definition(
        &self,
        owner_id: DbId,
    ) -> impl Future<Output = Result<Option<RecurrenceDefinition>, StoreError>> + Send;

    /// Overrides of `owner_id` dated within the closed range `[from, to]`.
    fn list_overrides(
        &self,
        owner_id: DbId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> impl Future<Output = Result<BTreeMap<NaiveDate, OccurrenceOverride>, StoreError>> + Send;

    /// Insert or replace the definition of `owner_id`.
    fn save_recurrence_definition(
        &self,
        owner_id: DbId,
        definition: &RecurrenceDefinition,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Insert or replace the override of `owner_id` for `ov.date`.
    fn save_override(
        &self,
        owner_id: DbId,
        ov: &OccurrenceOverride,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Soft-delete the definition of `owner_id`. Returns `false` if there was
    /// no live definition.
    fn delete_recurrence_definition(
        &self,
        owner_id: DbId,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;
}
