//! Rows of `occurrence_overrides`.

use chrono::{NaiveDate, NaiveTime};
use navette_core::occurrence::{OccurrenceOverride, OccurrenceStatus};
use navette_core::store::StoreError;
use navette_core::types::{DbId, Timestamp};
use sqlx::FromRow;

use super::recurrence::corrupt;

/// A row from the `occurrence_overrides` table.
#[derive(Debug, Clone, FromRow)]
pub struct OverrideRow {
    pub owner_id: DbId,
    pub date: NaiveDate,
    pub status: String,
    pub substitute_operator_id: Option<DbId>,
    pub substitute_resource_id: Option<DbId>,
    pub adjusted_time: Option<NaiveTime>,
    pub notes: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<OverrideRow> for OccurrenceOverride {
    type Error = StoreError;

    fn try_from(row: OverrideRow) -> Result<Self, Self::Error> {
        let status: OccurrenceStatus = row.status.parse().map_err(corrupt)?;
        Ok(OccurrenceOverride {
            date: row.date,
            status,
            substitute_operator_id: row.substitute_operator_id,
            substitute_resource_id: row.substitute_resource_id,
            adjusted_time: row.adjusted_time,
            notes: row.notes,
        })
    }
}
