//! Repository for the `occurrence_overrides` table.

use chrono::NaiveDate;
use navette_core::occurrence::OccurrenceOverride;
use navette_core::types::DbId;
use sqlx::PgPool;

use crate::models::occurrence_override::OverrideRow;

/// Column list for `occurrence_overrides` queries.
const COLUMNS: &str = "\
    owner_id, date, status, substitute_operator_id, substitute_resource_id, \
    adjusted_time, notes, created_at, updated_at";

/// Provides access to date-specific overrides.
pub struct OverrideRepo;

impl OverrideRepo {
    /// Overrides of an owner dated within `[from, to]`, oldest first.
    pub async fn list_in_range(
        pool: &PgPool,
        owner_id: DbId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<OverrideRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM occurrence_overrides \
             WHERE owner_id = $1 AND date BETWEEN $2 AND $3 \
             ORDER BY date"
        );
        sqlx::query_as::<_, OverrideRow>(&query)
            .bind(owner_id)
            .bind(from)
            .bind(to)
            .fetch_all(pool)
            .await
    }

    /// Insert or replace the override of an owner for `ov.date`.
    pub async fn upsert(
        pool: &PgPool,
        owner_id: DbId,
        ov: &OccurrenceOverride,
    ) -> Result<OverrideRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO occurrence_overrides \
                 (owner_id, date, status, substitute_operator_id, substitute_resource_id, \
                  adjusted_time, notes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (owner_id, date) DO UPDATE SET \
                 status = EXCLUDED.status, \
                 substitute_operator_id = EXCLUDED.substitute_operator_id, \
                 substitute_resource_id = EXCLUDED.substitute_resource_id, \
                 adjusted_time = EXCLUDED.adjusted_time, \
                 notes = EXCLUDED.notes, \
                 updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, OverrideRow>(&query)
            .bind(owner_id)
            .bind(ov.date)
            .bind(ov.status.as_str())
            .bind(ov.substitute_operator_id)
            .bind(ov.substitute_resource_id)
            .bind(ov.adjusted_time)
            .bind(&ov.notes)
            .fetch_one(pool)
            .await
    }
}
