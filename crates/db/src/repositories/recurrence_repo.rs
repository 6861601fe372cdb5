//! Repository for `recurrence_definitions` and their day claims.
//!
//! A definition is written as one transaction: the definition row, its claim
//! rows and the expanded `claim_cells` rows whose unique constraint rejects
//! double bookings.

use navette_core::claims::Direction;
use navette_core::recurrence::RecurrenceDefinition;
use navette_core::types::DbId;
use sqlx::PgPool;

use crate::models::recurrence::{cell_label, DayClaimRow, RecurrenceRow};

/// Column list for `recurrence_definitions` queries.
const COLUMNS: &str = "\
    owner_id, owner_label, resource_scope, valid_from, valid_until, \
    time_of_day, operator_id, resource_id, created_at, updated_at, deleted_at";

/// Provides access to recurrence definitions.
pub struct RecurrenceRepo;

impl RecurrenceRepo {
    /// Find the live (not soft-deleted) definition of an owner.
    pub async fn find_live(
        pool: &PgPool,
        owner_id: DbId,
    ) -> Result<Option<RecurrenceRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM recurrence_definitions \
             WHERE owner_id = $1 AND deleted_at IS NULL"
        );
        sqlx::query_as::<_, RecurrenceRow>(&query)
            .bind(owner_id)
            .fetch_optional(pool)
            .await
    }

    /// All claim rows of an owner, ordered by direction then weekday.
    pub async fn list_claims(
        pool: &PgPool,
        owner_id: DbId,
    ) -> Result<Vec<DayClaimRow>, sqlx::Error> {
        sqlx::query_as::<_, DayClaimRow>(
            "SELECT direction, weekday, parity FROM recurrence_day_claims \
             WHERE owner_id = $1 \
             ORDER BY direction, weekday",
        )
        .bind(owner_id)
        .fetch_all(pool)
        .await
    }

    /// Insert or replace an owner's definition, claims and cells.
    ///
    /// Saving a soft-deleted owner revives it.
    pub async fn upsert(
        pool: &PgPool,
        owner_id: DbId,
        definition: &RecurrenceDefinition,
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            "INSERT INTO recurrence_definitions \
                 (owner_id, owner_label, resource_scope, valid_from, valid_until, \
                  time_of_day, operator_id, resource_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (owner_id) DO UPDATE SET \
                 owner_label = EXCLUDED.owner_label, \
                 resource_scope = EXCLUDED.resource_scope, \
                 valid_from = EXCLUDED.valid_from, \
                 valid_until = EXCLUDED.valid_until, \
                 time_of_day = EXCLUDED.time_of_day, \
                 operator_id = EXCLUDED.operator_id, \
                 resource_id = EXCLUDED.resource_id, \
                 updated_at = NOW(), \
                 deleted_at = NULL",
        )
        .bind(owner_id)
        .bind(&definition.owner_label)
        .bind(&definition.resource_scope)
        .bind(definition.valid_from)
        .bind(definition.valid_until)
        .bind(definition.time_of_day)
        .bind(definition.operator_id)
        .bind(definition.resource_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM recurrence_day_claims WHERE owner_id = $1")
            .bind(owner_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM claim_cells WHERE owner_id = $1")
            .bind(owner_id)
            .execute(&mut *tx)
            .await?;

        for direction in Direction::BOTH {
            let claims = definition.claims(direction);
            for claim in claims.iter() {
                sqlx::query(
                    "INSERT INTO recurrence_day_claims (owner_id, direction, weekday, parity) \
                     VALUES ($1, $2, $3, $4)",
                )
                .bind(owner_id)
                .bind(direction.as_str())
                .bind(i16::from(claim.weekday))
                .bind(claim.parity.as_str())
                .execute(&mut *tx)
                .await?;
            }
            for (weekday, cell) in claims.cells() {
                sqlx::query(
                    "INSERT INTO claim_cells \
                         (resource_scope, direction, weekday, week_parity, owner_id) \
                     VALUES ($1, $2, $3, $4, $5)",
                )
                .bind(&definition.resource_scope)
                .bind(direction.as_str())
                .bind(i16::from(weekday))
                .bind(cell_label(cell))
                .bind(owner_id)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        tracing::debug!(owner_id, "Upserted recurrence definition");
        Ok(())
    }

    /// Soft-delete a definition and release its claim cells.
    ///
    /// Returns `false` if there was no live definition. Claim rows are kept
    /// for audit. Overrides are purged so a later re-save of the same owner
    /// starts without them.
    pub async fn soft_delete(pool: &PgPool, owner_id: DbId) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let result = sqlx::query(
            "UPDATE recurrence_definitions SET deleted_at = NOW(), updated_at = NOW() \
             WHERE owner_id = $1 AND deleted_at IS NULL",
        )
        .bind(owner_id)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }
        sqlx::query("DELETE FROM claim_cells WHERE owner_id = $1")
            .bind(owner_id)
            .execute(&mut *tx)
            .await?;
        let purged = sqlx::query("DELETE FROM occurrence_overrides WHERE owner_id = $1")
            .bind(owner_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        tracing::debug!(
            owner_id,
            purged_overrides = purged.rows_affected(),
            "Soft-deleted recurrence definition"
        );
        Ok(true)
    }
}
