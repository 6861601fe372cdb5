//! Read side of claim occupancy: who holds which weekday on a resource key.

use navette_core::conflict::ResourceKey;
use navette_core::types::DbId;
use sqlx::PgPool;

use crate::models::recurrence::OccupiedClaimRow;

/// Provides occupancy snapshots for conflict detection.
pub struct OccupancyRepo;

impl OccupancyRepo {
    /// Live claims on `key` held by every owner except `exclude_owner_id`.
    pub async fn list_for_key(
        pool: &PgPool,
        key: &ResourceKey,
        exclude_owner_id: DbId,
    ) -> Result<Vec<OccupiedClaimRow>, sqlx::Error> {
        sqlx::query_as::<_, OccupiedClaimRow>(
            "SELECT c.owner_id, d.owner_label, c.weekday, c.parity \
             FROM recurrence_day_claims c \
             JOIN recurrence_definitions d ON d.owner_id = c.owner_id \
             WHERE d.resource_scope = $1 \
               AND c.direction = $2 \
               AND c.owner_id <> $3 \
               AND d.deleted_at IS NULL \
             ORDER BY c.weekday, c.owner_id",
        )
        .bind(&key.scope)
        .bind(key.direction.as_str())
        .bind(exclude_owner_id)
        .fetch_all(pool)
        .await
    }
}
