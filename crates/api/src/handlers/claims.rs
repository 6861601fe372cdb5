//! Handlers for pre-submit claim validation.

use axum::extract::State;
use axum::Json;
use navette_core::claims::{DayClaimSet, Direction};
use navette_core::conflict::{Conflict, ResourceKey};
use navette_core::types::DbId;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::{AppState, StoreBackend};

/// Body of `POST /claims/validate`.
///
/// `claims` accepts claim objects or a legacy list of weekday numbers.
#[derive(Debug, Deserialize)]
pub struct ValidateClaims {
    pub resource_scope: String,
    pub direction: Direction,
    /// Owner being edited; its own claims never conflict. Omit for a new owner.
    #[serde(default)]
    pub exclude_owner_id: Option<DbId>,
    pub claims: DayClaimSet,
}

/// Outcome of a validation request.
#[derive(Debug, Serialize)]
pub struct ClaimValidation {
    pub valid: bool,
    pub conflicts: Vec<Conflict>,
}

/// POST /claims/validate
pub async fn validate_claims<S: StoreBackend>(
    State(state): State<AppState<S>>,
    Json(input): Json<ValidateClaims>,
) -> AppResult<Json<DataResponse<ClaimValidation>>> {
    let key = ResourceKey::new(input.resource_scope, input.direction);
    // Ids are positive, so 0 excludes nobody.
    let exclude = input.exclude_owner_id.unwrap_or(0);
    let conflicts = state
        .planning
        .validate_claims_for(&key, exclude, &input.claims)
        .await?;

    Ok(Json(DataResponse {
        data: ClaimValidation {
            valid: conflicts.is_empty(),
            conflicts,
        },
    }))
}
