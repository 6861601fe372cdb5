//! Handlers for date-specific occurrence overrides.

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::NaiveDate;
use navette_core::occurrence::OccurrenceOverride;
use navette_core::types::DbId;
use serde::Deserialize;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::{AppState, StoreBackend};

/// Query parameters for `GET /owners/{owner_id}/overrides`.
#[derive(Debug, Deserialize)]
pub struct OverrideRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

/// GET /owners/{owner_id}/overrides
pub async fn list_overrides<S: StoreBackend>(
    State(state): State<AppState<S>>,
    Path(owner_id): Path<DbId>,
    Query(range): Query<OverrideRange>,
) -> AppResult<Json<DataResponse<Vec<OccurrenceOverride>>>> {
    let overrides = state
        .planning
        .list_overrides(owner_id, range.from, range.to)
        .await?;
    Ok(Json(DataResponse { data: overrides }))
}

/// PUT /owners/{owner_id}/overrides
///
/// Upserts the override for `date`; status changes must follow the
/// occurrence lifecycle.
pub async fn record_override<S: StoreBackend>(
    State(state): State<AppState<S>>,
    Path(owner_id): Path<DbId>,
    Json(input): Json<OccurrenceOverride>,
) -> AppResult<Json<DataResponse<OccurrenceOverride>>> {
    state.planning.record_override(owner_id, &input).await?;
    Ok(Json(DataResponse { data: input }))
}
