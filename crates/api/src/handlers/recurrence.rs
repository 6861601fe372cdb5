//! Handlers for recurrence definitions.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{NaiveDate, NaiveTime};
use navette_core::recurrence::{DirectionSets, RecurrenceDefinition};
use navette_core::types::DbId;
use serde::Deserialize;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::{AppState, StoreBackend};

/// Body of `PUT /owners/{owner_id}/recurrence`. The owner comes from the path.
#[derive(Debug, Deserialize)]
pub struct SaveRecurrence {
    pub owner_label: String,
    pub resource_scope: String,
    #[serde(default)]
    pub direction_sets: DirectionSets,
    pub valid_from: NaiveDate,
    pub valid_until: Option<NaiveDate>,
    pub time_of_day: Option<NaiveTime>,
    pub operator_id: Option<DbId>,
    pub resource_id: Option<DbId>,
}

impl SaveRecurrence {
    pub fn into_definition(self, owner_id: DbId) -> RecurrenceDefinition {
        RecurrenceDefinition {
            owner_id,
            owner_label: self.owner_label,
            resource_scope: self.resource_scope,
            direction_sets: self.direction_sets,
            valid_from: self.valid_from,
            valid_until: self.valid_until,
            time_of_day: self.time_of_day,
            operator_id: self.operator_id,
            resource_id: self.resource_id,
        }
    }
}

/// GET /owners/{owner_id}/recurrence
pub async fn get_recurrence<S: StoreBackend>(
    State(state): State<AppState<S>>,
    Path(owner_id): Path<DbId>,
) -> AppResult<Json<DataResponse<RecurrenceDefinition>>> {
    let definition = state.planning.get_definition(owner_id).await?;
    Ok(Json(DataResponse { data: definition }))
}

/// PUT /owners/{owner_id}/recurrence
///
/// Rejected as a whole with 409 if any claimed cell is held by another owner.
pub async fn save_recurrence<S: StoreBackend>(
    State(state): State<AppState<S>>,
    Path(owner_id): Path<DbId>,
    Json(input): Json<SaveRecurrence>,
) -> AppResult<Json<DataResponse<RecurrenceDefinition>>> {
    let definition = input.into_definition(owner_id);
    state.planning.save_definition(&definition).await?;
    Ok(Json(DataResponse { data: definition }))
}

/// DELETE /owners/{owner_id}/recurrence
pub async fn delete_recurrence<S: StoreBackend>(
    State(state): State<AppState<S>>,
    Path(owner_id): Path<DbId>,
) -> AppResult<StatusCode> {
    state.planning.delete_definition(owner_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
