//! Handlers for materialized occurrences.

use axum::extract::{Query, State};
use axum::Json;
use chrono::NaiveDate;
use navette_core::occurrence::Occurrence;
use navette_core::types::DbId;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::{AppState, StoreBackend};

/// Query parameters for `GET /occurrences`.
#[derive(Debug, Deserialize)]
pub struct OccurrenceParams {
    /// Comma-separated owner ids.
    pub owner_ids: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
}

/// Parse a comma-separated id list, ignoring blank entries.
pub fn parse_owner_ids(raw: &str) -> AppResult<Vec<DbId>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<DbId>()
                .map_err(|_| AppError::BadRequest(format!("Invalid owner id '{s}'")))
        })
        .collect()
}

/// GET /occurrences
///
/// Occurrences of the requested owners over the closed range `[from, to]`,
/// ordered by date, owner, then direction.
pub async fn list_occurrences<S: StoreBackend>(
    State(state): State<AppState<S>>,
    Query(params): Query<OccurrenceParams>,
) -> AppResult<Json<DataResponse<Vec<Occurrence>>>> {
    let owner_ids = parse_owner_ids(&params.owner_ids)?;
    let occurrences = state
        .planning
        .query_occurrences(&owner_ids, params.from, params.to)
        .await?;
    Ok(Json(DataResponse { data: occurrences }))
}
