pub mod claims;
pub mod health;
pub mod occurrences;
pub mod owners;

use axum::Router;

use crate::state::{AppState, StoreBackend};

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /occurrences                          materialized occurrences (GET)
/// /claims/validate                      pre-submit conflict check (POST)
/// /owners/{owner_id}/recurrence         get, save, delete definition
/// /owners/{owner_id}/overrides          list (GET), record (PUT)
/// ```
pub fn api_routes<S: StoreBackend>() -> Router<AppState<S>> {
    Router::new()
        .nest("/occurrences", occurrences::router())
        .nest("/claims", claims::router())
        .nest("/owners", owners::router())
}
