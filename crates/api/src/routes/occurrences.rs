//! Route definitions for materialized occurrences.
//!
//! ```text
//! GET /?owner_ids=1,2&from=YYYY-MM-DD&to=YYYY-MM-DD    list_occurrences
//! ```

use axum::routing::get;
use axum::Router;

use crate::handlers::occurrences;
use crate::state::{AppState, StoreBackend};

/// Occurrence routes -- mounted at `/occurrences`.
pub fn router<S: StoreBackend>() -> Router<AppState<S>> {
    Router::new().route("/", get(occurrences::list_occurrences::<S>))
}
