//! Route definitions for per-owner schedules.
//!
//! ```text
//! GET    /{owner_id}/recurrence    get_recurrence
//! PUT    /{owner_id}/recurrence    save_recurrence
//! DELETE /{owner_id}/recurrence    delete_recurrence
//! GET    /{owner_id}/overrides     list_overrides
//! PUT    /{owner_id}/overrides     record_override
//! ```

use axum::routing::get;
use axum::Router;

use crate::handlers::{overrides, recurrence};
use crate::state::{AppState, StoreBackend};

/// Owner routes -- mounted at `/owners`.
pub fn router<S: StoreBackend>() -> Router<AppState<S>> {
    Router::new()
        .route(
            "/{owner_id}/recurrence",
            get(recurrence::get_recurrence::<S>)
                .put(recurrence::save_recurrence::<S>)
                .delete(recurrence::delete_recurrence::<S>),
        )
        .route(
            "/{owner_id}/overrides",
            get(overrides::list_overrides::<S>).put(overrides::record_override::<S>),
        )
}
