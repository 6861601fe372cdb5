//! Route definitions for claim validation.
//!
//! ```text
//! POST /validate    validate_claims
//! ```

use axum::routing::post;
use axum::Router;

use crate::handlers::claims;
use crate::state::{AppState, StoreBackend};

/// Claim routes -- mounted at `/claims`.
pub fn router<S: StoreBackend>() -> Router<AppState<S>> {
    Router::new().route("/validate", post(claims::validate_claims::<S>))
}
