use crate::conflict::Conflict;
use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    /// One or more day/parity cells are already held by another owner.
    ///
    /// Carries every offending slot so callers can highlight all of them.
    #[error("Conflict: {} slot(s) already claimed", .0.len())]
    Conflicts(Vec<Conflict>),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Shorthand for a validation failure with a formatted message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
