use navette_core::error::CoreError;
use navette_core::store::StoreError;

/// Errors raised by planning services.
#[derive(Debug, thiserror::Error)]
pub enum PlanningError {
    /// Validation, conflict or not-found errors from the core.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The persistence collaborator failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The edit session task is gone.
    #[error(transparent)]
    Session(#[from] SessionClosed),
}

/// Returned when a command is sent to an edit session that has shut down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Edit session is closed")]
pub struct SessionClosed;

pub type PlanningResult<T> = Result<T, PlanningError>;
