//! Async services around the scheduling core.
//!
//! - [`service::PlanningService`]: occurrence queries, claim validation and
//!   guarded writes over any [`navette_core::store::ScheduleStore`].
//! - [`editor`]: the debounced, optimistic edit session driving
//!   [`navette_core::reconcile::EditPhase`] with tokio timers.
//! - [`memory::InMemoryStore`]: an in-process store for tests and demos.

pub mod config;
pub mod editor;
pub mod error;
pub mod memory;
pub mod service;
