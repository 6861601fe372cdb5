//! Scheduling core for recurring school-transport runs.
//!
//! Pure computation only: week parity, recurrence evaluation, claim conflict
//! detection, occurrence materialization and the edit reconciliation state
//! machine. Persistence is reached through the [`store::ScheduleStore`] port.

pub mod claims;
pub mod conflict;
pub mod error;
pub mod occurrence;
pub mod parity;
pub mod reconcile;
pub mod recurrence;
pub mod store;
pub mod types;
