//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod occupancy_repo;
pub mod override_repo;
pub mod recurrence_repo;

pub use occupancy_repo::OccupancyRepo;
pub use override_repo::OverrideRepo;
pub use recurrence_repo::RecurrenceRepo;
