pub mod claims;
pub mod occurrences;
pub mod overrides;
pub mod recurrence;
