//! Row types and their conversions into domain types.
//!
//! Rows carry the database's loose types (`i16` weekdays, `TEXT` enums);
//! conversion rejects anything the domain cannot represent with
//! `StoreError::Corrupt`.

pub mod occurrence_override;
pub mod recurrence;
