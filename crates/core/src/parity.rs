//! ISO-8601 week numbering and week parity.
//!
//! Week 1 is the week containing the year's first Thursday; weeks run Monday
//! to Sunday. Late-December dates can therefore belong to week 1 of the next
//! year, and early-January dates to the last week (52 or 53) of the previous
//! one. Parity is derived from that week number only.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Parity of an ISO week number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekParity {
    Even,
    Odd,
}

impl WeekParity {
    /// The other parity.
    pub fn other(self) -> Self {
        match self {
            WeekParity::Even => WeekParity::Odd,
            WeekParity::Odd => WeekParity::Even,
        }
    }
}

/// ISO-8601 week number (1..=53) of `date`.
pub fn iso_week(date: NaiveDate) -> u32 {
    date.iso_week().week()
}

/// Parity of the ISO week containing `date` (`week % 2 == 0` is even).
pub fn parity_of(date: NaiveDate) -> WeekParity {
    if iso_week(date) % 2 == 0 {
        WeekParity::Even
    } else {
        WeekParity::Odd
    }
}

/// Parity of a date-time. Only the calendar date is considered.
pub fn parity_of_datetime(at: NaiveDateTime) -> WeekParity {
    parity_of(at.date())
}

/// ISO weekday number of `date`, 1 = Monday .. 7 = Sunday.
pub fn iso_weekday(date: NaiveDate) -> u8 {
    // number_from_monday() is always within 1..=7.
    date.weekday().number_from_monday() as u8
}
