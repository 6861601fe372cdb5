//! Recurrence definitions and their evaluation against calendar dates.
//!
//! A [`RecurrenceDefinition`] holds one [`DayClaimSet`] per [`Direction`]
//! plus a validity window. All date ranges here are closed: both endpoints
//! are included.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::claims::{DayClaimSet, Direction};
use crate::conflict::ResourceKey;
use crate::error::CoreError;
use crate::parity::{iso_weekday, parity_of};
use crate::types::DbId;

/// Maximum length of an owner label.
pub const MAX_LABEL_LEN: usize = 200;

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// One weekly pattern per direction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectionSets {
    #[serde(rename = "aller", default)]
    pub outbound: DayClaimSet,
    #[serde(rename = "retour", default)]
    pub inbound: DayClaimSet,
}

impl DirectionSets {
    pub fn get(&self, direction: Direction) -> &DayClaimSet {
        match direction {
            Direction::Outbound => &self.outbound,
            Direction::Return => &self.inbound,
        }
    }

    pub fn get_mut(&mut self, direction: Direction) -> &mut DayClaimSet {
        match direction {
            Direction::Outbound => &mut self.outbound,
            Direction::Return => &mut self.inbound,
        }
    }
}

/// The recurring schedule of one owner (a pickup point or a circuit leg).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceDefinition {
    pub owner_id: DbId,
    /// Human-readable owner name, reported in conflicts.
    pub owner_label: String,
    /// Physical resource the claims compete for (e.g. `"circuit-leg:12"`).
    pub resource_scope: String,
    pub direction_sets: DirectionSets,
    pub valid_from: NaiveDate,
    /// `None` means open-ended.
    pub valid_until: Option<NaiveDate>,
    pub time_of_day: Option<NaiveTime>,
    pub operator_id: Option<DbId>,
    pub resource_id: Option<DbId>,
}

impl RecurrenceDefinition {
    /// A definition with no claims, valid from `valid_from` onwards.
    pub fn new(
        owner_id: DbId,
        owner_label: impl Into<String>,
        resource_scope: impl Into<String>,
        valid_from: NaiveDate,
    ) -> Self {
        Self {
            owner_id,
            owner_label: owner_label.into(),
            resource_scope: resource_scope.into(),
            direction_sets: DirectionSets::default(),
            valid_from,
            valid_until: None,
            time_of_day: None,
            operator_id: None,
            resource_id: None,
        }
    }

    pub fn claims(&self, direction: Direction) -> &DayClaimSet {
        self.direction_sets.get(direction)
    }

    /// Return a copy with the claims for `direction` replaced.
    pub fn with_claims(mut self, direction: Direction, claims: DayClaimSet) -> Self {
        *self.direction_sets.get_mut(direction) = claims;
        self
    }

    /// Whether `date` lies inside the validity window.
    pub fn covers(&self, date: NaiveDate) -> bool {
        date >= self.valid_from && self.valid_until.map_or(true, |until| date <= until)
    }

    /// Occupancy dimension of `direction`.
    pub fn resource_key(&self, direction: Direction) -> ResourceKey {
        ResourceKey::new(self.resource_scope.clone(), direction)
    }

    /// Structural validation: non-empty labels, ordered validity window.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.owner_label.trim().is_empty() {
            return Err(CoreError::validation("Owner label must not be empty"));
        }
        if self.owner_label.chars().count() > MAX_LABEL_LEN {
            return Err(CoreError::Validation(format!(
                "Owner label must be at most {MAX_LABEL_LEN} characters"
            )));
        }
        if self.resource_scope.trim().is_empty() {
            return Err(CoreError::validation("Resource scope must not be empty"));
        }
        if let Some(until) = self.valid_until {
            if until < self.valid_from {
                return Err(CoreError::Validation(format!(
                    "valid_until ({until}) must not be before valid_from ({})",
                    self.valid_from
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Whether the claim set runs on `date`, ignoring any validity window.
fn claims_match(claims: &DayClaimSet, date: NaiveDate) -> bool {
    claims
        .get(iso_weekday(date))
        .is_some_and(|parity| parity.matches(parity_of(date)))
}

/// Whether `definition` runs in `direction` on `date`.
pub fn is_active_on(
    definition: &RecurrenceDefinition,
    direction: Direction,
    date: NaiveDate,
) -> bool {
    definition.covers(date) && claims_match(definition.claims(direction), date)
}

/// Every date in the closed range `[from, to]` on which `definition` runs in
/// `direction`.
///
/// The iterator is lazy and finite; clone it to replay from the start. An
/// inverted range (`from > to`) yields nothing.
pub fn active_dates_in_range(
    definition: &RecurrenceDefinition,
    direction: Direction,
    from: NaiveDate,
    to: NaiveDate,
) -> ActiveDates<'_> {
    let start = from.max(definition.valid_from);
    let last = match definition.valid_until {
        Some(until) => to.min(until),
        None => to,
    };
    ActiveDates {
        claims: definition.claims(direction),
        next: (start <= last).then_some(start),
        last,
    }
}

/// Iterator returned by [`active_dates_in_range`].
#[derive(Debug, Clone)]
pub struct ActiveDates<'a> {
    claims: &'a DayClaimSet,
    next: Option<NaiveDate>,
    last: NaiveDate,
}

impl Iterator for ActiveDates<'_> {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        if self.claims.is_empty() {
            self.next = None;
        }
        while let Some(date) = self.next {
            if date > self.last {
                self.next = None;
                break;
            }
            self.next = date.succ_opt();
            if claims_match(self.claims, date) {
                return Some(date);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::claims::{DayClaim, DayParity};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn definition(claims: &[(u8, DayParity)]) -> RecurrenceDefinition {
        let set = DayClaimSet::from_claims(
            claims
                .iter()
                .map(|&(weekday, parity)| DayClaim { weekday, parity }),
        )
        .unwrap();
        RecurrenceDefinition::new(1, "Arret Mairie", "circuit-leg:1", d(2024, 1, 1))
            .with_claims(Direction::Outbound, set)
    }

    // -----------------------------------------------------------------------
    // is_active_on
    // -----------------------------------------------------------------------

    #[test]
    fn active_on_matching_weekday() {
        let def = definition(&[(1, DayParity::All)]);
        assert!(is_active_on(&def, Direction::Outbound, d(2024, 1, 8)));
        assert!(!is_active_on(&def, Direction::Outbound, d(2024, 1, 9)));
    }

    #[test]
    fn directions_are_independent() {
        let def = definition(&[(1, DayParity::All)]);
        assert!(!is_active_on(&def, Direction::Return, d(2024, 1, 8)));
    }

    #[test]
    fn inactive_before_valid_from() {
        let def = definition(&[(1, DayParity::All)]);
        assert!(!is_active_on(&def, Direction::Outbound, d(2023, 12, 25)));
    }

    #[test]
    fn valid_until_is_inclusive() {
        let mut def = definition(&[(1, DayParity::All)]);
        def.valid_until = Some(d(2024, 1, 15));
        assert!(is_active_on(&def, Direction::Outbound, d(2024, 1, 15)));
        assert!(!is_active_on(&def, Direction::Outbound, d(2024, 1, 22)));
    }

    #[test]
    fn parity_is_respected() {
        // 2024-01-10 is in ISO week 2 (even), 2024-01-17 in week 3 (odd).
        let def = definition(&[(3, DayParity::Even)]);
        assert!(is_active_on(&def, Direction::Outbound, d(2024, 1, 10)));
        assert!(!is_active_on(&def, Direction::Outbound, d(2024, 1, 17)));
    }

    #[test]
    fn evaluation_is_idempotent() {
        let def = definition(&[(3, DayParity::Odd)]);
        let date = d(2024, 1, 17);
        let first = is_active_on(&def, Direction::Outbound, date);
        let second = is_active_on(&def, Direction::Outbound, date);
        assert_eq!(first, second);
    }

    // -----------------------------------------------------------------------
    // active_dates_in_range
    // -----------------------------------------------------------------------

    #[test]
    fn every_monday_in_january_2024() {
        let def = definition(&[(1, DayParity::All)]);
        let dates: Vec<_> =
            active_dates_in_range(&def, Direction::Outbound, d(2024, 1, 1), d(2024, 1, 31))
                .collect();
        assert_eq!(
            dates,
            vec![
                d(2024, 1, 1),
                d(2024, 1, 8),
                d(2024, 1, 15),
                d(2024, 1, 22),
                d(2024, 1, 29)
            ]
        );
    }

    #[test]
    fn even_wednesdays_alternate() {
        let def = definition(&[(3, DayParity::Even)]);
        let dates: Vec<_> =
            active_dates_in_range(&def, Direction::Outbound, d(2024, 1, 1), d(2024, 2, 29))
                .collect();
        assert_eq!(
            dates,
            vec![d(2024, 1, 10), d(2024, 1, 24), d(2024, 2, 7), d(2024, 2, 21)]
        );
        for pair in dates.windows(2) {
            assert_eq!((pair[1] - pair[0]).num_days(), 14);
        }
    }

    #[test]
    fn inverted_range_is_empty() {
        let def = definition(&[(1, DayParity::All)]);
        let mut dates =
            active_dates_in_range(&def, Direction::Outbound, d(2024, 2, 1), d(2024, 1, 1));
        assert_eq!(dates.next(), None);
    }

    #[test]
    fn single_day_range() {
        let def = definition(&[(1, DayParity::All)]);
        let monday = d(2024, 1, 8);
        let tuesday = d(2024, 1, 9);
        let on: Vec<_> = active_dates_in_range(&def, Direction::Outbound, monday, monday).collect();
        let off: Vec<_> =
            active_dates_in_range(&def, Direction::Outbound, tuesday, tuesday).collect();
        assert_eq!(on, vec![monday]);
        assert!(off.is_empty());
    }

    #[test]
    fn range_is_clamped_to_validity_window() {
        let mut def = definition(&[(1, DayParity::All)]);
        def.valid_from = d(2024, 1, 10);
        def.valid_until = Some(d(2024, 1, 25));
        let dates: Vec<_> =
            active_dates_in_range(&def, Direction::Outbound, d(2024, 1, 1), d(2024, 1, 31))
                .collect();
        assert_eq!(dates, vec![d(2024, 1, 15), d(2024, 1, 22)]);
    }

    #[test]
    fn cloned_iterator_replays_from_start() {
        let def = definition(&[(5, DayParity::All)]);
        let mut dates =
            active_dates_in_range(&def, Direction::Outbound, d(2024, 1, 1), d(2024, 1, 31));
        let replay = dates.clone();
        dates.next();
        assert_eq!(replay.count(), 4);
        assert_eq!(dates.count(), 3);
    }

    #[test]
    fn empty_claims_yield_nothing() {
        let def = definition(&[]);
        assert_eq!(
            active_dates_in_range(&def, Direction::Outbound, d(2024, 1, 1), d(2024, 12, 31))
                .count(),
            0
        );
    }

    #[test]
    fn range_crossing_year_boundary() {
        // Odd Mondays: 2024-12-23 is week 52 (even), 2024-12-30 week 1 (odd),
        // 2025-01-06 week 2 (even), 2025-01-13 week 3 (odd).
        let def = definition(&[(1, DayParity::Odd)]);
        let dates: Vec<_> =
            active_dates_in_range(&def, Direction::Outbound, d(2024, 12, 20), d(2025, 1, 15))
                .collect();
        assert_eq!(dates, vec![d(2024, 12, 30), d(2025, 1, 13)]);
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    #[test]
    fn inverted_validity_window_rejected() {
        let mut def = definition(&[(1, DayParity::All)]);
        def.valid_until = Some(d(2023, 6, 1));
        assert_matches!(def.validate(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn blank_label_rejected() {
        let mut def = definition(&[]);
        def.owner_label = "  ".to_string();
        assert!(def.validate().is_err());
    }

    #[test]
    fn label_limit_counts_characters() {
        let mut def = definition(&[]);
        def.owner_label = "é".repeat(MAX_LABEL_LEN);
        assert!(def.validate().is_ok());
        def.owner_label.push('é');
        assert_matches!(def.validate(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn well_formed_definition_validates() {
        assert!(definition(&[(2, DayParity::Odd)]).validate().is_ok());
    }

    #[test]
    fn definition_json_shape() {
        let def = definition(&[(2, DayParity::Odd)]);
        let json = serde_json::to_value(&def).unwrap();
        assert_eq!(json["direction_sets"]["aller"][0]["parity"], "odd");
        assert_eq!(json["direction_sets"]["retour"], serde_json::json!([]));
        let back: RecurrenceDefinition = serde_json::from_value(json).unwrap();
        assert_eq!(back, def);
    }
}
