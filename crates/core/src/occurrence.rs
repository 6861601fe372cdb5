//! Occurrence materialization and date-specific overrides ("avenants").
//!
//! Occurrences are a derived projection: a definition's active dates merged
//! with any override recorded for that exact date. Only the definition and the
//! overrides are stored.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::claims::Direction;
use crate::error::CoreError;
use crate::recurrence::{active_dates_in_range, RecurrenceDefinition};
use crate::types::DbId;

/// Maximum length of override notes.
pub const MAX_NOTES_LEN: usize = 2000;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle of a single occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccurrenceStatus {
    #[default]
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl OccurrenceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OccurrenceStatus::Scheduled => "scheduled",
            OccurrenceStatus::InProgress => "in_progress",
            OccurrenceStatus::Completed => "completed",
            OccurrenceStatus::Cancelled => "cancelled",
        }
    }

    /// Statuses reachable from `self`. Terminal statuses return an empty slice.
    pub fn valid_transitions(self) -> &'static [OccurrenceStatus] {
        use OccurrenceStatus::*;
        match self {
            Scheduled => &[InProgress, Cancelled],
            InProgress => &[Completed, Cancelled],
            Completed | Cancelled => &[],
        }
    }

    pub fn is_terminal(self) -> bool {
        self.valid_transitions().is_empty()
    }

    /// Whether moving from `self` to `to` is allowed. Staying put always is.
    pub fn can_transition(self, to: OccurrenceStatus) -> bool {
        self == to || self.valid_transitions().contains(&to)
    }

    /// Validate a transition, naming both statuses on failure.
    pub fn validate_transition(self, to: OccurrenceStatus) -> Result<(), CoreError> {
        if self.can_transition(to) {
            Ok(())
        } else {
            Err(CoreError::Validation(format!(
                "Invalid status transition: {self} -> {to}"
            )))
        }
    }
}

impl fmt::Display for OccurrenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OccurrenceStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(OccurrenceStatus::Scheduled),
            "in_progress" => Ok(OccurrenceStatus::InProgress),
            "completed" => Ok(OccurrenceStatus::Completed),
            "cancelled" => Ok(OccurrenceStatus::Cancelled),
            other => Err(CoreError::Validation(format!(
                "Unrecognized occurrence status '{other}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Override
// ---------------------------------------------------------------------------

/// A date-specific exception to a recurring schedule.
///
/// `None` fields inherit from the base definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccurrenceOverride {
    pub date: NaiveDate,
    #[serde(default)]
    pub status: OccurrenceStatus,
    #[serde(default)]
    pub substitute_operator_id: Option<DbId>,
    #[serde(default)]
    pub substitute_resource_id: Option<DbId>,
    #[serde(default)]
    pub adjusted_time: Option<NaiveTime>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl OccurrenceOverride {
    /// An override that only sets a status.
    pub fn with_status(date: NaiveDate, status: OccurrenceStatus) -> Self {
        Self {
            date,
            status,
            substitute_operator_id: None,
            substitute_resource_id: None,
            adjusted_time: None,
            notes: None,
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if let Some(id) = self.substitute_operator_id {
            if id <= 0 {
                return Err(CoreError::Validation(format!(
                    "substitute_operator_id must be positive, got {id}"
                )));
            }
        }
        if let Some(id) = self.substitute_resource_id {
            if id <= 0 {
                return Err(CoreError::Validation(format!(
                    "substitute_resource_id must be positive, got {id}"
                )));
            }
        }
        if let Some(notes) = &self.notes {
            if notes.chars().count() > MAX_NOTES_LEN {
                return Err(CoreError::Validation(format!(
                    "Notes must be at most {MAX_NOTES_LEN} characters"
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Occurrence
// ---------------------------------------------------------------------------

/// One concrete run of a definition on one date in one direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    pub owner_id: DbId,
    pub date: NaiveDate,
    pub direction: Direction,
    pub effective_operator_id: Option<DbId>,
    pub effective_resource_id: Option<DbId>,
    pub effective_time: Option<NaiveTime>,
    pub status: OccurrenceStatus,
    /// Whether an override was recorded for this date.
    pub is_override: bool,
    pub notes: Option<String>,
}

impl Occurrence {
    /// Cancelled occurrences keep their fields for audit but do not run.
    pub fn is_operational(&self) -> bool {
        self.status != OccurrenceStatus::Cancelled
    }
}

fn merge(
    definition: &RecurrenceDefinition,
    direction: Direction,
    date: NaiveDate,
    ov: Option<&OccurrenceOverride>,
) -> Occurrence {
    match ov {
        Some(ov) => Occurrence {
            owner_id: definition.owner_id,
            date,
            direction,
            effective_operator_id: ov.substitute_operator_id.or(definition.operator_id),
            effective_resource_id: ov.substitute_resource_id.or(definition.resource_id),
            effective_time: ov.adjusted_time.or(definition.time_of_day),
            status: ov.status,
            is_override: true,
            notes: ov.notes.clone(),
        },
        None => Occurrence {
            owner_id: definition.owner_id,
            date,
            direction,
            effective_operator_id: definition.operator_id,
            effective_resource_id: definition.resource_id,
            effective_time: definition.time_of_day,
            status: OccurrenceStatus::Scheduled,
            is_override: false,
            notes: None,
        },
    }
}

/// Expand `definition` into occurrences over the closed range `[from, to]`.
///
/// Covers both directions, ordered by date then direction. Overrides apply to
/// every direction active on their date; overrides for inactive dates are
/// ignored. Pure: the same inputs always give the same output.
pub fn materialize(
    definition: &RecurrenceDefinition,
    overrides: &BTreeMap<NaiveDate, OccurrenceOverride>,
    from: NaiveDate,
    to: NaiveDate,
) -> Vec<Occurrence> {
    let mut occurrences: Vec<Occurrence> = Direction::BOTH
        .iter()
        .flat_map(|&direction| {
            active_dates_in_range(definition, direction, from, to)
                .map(move |date| merge(definition, direction, date, overrides.get(&date)))
        })
        .collect();
    occurrences.sort_by_key(|o| (o.date, o.direction));
    occurrences
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::claims::{DayClaim, DayClaimSet, DayParity};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    /// Tuesdays every week, both directions, operator 42, resource 7, 07:45.
    fn tuesday_definition() -> RecurrenceDefinition {
        let tuesdays = DayClaimSet::from_claims([DayClaim {
            weekday: 2,
            parity: DayParity::All,
        }])
        .unwrap();
        let mut def = RecurrenceDefinition::new(3, "Ecole Jaures", "circuit-leg:3", d(2024, 1, 1))
            .with_claims(Direction::Outbound, tuesdays.clone())
            .with_claims(Direction::Return, tuesdays);
        def.operator_id = Some(42);
        def.resource_id = Some(7);
        def.time_of_day = Some(t(7, 45));
        def
    }

    // -----------------------------------------------------------------------
    // Status transitions
    // -----------------------------------------------------------------------

    #[test]
    fn scheduled_can_start_or_cancel() {
        assert!(OccurrenceStatus::Scheduled.can_transition(OccurrenceStatus::InProgress));
        assert!(OccurrenceStatus::Scheduled.can_transition(OccurrenceStatus::Cancelled));
        assert!(!OccurrenceStatus::Scheduled.can_transition(OccurrenceStatus::Completed));
    }

    #[test]
    fn terminal_statuses() {
        assert!(OccurrenceStatus::Completed.is_terminal());
        assert!(OccurrenceStatus::Cancelled.is_terminal());
        assert!(!OccurrenceStatus::InProgress.is_terminal());
    }

    #[test]
    fn self_transition_is_allowed() {
        assert!(OccurrenceStatus::Cancelled.can_transition(OccurrenceStatus::Cancelled));
    }

    #[test]
    fn invalid_transition_names_both_statuses() {
        let msg = OccurrenceStatus::Completed
            .validate_transition(OccurrenceStatus::Scheduled)
            .unwrap_err()
            .to_string();
        assert!(msg.contains("completed"));
        assert!(msg.contains("scheduled"));
    }

    #[test]
    fn status_parses_from_snake_case() {
        assert_eq!(
            "in_progress".parse::<OccurrenceStatus>().unwrap(),
            OccurrenceStatus::InProgress
        );
        assert!("done".parse::<OccurrenceStatus>().is_err());
    }

    // -----------------------------------------------------------------------
    // Override validation
    // -----------------------------------------------------------------------

    #[test]
    fn override_rejects_non_positive_ids() {
        let mut ov = OccurrenceOverride::with_status(d(2024, 3, 5), OccurrenceStatus::Scheduled);
        ov.substitute_operator_id = Some(0);
        assert_matches!(ov.validate(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn override_rejects_long_notes() {
        let mut ov = OccurrenceOverride::with_status(d(2024, 3, 5), OccurrenceStatus::Scheduled);
        ov.notes = Some("x".repeat(MAX_NOTES_LEN + 1));
        assert!(ov.validate().is_err());
        ov.notes = Some("x".repeat(MAX_NOTES_LEN));
        assert!(ov.validate().is_ok());
    }

    #[test]
    fn override_deserializes_with_defaults() {
        let ov: OccurrenceOverride = serde_json::from_str(r#"{"date":"2024-03-05"}"#).unwrap();
        assert_eq!(ov.status, OccurrenceStatus::Scheduled);
        assert!(ov.notes.is_none());
    }

    // -----------------------------------------------------------------------
    // materialize
    // -----------------------------------------------------------------------

    #[test]
    fn default_occurrences_inherit_everything() {
        let def = tuesday_definition();
        let occ = materialize(&def, &BTreeMap::new(), d(2024, 3, 4), d(2024, 3, 10));
        assert_eq!(occ.len(), 2);
        for o in &occ {
            assert_eq!(o.date, d(2024, 3, 5));
            assert_eq!(o.status, OccurrenceStatus::Scheduled);
            assert_eq!(o.effective_operator_id, Some(42));
            assert_eq!(o.effective_resource_id, Some(7));
            assert_eq!(o.effective_time, Some(t(7, 45)));
            assert!(!o.is_override);
        }
        assert_eq!(occ[0].direction, Direction::Outbound);
        assert_eq!(occ[1].direction, Direction::Return);
    }

    #[test]
    fn cancelled_override_inherits_operator() {
        let def = tuesday_definition();
        let mut overrides = BTreeMap::new();
        overrides.insert(
            d(2024, 3, 5),
            OccurrenceOverride::with_status(d(2024, 3, 5), OccurrenceStatus::Cancelled),
        );
        let occ = materialize(&def, &overrides, d(2024, 3, 5), d(2024, 3, 5));
        assert_eq!(occ.len(), 2);
        assert_eq!(occ[0].status, OccurrenceStatus::Cancelled);
        assert_eq!(occ[0].effective_operator_id, Some(42));
        assert!(occ[0].is_override);
        assert!(!occ[0].is_operational());
    }

    #[test]
    fn non_null_override_fields_win() {
        let def = tuesday_definition();
        let mut ov = OccurrenceOverride::with_status(d(2024, 3, 12), OccurrenceStatus::Scheduled);
        ov.substitute_operator_id = Some(99);
        ov.adjusted_time = Some(t(8, 15));
        ov.notes = Some("Chauffeur remplacant".to_string());
        let overrides = BTreeMap::from([(ov.date, ov)]);

        let occ = materialize(&def, &overrides, d(2024, 3, 1), d(2024, 3, 31));
        let on_12th: Vec<_> = occ.iter().filter(|o| o.date == d(2024, 3, 12)).collect();
        assert_eq!(on_12th.len(), 2);
        assert_eq!(on_12th[0].effective_operator_id, Some(99));
        assert_eq!(on_12th[0].effective_resource_id, Some(7));
        assert_eq!(on_12th[0].effective_time, Some(t(8, 15)));
        assert_eq!(on_12th[0].notes.as_deref(), Some("Chauffeur remplacant"));

        let others = occ.iter().filter(|o| o.date != d(2024, 3, 12));
        assert!(others.into_iter().all(|o| o.effective_operator_id == Some(42)));
    }

    #[test]
    fn cancelled_override_keeps_its_own_fields() {
        let def = tuesday_definition();
        let mut ov = OccurrenceOverride::with_status(d(2024, 3, 5), OccurrenceStatus::Cancelled);
        ov.substitute_resource_id = Some(8);
        let overrides = BTreeMap::from([(ov.date, ov)]);
        let occ = materialize(&def, &overrides, d(2024, 3, 5), d(2024, 3, 5));
        assert_eq!(occ[0].effective_resource_id, Some(8));
    }

    #[test]
    fn override_on_inactive_date_is_ignored() {
        let def = tuesday_definition();
        let wednesday = d(2024, 3, 6);
        let overrides = BTreeMap::from([(
            wednesday,
            OccurrenceOverride::with_status(wednesday, OccurrenceStatus::Cancelled),
        )]);
        let occ = materialize(&def, &overrides, d(2024, 3, 4), d(2024, 3, 10));
        assert!(occ.iter().all(|o| o.date != wednesday));
        assert!(occ.iter().all(|o| o.status == OccurrenceStatus::Scheduled));
    }

    #[test]
    fn materialize_is_idempotent() {
        let def = tuesday_definition();
        let overrides = BTreeMap::from([(
            d(2024, 3, 5),
            OccurrenceOverride::with_status(d(2024, 3, 5), OccurrenceStatus::Cancelled),
        )]);
        let first = materialize(&def, &overrides, d(2024, 2, 1), d(2024, 4, 30));
        let second = materialize(&def, &overrides, d(2024, 2, 1), d(2024, 4, 30));
        assert_eq!(first, second);
        assert_eq!(overrides.len(), 1);
    }

    #[test]
    fn inverted_window_materializes_nothing() {
        let def = tuesday_definition();
        assert!(materialize(&def, &BTreeMap::new(), d(2024, 4, 1), d(2024, 3, 1)).is_empty());
    }

    #[test]
    fn output_is_date_ordered_across_directions() {
        let mut def = tuesday_definition();
        def.direction_sets.inbound = DayClaimSet::from_claims([DayClaim {
            weekday: 1,
            parity: DayParity::All,
        }])
        .unwrap();
        let occ = materialize(&def, &BTreeMap::new(), d(2024, 3, 4), d(2024, 3, 12));
        let keys: Vec<_> = occ.iter().map(|o| (o.date, o.direction)).collect();
        assert_eq!(
            keys,
            vec![
                (d(2024, 3, 4), Direction::Return),
                (d(2024, 3, 5), Direction::Outbound),
                (d(2024, 3, 11), Direction::Return),
                (d(2024, 3, 12), Direction::Outbound),
            ]
        );
    }
}
