//! Day/parity claim model.
//!
//! A [`DayClaimSet`] describes the weekly pattern of one direction of a pickup
//! or circuit leg: at most one [`DayClaim`] per ISO weekday, each with a
//! [`DayParity`]. Every weekday has two cells (even weeks, odd weeks); an
//! `All` claim occupies both.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::parity::WeekParity;

/// First ISO weekday number (Monday).
pub const MIN_WEEKDAY: u8 = 1;

/// Last ISO weekday number (Sunday).
pub const MAX_WEEKDAY: u8 = 7;

// ---------------------------------------------------------------------------
// DayParity
// ---------------------------------------------------------------------------

/// Which weeks a claim applies to.
///
/// Declaration order is the tie-break order used by conflict detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayParity {
    All,
    Even,
    Odd,
}

impl DayParity {
    pub fn as_str(self) -> &'static str {
        match self {
            DayParity::All => "all",
            DayParity::Even => "even",
            DayParity::Odd => "odd",
        }
    }

    /// Whether a claim with this parity runs in a week of the given parity.
    pub fn matches(self, week: WeekParity) -> bool {
        match (self, week) {
            (DayParity::All, _) => true,
            (DayParity::Even, WeekParity::Even) => true,
            (DayParity::Odd, WeekParity::Odd) => true,
            _ => false,
        }
    }

    /// Whether two claims on the same weekday share at least one cell.
    pub fn overlaps(self, other: DayParity) -> bool {
        self == DayParity::All || other == DayParity::All || self == other
    }

    /// The week cells this parity occupies.
    pub fn cells(self) -> &'static [WeekParity] {
        match self {
            DayParity::All => &[WeekParity::Even, WeekParity::Odd],
            DayParity::Even => &[WeekParity::Even],
            DayParity::Odd => &[WeekParity::Odd],
        }
    }

    /// The single-cell parity for a week parity.
    pub fn from_cell(cell: WeekParity) -> Self {
        match cell {
            WeekParity::Even => DayParity::Even,
            WeekParity::Odd => DayParity::Odd,
        }
    }
}

impl fmt::Display for DayParity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DayParity {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(DayParity::All),
            "even" => Ok(DayParity::Even),
            "odd" => Ok(DayParity::Odd),
            other => Err(CoreError::Validation(format!(
                "Unrecognized parity '{other}'. Must be one of: all, even, odd"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// Direction of a run: outbound ("aller") or return ("retour").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "aller")]
    Outbound,
    #[serde(rename = "retour")]
    Return,
}

impl Direction {
    /// Both directions, outbound first.
    pub const BOTH: [Direction; 2] = [Direction::Outbound, Direction::Return];

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Outbound => "aller",
            Direction::Return => "retour",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aller" | "outbound" => Ok(Direction::Outbound),
            "retour" | "return" => Ok(Direction::Return),
            other => Err(CoreError::Validation(format!(
                "Unrecognized direction '{other}'. Must be 'aller' or 'retour'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// DayClaim
// ---------------------------------------------------------------------------

/// Validate an ISO weekday number (1 = Monday .. 7 = Sunday).
pub fn validate_weekday(weekday: u8) -> Result<(), CoreError> {
    if (MIN_WEEKDAY..=MAX_WEEKDAY).contains(&weekday) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Weekday must be between {MIN_WEEKDAY} and {MAX_WEEKDAY}, got {weekday}"
        )))
    }
}

/// One weekday of a weekly pattern and the weeks it applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DayClaim {
    pub weekday: u8,
    pub parity: DayParity,
}

impl DayClaim {
    /// Build a claim, rejecting weekdays outside 1..=7.
    pub fn new(weekday: u8, parity: DayParity) -> Result<Self, CoreError> {
        validate_weekday(weekday)?;
        Ok(Self { weekday, parity })
    }
}

// ---------------------------------------------------------------------------
// DayClaimSet
// ---------------------------------------------------------------------------

/// Claim set as received at a boundary (HTTP body, stored JSON).
///
/// Legacy payloads list bare weekday numbers; they mean "every week".
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ClaimSetInput {
    Claims(Vec<DayClaim>),
    Weekdays(Vec<u8>),
}

/// Weekly pattern for one direction: at most one claim per weekday.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ClaimSetInput", into = "Vec<DayClaim>")]
pub struct DayClaimSet {
    days: BTreeMap<u8, DayParity>,
}

impl DayClaimSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from claims, rejecting bad weekdays and duplicate weekdays.
    pub fn from_claims(claims: impl IntoIterator<Item = DayClaim>) -> Result<Self, CoreError> {
        let mut days = BTreeMap::new();
        for claim in claims {
            validate_weekday(claim.weekday)?;
            if days.insert(claim.weekday, claim.parity).is_some() {
                return Err(CoreError::Validation(format!(
                    "Weekday {} appears more than once in the claim set",
                    claim.weekday
                )));
            }
        }
        Ok(Self { days })
    }

    /// Normalize a legacy bare weekday list into `All` claims.
    ///
    /// Repeated weekdays are tolerated since they carry no parity to clash.
    pub fn from_legacy_weekdays(weekdays: &[u8]) -> Result<Self, CoreError> {
        let mut days = BTreeMap::new();
        for &weekday in weekdays {
            validate_weekday(weekday)?;
            days.insert(weekday, DayParity::All);
        }
        Ok(Self { days })
    }

    /// Every weekday, every week.
    pub fn full_week() -> Self {
        Self {
            days: (MIN_WEEKDAY..=MAX_WEEKDAY)
                .map(|w| (w, DayParity::All))
                .collect(),
        }
    }

    /// Parity claimed for `weekday`, if any.
    pub fn get(&self, weekday: u8) -> Option<DayParity> {
        self.days.get(&weekday).copied()
    }

    /// Whether the (weekday, week parity) cell is claimed.
    pub fn contains_cell(&self, weekday: u8, cell: WeekParity) -> bool {
        self.get(weekday).is_some_and(|p| p.matches(cell))
    }

    /// Claims in weekday order.
    pub fn iter(&self) -> impl Iterator<Item = DayClaim> + '_ {
        self.days
            .iter()
            .map(|(&weekday, &parity)| DayClaim { weekday, parity })
    }

    /// Every occupied (weekday, week parity) cell in weekday order.
    pub fn cells(&self) -> impl Iterator<Item = (u8, WeekParity)> + '_ {
        self.days
            .iter()
            .flat_map(|(&weekday, parity)| parity.cells().iter().map(move |&c| (weekday, c)))
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Replace the claim for `weekday` (`None` removes it).
    ///
    /// Callers guarantee `weekday` is already validated.
    pub(crate) fn set_day(&mut self, weekday: u8, parity: Option<DayParity>) {
        match parity {
            Some(p) => {
                self.days.insert(weekday, p);
            }
            None => {
                self.days.remove(&weekday);
            }
        }
    }
}

impl TryFrom<ClaimSetInput> for DayClaimSet {
    type Error = CoreError;

    fn try_from(input: ClaimSetInput) -> Result<Self, Self::Error> {
        match input {
            ClaimSetInput::Claims(claims) => DayClaimSet::from_claims(claims),
            ClaimSetInput::Weekdays(weekdays) => DayClaimSet::from_legacy_weekdays(&weekdays),
        }
    }
}

impl From<DayClaimSet> for Vec<DayClaim> {
    fn from(set: DayClaimSet) -> Self {
        set.iter().collect()
    }
}
