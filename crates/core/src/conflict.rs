//! Conflict detection between day/parity claims, and the per-weekday toggle
//! transform used by the claim grid.
//!
//! Detection is advisory: it runs against a snapshot [`OccupancySet`] and never
//! mutates it. Conflicts are returned as data so a caller can surface all of
//! them at once.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::claims::{validate_weekday, DayClaim, DayClaimSet, DayParity, Direction};
use crate::error::CoreError;
use crate::parity::WeekParity;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Occupancy
// ---------------------------------------------------------------------------

/// The dimension claims compete on: one resource in one direction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceKey {
    pub scope: String,
    pub direction: Direction,
}

impl ResourceKey {
    pub fn new(scope: impl Into<String>, direction: Direction) -> Self {
        Self {
            scope: scope.into(),
            direction,
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.scope, self.direction)
    }
}

/// A claim committed by some other owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupiedClaim {
    pub owner_id: DbId,
    pub owner_label: String,
    pub claim: DayClaim,
}

/// Claims already held on one [`ResourceKey`] by everyone except the owner
/// being edited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupancySet {
    entries: Vec<OccupiedClaim>,
}

impl OccupancySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<OccupiedClaim>) -> Self {
        Self { entries }
    }

    pub fn push(&mut self, owner_id: DbId, owner_label: impl Into<String>, claim: DayClaim) {
        self.entries.push(OccupiedClaim {
            owner_id,
            owner_label: owner_label.into(),
            claim,
        });
    }

    /// Add every claim of `set` under one owner.
    pub fn extend_from_set(&mut self, owner_id: DbId, owner_label: &str, set: &DayClaimSet) {
        for claim in set.iter() {
            self.push(owner_id, owner_label, claim);
        }
    }

    pub fn entries(&self) -> &[OccupiedClaim] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in weekday-then-parity order; insertion order breaks ties.
    fn ordered(&self) -> Vec<&OccupiedClaim> {
        let mut ordered: Vec<&OccupiedClaim> = self.entries.iter().collect();
        ordered.sort_by_key(|e| (e.claim.weekday, e.claim.parity));
        ordered
    }
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

/// A candidate claim colliding with a claim held by another owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub weekday: u8,
    pub candidate_parity: DayParity,
    pub existing_parity: DayParity,
    pub owner_id: DbId,
    pub owner_label: String,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "weekday {} ({}) already claimed by {} ({})",
            self.weekday, self.candidate_parity, self.owner_label, self.existing_parity
        )
    }
}

fn conflict_with(candidate_parity: DayParity, existing: &OccupiedClaim) -> Conflict {
    Conflict {
        weekday: existing.claim.weekday,
        candidate_parity,
        existing_parity: existing.claim.parity,
        owner_id: existing.owner_id,
        owner_label: existing.owner_label.clone(),
    }
}

/// First existing claim that collides with `candidate`, if any.
///
/// Two claims collide when they share a weekday and either is `All` or both
/// have the same parity.
pub fn find_conflict(occupancy: &OccupancySet, candidate: DayClaim) -> Option<Conflict> {
    occupancy
        .ordered()
        .into_iter()
        .find(|e| {
            e.claim.weekday == candidate.weekday && candidate.parity.overlaps(e.claim.parity)
        })
        .map(|e| conflict_with(candidate.parity, e))
}

/// [`find_conflict`] for every claim of `candidates`, in weekday order.
pub fn find_conflicts_for_set(occupancy: &OccupancySet, candidates: &DayClaimSet) -> Vec<Conflict> {
    candidates
        .iter()
        .filter_map(|claim| find_conflict(occupancy, claim))
        .collect()
}

/// Every individual (weekday, week) cell of `candidates` already held by
/// someone else, one entry per cell.
pub fn conflicting_cells(occupancy: &OccupancySet, candidates: &DayClaimSet) -> Vec<Conflict> {
    let ordered = occupancy.ordered();
    candidates
        .cells()
        .filter_map(|(weekday, cell)| {
            ordered
                .iter()
                .find(|e| e.claim.weekday == weekday && e.claim.parity.matches(cell))
                .map(|e| conflict_with(DayParity::from_cell(cell), e))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Toggle transform
// ---------------------------------------------------------------------------

/// Parity held for one weekday after toggling one cell.
fn next_parity(current: Option<DayParity>, parity: DayParity, turn_on: bool) -> Option<DayParity> {
    use DayParity::{All, Even, Odd};

    match (current, parity, turn_on) {
        // Whole-day toggles.
        (_, All, true) => Some(All),
        (_, All, false) => None,
        // Not present.
        (None, p, true) => Some(p),
        (None, _, false) => None,
        // Already every week.
        (Some(All), _, true) => Some(All),
        (Some(All), Even, false) => Some(Odd),
        (Some(All), Odd, false) => Some(Even),
        // One parity held.
        (Some(Even), Even, true) | (Some(Odd), Odd, true) => current,
        (Some(Even), Odd, true) | (Some(Odd), Even, true) => Some(All),
        (Some(Even), Even, false) | (Some(Odd), Odd, false) => None,
        (Some(Even), Odd, false) | (Some(Odd), Even, false) => current,
    }
}

/// Turn one (weekday, parity) cell on or off.
///
/// Turning on the second parity of a weekday collapses it into `All`; turning
/// off one parity of `All` keeps the other; turning off the last parity drops
/// the weekday.
pub fn toggle_claim(
    current: &DayClaimSet,
    weekday: u8,
    parity: DayParity,
    turn_on: bool,
) -> Result<DayClaimSet, CoreError> {
    validate_weekday(weekday)?;
    let mut next = current.clone();
    next.set_day(weekday, next_parity(current.get(weekday), parity, turn_on));
    Ok(next)
}

/// [`toggle_claim`], refusing to turn on a cell held by another owner.
///
/// Turning cells off never conflicts.
pub fn toggle_claim_checked(
    current: &DayClaimSet,
    occupancy: &OccupancySet,
    weekday: u8,
    parity: DayParity,
    turn_on: bool,
) -> Result<DayClaimSet, CoreError> {
    validate_weekday(weekday)?;
    if turn_on {
        if let Some(conflict) = find_conflict(occupancy, DayClaim { weekday, parity }) {
            return Err(CoreError::Conflicts(vec![conflict]));
        }
    }
    toggle_claim(current, weekday, parity, turn_on)
}

// ---------------------------------------------------------------------------
// Bulk operations
// ---------------------------------------------------------------------------

/// Result of an all-or-nothing bulk claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BulkOutcome {
    /// Every cell was free; the merged set.
    Applied(DayClaimSet),
    /// At least one cell is taken; nothing was applied.
    Rejected(Vec<Conflict>),
}

/// Turn on every cell of `candidates` on top of `current`, or none at all.
///
/// A single conflicting cell rejects the whole operation; the rejection lists
/// every conflicting cell.
pub fn apply_bulk(
    current: &DayClaimSet,
    candidates: &DayClaimSet,
    occupancy: &OccupancySet,
) -> BulkOutcome {
    let conflicts = conflicting_cells(occupancy, candidates);
    if !conflicts.is_empty() {
        return BulkOutcome::Rejected(conflicts);
    }

    let mut merged = current.clone();
    for claim in candidates.iter() {
        let parity = next_parity(merged.get(claim.weekday), claim.parity, true);
        merged.set_day(claim.weekday, parity);
    }
    BulkOutcome::Applied(merged)
}

/// Cells a weekday occupies in `set`, as a fixed-size grid row.
///
/// Index 0 is the even-week cell, index 1 the odd-week cell.
pub fn grid_row(set: &DayClaimSet, weekday: u8) -> [bool; 2] {
    [
        set.contains_cell(weekday, WeekParity::Even),
        set.contains_cell(weekday, WeekParity::Odd),
    ]
}
