//! Rows of `recurrence_definitions`, `recurrence_day_claims` and the
//! occupancy join.

use std::fmt::Display;

use chrono::{NaiveDate, NaiveTime};
use navette_core::claims::{DayClaim, DayClaimSet, DayParity, Direction};
use navette_core::conflict::OccupiedClaim;
use navette_core::parity::WeekParity;
use navette_core::recurrence::{DirectionSets, RecurrenceDefinition};
use navette_core::store::StoreError;
use navette_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `recurrence_definitions` table.
#[derive(Debug, Clone, FromRow)]
pub struct RecurrenceRow {
    pub owner_id: DbId,
    pub owner_label: String,
    pub resource_scope: String,
    pub valid_from: NaiveDate,
    pub valid_until: Option<NaiveDate>,
    pub time_of_day: Option<NaiveTime>,
    pub operator_id: Option<DbId>,
    pub resource_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
}

/// A row from the `recurrence_day_claims` table.
#[derive(Debug, Clone, FromRow)]
pub struct DayClaimRow {
    pub direction: String,
    pub weekday: i16,
    pub parity: String,
}

/// A live claim of another owner on one resource key.
#[derive(Debug, Clone, FromRow)]
pub struct OccupiedClaimRow {
    pub owner_id: DbId,
    pub owner_label: String,
    pub weekday: i16,
    pub parity: String,
}

pub(crate) fn corrupt(err: impl Display) -> StoreError {
    StoreError::Corrupt(err.to_string())
}

/// Stored label of a single-week cell.
pub fn cell_label(cell: WeekParity) -> &'static str {
    DayParity::from_cell(cell).as_str()
}

fn parse_claim(weekday: i16, parity: &str) -> Result<DayClaim, StoreError> {
    let weekday =
        u8::try_from(weekday).map_err(|_| corrupt(format!("weekday {weekday} out of range")))?;
    let parity: DayParity = parity.parse().map_err(corrupt)?;
    DayClaim::new(weekday, parity).map_err(corrupt)
}

impl RecurrenceRow {
    /// Assemble the domain definition from this row and its claim rows.
    pub fn into_definition(
        self,
        claims: Vec<DayClaimRow>,
    ) -> Result<RecurrenceDefinition, StoreError> {
        let mut outbound = Vec::new();
        let mut inbound = Vec::new();
        for row in claims {
            let direction: Direction = row.direction.parse().map_err(corrupt)?;
            let claim = parse_claim(row.weekday, &row.parity)?;
            match direction {
                Direction::Outbound => outbound.push(claim),
                Direction::Return => inbound.push(claim),
            }
        }

        Ok(RecurrenceDefinition {
            owner_id: self.owner_id,
            owner_label: self.owner_label,
            resource_scope: self.resource_scope,
            direction_sets: DirectionSets {
                outbound: DayClaimSet::from_claims(outbound).map_err(corrupt)?,
                inbound: DayClaimSet::from_claims(inbound).map_err(corrupt)?,
            },
            valid_from: self.valid_from,
            valid_until: self.valid_until,
            time_of_day: self.time_of_day,
            operator_id: self.operator_id,
            resource_id: self.resource_id,
        })
    }
}

impl TryFrom<OccupiedClaimRow> for OccupiedClaim {
    type Error = StoreError;

    fn try_from(row: OccupiedClaimRow) -> Result<Self, Self::Error> {
        Ok(OccupiedClaim {
            claim: parse_claim(row.weekday, &row.parity)?,
            owner_id: row.owner_id,
            owner_label: row.owner_label,
        })
    }
}
