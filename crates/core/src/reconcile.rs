//! Optimistic-edit reconciliation state machine.
//!
//! Interactive edits are held locally, coalesced, committed one at a time to
//! a slow external store, and protected from stale echoes for a short window
//! after each acknowledged commit:
//!
//! ```text
//! Clean --edit--> Dirty --debounce--> Flushing --ack--> Cooldown --window--> Clean
//!                   ^                    |  ^             |
//!                   +---ack w/ pending---+  +--edit(pend)  +--edit--> Dirty
//! ```
//!
//! The machine is pure. It owns no clock: a driver arms the timers named by
//! [`Effect::ArmTimer`] and feeds [`EditEvent::DebounceElapsed`] /
//! [`EditEvent::CooldownElapsed`] back in.

use std::time::Duration;

use serde::Serialize;

/// Default coalescing delay between the last edit and the commit.
pub const DEFAULT_COALESCE_DELAY_MS: u64 = 800;

/// Default window during which external refreshes are ignored after a commit.
pub const DEFAULT_COOLDOWN_MS: u64 = 3000;

/// Timing parameters of the reconciliation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileTiming {
    pub coalesce_delay: Duration,
    pub cooldown: Duration,
}

impl Default for ReconcileTiming {
    fn default() -> Self {
        Self {
            coalesce_delay: Duration::from_millis(DEFAULT_COALESCE_DELAY_MS),
            cooldown: Duration::from_millis(DEFAULT_COOLDOWN_MS),
        }
    }
}

impl ReconcileTiming {
    /// Duration of the given timer.
    pub fn duration_of(&self, timer: Timer) -> Duration {
        match timer {
            Timer::Debounce => self.coalesce_delay,
            Timer::Cooldown => self.cooldown,
        }
    }
}

// ---------------------------------------------------------------------------
// Machine
// ---------------------------------------------------------------------------

/// Where an edited value stands relative to the external store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditPhase<T> {
    /// Local value mirrors the last known committed value.
    Clean { value: T },
    /// Edited locally, waiting for the coalescing delay.
    Dirty { latest: T },
    /// A commit is in flight; later edits queue in `pending`.
    Flushing { in_flight: T, pending: Option<T> },
    /// Committed; external refreshes are ignored until the window closes.
    Cooldown { value: T },
}

/// Payload-free view of [`EditPhase`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKind {
    Clean,
    Dirty,
    Flushing,
    Cooldown,
}

/// The two timers a driver must provide. Only one is ever armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timer {
    Debounce,
    Cooldown,
}

/// Inputs to the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditEvent<T> {
    /// The user changed the value locally.
    Edited(T),
    DebounceElapsed,
    CommitAcked,
    CommitFailed(String),
    CooldownElapsed,
    /// The store pushed a (possibly stale) copy of the value.
    ExternalRefresh(T),
    /// Commit a dirty value now instead of waiting for the debounce.
    FlushRequested,
    /// The owning session is going away.
    Teardown,
}

/// Actions the driver must perform after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect<T> {
    /// (Re)start the single timer, replacing any armed one.
    ArmTimer(Timer),
    CancelTimer,
    /// Send this value to the store. Never emitted while a commit is in flight.
    Commit(T),
    ReportFailure(String),
}

impl<T: Clone> EditPhase<T> {
    /// Start from a value known to be committed.
    pub fn clean(value: T) -> Self {
        EditPhase::Clean { value }
    }

    pub fn kind(&self) -> PhaseKind {
        match self {
            EditPhase::Clean { .. } => PhaseKind::Clean,
            EditPhase::Dirty { .. } => PhaseKind::Dirty,
            EditPhase::Flushing { .. } => PhaseKind::Flushing,
            EditPhase::Cooldown { .. } => PhaseKind::Cooldown,
        }
    }

    /// The value the user should currently see (newest local edit wins).
    pub fn local_value(&self) -> &T {
        match self {
            EditPhase::Clean { value } | EditPhase::Cooldown { value } => value,
            EditPhase::Dirty { latest } => latest,
            EditPhase::Flushing { in_flight, pending } => pending.as_ref().unwrap_or(in_flight),
        }
    }

    /// Whether local edits exist that the store has not acknowledged.
    pub fn has_unsaved(&self) -> bool {
        matches!(self, EditPhase::Dirty { .. } | EditPhase::Flushing { .. })
    }

    /// Apply one event, returning the next phase and the driver's to-do list.
    pub fn transition(self, event: EditEvent<T>) -> (Self, Vec<Effect<T>>) {
        use EditEvent as E;
        use EditPhase as P;

        match (self, event) {
            // --- Edits ---
            (P::Clean { .. } | P::Cooldown { .. } | P::Dirty { .. }, E::Edited(v)) => {
                (P::Dirty { latest: v }, vec![Effect::ArmTimer(Timer::Debounce)])
            }
            (P::Flushing { in_flight, .. }, E::Edited(v)) => (
                P::Flushing {
                    in_flight,
                    pending: Some(v),
                },
                vec![],
            ),

            // --- Flushing ---
            (P::Dirty { latest }, E::DebounceElapsed) => (
                P::Flushing {
                    in_flight: latest.clone(),
                    pending: None,
                },
                vec![Effect::Commit(latest)],
            ),
            (P::Dirty { latest }, E::FlushRequested | E::Teardown) => (
                P::Flushing {
                    in_flight: latest.clone(),
                    pending: None,
                },
                vec![Effect::CancelTimer, Effect::Commit(latest)],
            ),

            // --- Commit outcome ---
            (P::Flushing { pending: Some(p), .. }, E::CommitAcked) => {
                (P::Dirty { latest: p }, vec![Effect::ArmTimer(Timer::Debounce)])
            }
            (P::Flushing { in_flight, pending: None }, E::CommitAcked) => (
                P::Cooldown { value: in_flight },
                vec![Effect::ArmTimer(Timer::Cooldown)],
            ),
            (P::Flushing { in_flight, pending }, E::CommitFailed(msg)) => (
                P::Dirty {
                    latest: pending.unwrap_or(in_flight),
                },
                vec![Effect::ReportFailure(msg)],
            ),

            // --- Cooldown ---
            (P::Cooldown { value }, E::CooldownElapsed) => (P::Clean { value }, vec![]),
            (P::Cooldown { value }, E::Teardown) => {
                (P::Clean { value }, vec![Effect::CancelTimer])
            }

            // --- External echoes are only trusted when nothing is pending ---
            (P::Clean { .. }, E::ExternalRefresh(v)) => (P::Clean { value: v }, vec![]),

            // Everything else (stale timers, echoes during a round trip,
            // acks with nothing in flight) leaves the phase untouched.
            (phase, _) => (phase, vec![]),
        }
    }
}
