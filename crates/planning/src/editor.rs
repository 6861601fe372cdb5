//! Edit sessions: the tokio driver around [`EditPhase`].
//!
//! One task per session owns the machine, a single resettable timer and at
//! most one in-flight commit. Callers talk to it through an [`EditSession`]
//! handle; the optimistic local view is published on a `watch` channel.
//!
//! [`RecurrenceEditor`] specializes a session to a [`RecurrenceDefinition`]
//! and checks every toggle against the occupancy snapshot taken at open.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use navette_core::claims::{DayClaimSet, DayParity, Direction};
use navette_core::conflict::{apply_bulk, toggle_claim_checked, BulkOutcome, OccupancySet};
use navette_core::error::CoreError;
use navette_core::reconcile::{EditEvent, EditPhase, Effect, PhaseKind, ReconcileTiming, Timer};
use navette_core::recurrence::RecurrenceDefinition;
use navette_core::store::{ScheduleStore, StoreError};
use navette_core::types::DbId;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Sleep;

use crate::error::{PlanningResult, SessionClosed};

/// Sends a settled value to durable storage.
pub trait Committer<T>: Send + Sync + 'static {
    fn commit(&self, value: T) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Snapshot of a session as seen by the UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionView<T> {
    /// Optimistic local value (newest edit wins).
    pub value: T,
    pub phase: PhaseKind,
    /// Edits exist that the store has not acknowledged.
    pub unsaved: bool,
    /// Message of the most recent failed commit, cleared by the next ack.
    pub last_error: Option<String>,
    /// Acknowledged commits since the session opened.
    pub commits: u64,
}

type UpdateFn<T> = Box<dyn FnOnce(&T) -> Result<T, CoreError> + Send>;

enum Command<T> {
    Edit(T),
    Update(UpdateFn<T>, oneshot::Sender<Result<T, CoreError>>),
    Refresh(T),
    Flush,
    Close(Option<oneshot::Sender<SessionView<T>>>),
}

// ---------------------------------------------------------------------------
// Session handle
// ---------------------------------------------------------------------------

/// Handle to a running edit session.
///
/// Dropping the handle tears the session down in the background; pending
/// edits are still flushed. Use [`EditSession::close`] to wait for that.
pub struct EditSession<T> {
    commands: mpsc::UnboundedSender<Command<T>>,
    view: watch::Receiver<SessionView<T>>,
    task: Option<JoinHandle<()>>,
}

impl<T> EditSession<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Start a session on the current runtime from a committed value.
    pub fn spawn<C>(
        initial: T,
        committer: Arc<C>,
        timing: ReconcileTiming,
        label: impl Into<String>,
    ) -> Self
    where
        C: Committer<T>,
    {
        let label = label.into();
        let (commands, rx) = mpsc::unbounded_channel();
        let (view_tx, view) = watch::channel(SessionView {
            value: initial.clone(),
            phase: PhaseKind::Clean,
            unsaved: false,
            last_error: None,
            commits: 0,
        });

        tracing::debug!(session = %label, "Edit session opened");
        let driver = Driver {
            committer,
            timing,
            label,
            timer: None,
            in_flight: None,
            last_error: None,
            commits: 0,
        };
        let task = tokio::spawn(run(EditPhase::clean(initial), driver, rx, view_tx));

        Self {
            commands,
            view,
            task: Some(task),
        }
    }

    fn send(&self, command: Command<T>) -> Result<(), SessionClosed> {
        self.commands.send(command).map_err(|_| SessionClosed)
    }

    /// Replace the local value.
    pub fn edit(&self, value: T) -> Result<(), SessionClosed> {
        self.send(Command::Edit(value))
    }

    /// Derive a new local value from the current one.
    ///
    /// `f` runs inside the session task against the newest local value, so
    /// back-to-back updates never lose each other. An `Err` leaves the value
    /// untouched.
    pub async fn update<F>(&self, f: F) -> Result<Result<T, CoreError>, SessionClosed>
    where
        F: FnOnce(&T) -> Result<T, CoreError> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Update(Box::new(f), tx))?;
        rx.await.map_err(|_| SessionClosed)
    }

    /// Offer a copy pushed by the store. Ignored unless the session is clean.
    pub fn external_refresh(&self, value: T) -> Result<(), SessionClosed> {
        self.send(Command::Refresh(value))
    }

    /// Commit a dirty value now instead of waiting for the coalescing delay.
    pub fn flush(&self) -> Result<(), SessionClosed> {
        self.send(Command::Flush)
    }

    pub fn view(&self) -> SessionView<T> {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionView<T>> {
        self.view.clone()
    }

    /// Tear down, wait for the final flush and return the last view.
    pub async fn close(mut self) -> Result<SessionView<T>, SessionClosed> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Close(Some(tx)))?;
        let view = rx.await.map_err(|_| SessionClosed)?;
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        Ok(view)
    }
}

impl<T> Drop for EditSession<T> {
    fn drop(&mut self) {
        if self.task.take().is_some() {
            let _ = self.commands.send(Command::Close(None));
        }
    }
}

// ---------------------------------------------------------------------------
// Driver task
// ---------------------------------------------------------------------------

struct Driver<C> {
    committer: Arc<C>,
    timing: ReconcileTiming,
    label: String,
    timer: Option<(Timer, Pin<Box<Sleep>>)>,
    in_flight: Option<JoinHandle<Result<(), StoreError>>>,
    last_error: Option<String>,
    commits: u64,
}

enum Signal<T> {
    Command(Option<Command<T>>),
    Timer(Timer),
    Committed(Result<(), String>),
}

impl<C> Driver<C> {
    fn step<T>(&mut self, phase: EditPhase<T>, event: EditEvent<T>) -> EditPhase<T>
    where
        T: Clone + Send + 'static,
        C: Committer<T>,
    {
        let before = phase.kind();
        let (next, effects) = phase.transition(event);
        if next.kind() != before {
            tracing::debug!(
                session = %self.label,
                from = ?before,
                to = ?next.kind(),
                "Edit phase changed"
            );
        }
        for effect in effects {
            self.perform(effect);
        }
        next
    }

    fn perform<T>(&mut self, effect: Effect<T>)
    where
        T: Send + 'static,
        C: Committer<T>,
    {
        match effect {
            Effect::ArmTimer(timer) => {
                let sleep = tokio::time::sleep(self.timing.duration_of(timer));
                self.timer = Some((timer, Box::pin(sleep)));
            }
            Effect::CancelTimer => self.timer = None,
            Effect::Commit(value) => {
                let committer = Arc::clone(&self.committer);
                self.in_flight = Some(tokio::spawn(async move { committer.commit(value).await }));
            }
            Effect::ReportFailure(message) => {
                tracing::warn!(
                    session = %self.label,
                    error = %message,
                    "Commit failed, edits kept locally"
                );
                self.last_error = Some(message);
            }
        }
    }

    fn view<T: Clone>(&self, phase: &EditPhase<T>) -> SessionView<T> {
        SessionView {
            value: phase.local_value().clone(),
            phase: phase.kind(),
            unsaved: phase.has_unsaved(),
            last_error: self.last_error.clone(),
            commits: self.commits,
        }
    }
}

/// Resolve when the armed timer fires; never resolves when none is armed.
async fn wait_timer(timer: &mut Option<(Timer, Pin<Box<Sleep>>)>) -> Timer {
    match timer {
        Some((kind, sleep)) => {
            sleep.as_mut().await;
            let kind = *kind;
            *timer = None;
            kind
        }
        None => std::future::pending().await,
    }
}

/// Resolve with the outcome of the in-flight commit; never resolves when idle.
async fn wait_commit(
    in_flight: &mut Option<JoinHandle<Result<(), StoreError>>>,
) -> Result<(), String> {
    match in_flight {
        Some(handle) => {
            let outcome = match handle.await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(e.to_string()),
                Err(e) => Err(format!("Commit task aborted: {e}")),
            };
            *in_flight = None;
            outcome
        }
        None => std::future::pending().await,
    }
}

async fn run<T, C>(
    mut phase: EditPhase<T>,
    mut driver: Driver<C>,
    mut commands: mpsc::UnboundedReceiver<Command<T>>,
    view_tx: watch::Sender<SessionView<T>>,
) where
    T: Clone + Send + Sync + 'static,
    C: Committer<T>,
{
    let mut closing = false;
    // Set once teardown itself has issued a commit. Only the failure of that
    // commit ends the session with edits unsaved; a commit already in flight
    // when closing started may fail and still leave the pending value one try.
    let mut teardown_committed = false;
    let mut close_failed = false;
    let mut reply: Option<oneshot::Sender<SessionView<T>>> = None;

    loop {
        if closing {
            if driver.in_flight.is_none() && !close_failed {
                phase = driver.step(phase, EditEvent::Teardown);
                teardown_committed |= driver.in_flight.is_some();
                view_tx.send_replace(driver.view(&phase));
            }
            if driver.in_flight.is_none() {
                break;
            }
        }

        let signal = tokio::select! {
            command = commands.recv(), if !closing => Signal::Command(command),
            timer = wait_timer(&mut driver.timer) => Signal::Timer(timer),
            outcome = wait_commit(&mut driver.in_flight) => Signal::Committed(outcome),
        };

        phase = match signal {
            Signal::Command(Some(Command::Edit(value))) => {
                driver.step(phase, EditEvent::Edited(value))
            }
            Signal::Command(Some(Command::Update(f, tx))) => {
                let result = f(phase.local_value());
                let next = match &result {
                    Ok(value) => driver.step(phase, EditEvent::Edited(value.clone())),
                    Err(_) => phase,
                };
                let _ = tx.send(result);
                next
            }
            Signal::Command(Some(Command::Refresh(value))) => {
                if phase.kind() != PhaseKind::Clean {
                    tracing::debug!(
                        session = %driver.label,
                        phase = ?phase.kind(),
                        "Ignoring external refresh"
                    );
                }
                driver.step(phase, EditEvent::ExternalRefresh(value))
            }
            Signal::Command(Some(Command::Flush)) => driver.step(phase, EditEvent::FlushRequested),
            Signal::Command(Some(Command::Close(tx))) => {
                closing = true;
                reply = reply.or(tx);
                phase
            }
            Signal::Command(None) => {
                closing = true;
                phase
            }
            Signal::Timer(Timer::Debounce) => driver.step(phase, EditEvent::DebounceElapsed),
            Signal::Timer(Timer::Cooldown) => driver.step(phase, EditEvent::CooldownElapsed),
            Signal::Committed(Ok(())) => {
                driver.commits += 1;
                driver.last_error = None;
                tracing::debug!(
                    session = %driver.label,
                    commits = driver.commits,
                    "Commit acknowledged"
                );
                driver.step(phase, EditEvent::CommitAcked)
            }
            Signal::Committed(Err(message)) => {
                close_failed = teardown_committed;
                driver.step(phase, EditEvent::CommitFailed(message))
            }
        };
        view_tx.send_replace(driver.view(&phase));
    }

    let view = driver.view(&phase);
    if view.unsaved {
        tracing::warn!(session = %driver.label, "Edit session closed with unsaved edits");
    } else {
        tracing::debug!(session = %driver.label, commits = view.commits, "Edit session closed");
    }
    view_tx.send_replace(view.clone());
    if let Some(tx) = reply {
        let _ = tx.send(view);
    }
}

// ---------------------------------------------------------------------------
// Recurrence editor
// ---------------------------------------------------------------------------

struct StoreCommitter<S> {
    store: Arc<S>,
    owner_id: DbId,
}

impl<S> Committer<RecurrenceDefinition> for StoreCommitter<S>
where
    S: ScheduleStore + 'static,
{
    async fn commit(&self, value: RecurrenceDefinition) -> Result<(), StoreError> {
        self.store.save_recurrence_definition(self.owner_id, &value).await
    }
}

/// Interactive editor of one owner's day/parity grid.
pub struct RecurrenceEditor<S> {
    store: Arc<S>,
    owner_id: DbId,
    session: EditSession<RecurrenceDefinition>,
    outbound: OccupancySet,
    inbound: OccupancySet,
}

impl<S> RecurrenceEditor<S>
where
    S: ScheduleStore + 'static,
{
    /// Load the owner's definition and both occupancy snapshots, then start
    /// an edit session committing through `store`.
    pub async fn open(
        store: Arc<S>,
        owner_id: DbId,
        timing: ReconcileTiming,
    ) -> PlanningResult<Self> {
        let definition = store
            .get_recurrence_definition(owner_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "RecurrenceDefinition",
                id: owner_id,
            })?;
        let outbound = store
            .get_occupancy(&definition.resource_key(Direction::Outbound), owner_id)
            .await?;
        let inbound = store
            .get_occupancy(&definition.resource_key(Direction::Return), owner_id)
            .await?;

        let committer = Arc::new(StoreCommitter {
            store: Arc::clone(&store),
            owner_id,
        });
        let label = format!("owner:{owner_id}");
        let session = EditSession::spawn(definition, committer, timing, label);

        Ok(Self {
            store,
            owner_id,
            session,
            outbound,
            inbound,
        })
    }

    pub fn owner_id(&self) -> DbId {
        self.owner_id
    }

    /// Claims held by other owners on the given direction.
    pub fn occupancy(&self, direction: Direction) -> &OccupancySet {
        match direction {
            Direction::Outbound => &self.outbound,
            Direction::Return => &self.inbound,
        }
    }

    /// The optimistic local definition.
    pub fn current(&self) -> RecurrenceDefinition {
        self.session.view().value
    }

    pub fn view(&self) -> SessionView<RecurrenceDefinition> {
        self.session.view()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionView<RecurrenceDefinition>> {
        self.session.subscribe()
    }

    /// Turn one cell on or off. Turning on a cell another owner holds is
    /// rejected with [`CoreError::Conflicts`] and changes nothing.
    pub async fn toggle(
        &self,
        direction: Direction,
        weekday: u8,
        parity: DayParity,
        turn_on: bool,
    ) -> PlanningResult<RecurrenceDefinition> {
        let occupancy = self.occupancy(direction).clone();
        let updated = self
            .session
            .update(move |def: &RecurrenceDefinition| {
                let current = def.claims(direction);
                let claims =
                    toggle_claim_checked(current, &occupancy, weekday, parity, turn_on)?;
                Ok(def.clone().with_claims(direction, claims))
            })
            .await??;
        Ok(updated)
    }

    /// Claim every day of the week in `direction`, or nothing if any cell is
    /// already taken.
    pub async fn select_all(&self, direction: Direction) -> PlanningResult<RecurrenceDefinition> {
        let occupancy = self.occupancy(direction).clone();
        let result = self
            .session
            .update(move |def: &RecurrenceDefinition| {
                match apply_bulk(def.claims(direction), &DayClaimSet::full_week(), &occupancy) {
                    BulkOutcome::Applied(claims) => Ok(def.clone().with_claims(direction, claims)),
                    BulkOutcome::Rejected(conflicts) => Err(CoreError::Conflicts(conflicts)),
                }
            })
            .await?;
        if let Err(CoreError::Conflicts(conflicts)) = &result {
            tracing::info!(
                owner_id = self.owner_id,
                %direction,
                conflicts = conflicts.len(),
                "Select-all rejected"
            );
        }
        Ok(result?)
    }

    /// Drop every claim in `direction`.
    pub async fn clear(&self, direction: Direction) -> PlanningResult<RecurrenceDefinition> {
        let updated = self
            .session
            .update(move |def: &RecurrenceDefinition| {
                Ok(def.clone().with_claims(direction, DayClaimSet::new()))
            })
            .await??;
        Ok(updated)
    }

    /// Reload both occupancy snapshots from the store.
    pub async fn refresh_occupancy(&mut self) -> PlanningResult<()> {
        let definition = self.current();
        self.outbound = self
            .store
            .get_occupancy(&definition.resource_key(Direction::Outbound), self.owner_id)
            .await?;
        self.inbound = self
            .store
            .get_occupancy(&definition.resource_key(Direction::Return), self.owner_id)
            .await?;
        Ok(())
    }

    /// Offer the stored definition to the session; only applied when clean.
    pub async fn reload(&self) -> PlanningResult<()> {
        if let Some(definition) = self.store.get_recurrence_definition(self.owner_id).await? {
            self.session.external_refresh(definition)?;
        }
        Ok(())
    }

    pub fn external_refresh(&self, definition: RecurrenceDefinition) -> PlanningResult<()> {
        Ok(self.session.external_refresh(definition)?)
    }

    pub fn flush(&self) -> PlanningResult<()> {
        Ok(self.session.flush()?)
    }

    /// Flush pending edits and stop the session.
    pub async fn close(self) -> PlanningResult<SessionView<RecurrenceDefinition>> {
        Ok(self.session.close().await?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use assert_matches::assert_matches;
    use chrono::NaiveDate;
    use navette_core::claims::DayClaim;
    use tokio::time::sleep;

    use super::*;
    use crate::error::PlanningError;
    use crate::memory::InMemoryStore;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn definition(owner_id: DbId, label: &str, claims: &[(u8, DayParity)]) -> RecurrenceDefinition {
        let set = DayClaimSet::from_claims(
            claims.iter().map(|&(weekday, parity)| DayClaim { weekday, parity }),
        )
        .unwrap();
        RecurrenceDefinition::new(
            owner_id,
            label,
            "circuit-leg:1",
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        )
        .with_claims(Direction::Outbound, set)
    }

    async fn open(store: &InMemoryStore) -> RecurrenceEditor<InMemoryStore> {
        RecurrenceEditor::open(Arc::new(store.clone()), 1, ReconcileTiming::default())
            .await
            .unwrap()
    }

    fn seeded() -> InMemoryStore {
        let store = InMemoryStore::new();
        store.seed_definition(definition(1, "Arret Mairie", &[]));
        store.seed_definition(definition(2, "Circuit A", &[(5, DayParity::All)]));
        store
    }

    async fn stored(store: &InMemoryStore) -> RecurrenceDefinition {
        store.get_recurrence_definition(1).await.unwrap().unwrap()
    }

    /// Records committed values, optionally taking `delay` per commit.
    #[derive(Default)]
    struct Recorder {
        committed: Mutex<Vec<u32>>,
        delay: Duration,
    }

    impl Committer<u32> for Recorder {
        async fn commit(&self, value: u32) -> Result<(), StoreError> {
            tokio::time::sleep(self.delay).await;
            self.committed.lock().unwrap().push(value);
            Ok(())
        }
    }

    // -----------------------------------------------------------------------
    // Generic session
    // -----------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn session_commits_only_the_last_of_a_burst() {
        let recorder = Arc::new(Recorder::default());
        let session =
            EditSession::spawn(0u32, Arc::clone(&recorder), ReconcileTiming::default(), "test");

        for value in [1, 2, 3] {
            session.edit(value).unwrap();
            sleep(ms(100)).await;
        }
        sleep(ms(1000)).await;

        assert_eq!(*recorder.committed.lock().unwrap(), vec![3]);
        let view = session.view();
        assert_eq!(view.phase, PhaseKind::Cooldown);
        assert_eq!(view.commits, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn update_sees_previous_updates() {
        let recorder = Arc::new(Recorder::default());
        let session = EditSession::spawn(0u32, recorder, ReconcileTiming::default(), "test");

        session.update(|v| Ok(v + 1)).await.unwrap().unwrap();
        let value = session.update(|v| Ok(v + 10)).await.unwrap().unwrap();
        assert_eq!(value, 11);

        let rejected = session
            .update(|_| Err(CoreError::validation("nope")))
            .await
            .unwrap();
        assert_matches!(rejected, Err(CoreError::Validation(_)));
        assert_eq!(session.view().value, 11);
    }

    #[tokio::test(start_paused = true)]
    async fn close_publishes_final_view() {
        let recorder = Arc::new(Recorder::default());
        let session = EditSession::spawn(0u32, recorder, ReconcileTiming::default(), "test");
        let view = session.subscribe();
        session.close().await.unwrap();
        assert_eq!(view.borrow().phase, PhaseKind::Clean);
    }

    // -----------------------------------------------------------------------
    // Coalescing
    // -----------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn three_quick_toggles_make_one_commit() {
        let store = seeded();
        let editor = open(&store).await;

        editor.toggle(Direction::Outbound, 1, DayParity::All, true).await.unwrap();
        sleep(ms(100)).await;
        editor.toggle(Direction::Outbound, 2, DayParity::All, true).await.unwrap();
        sleep(ms(100)).await;
        editor.toggle(Direction::Outbound, 3, DayParity::Even, true).await.unwrap();

        sleep(ms(790)).await;
        assert_eq!(store.definition_saves(), 0);
        assert_eq!(editor.view().phase, PhaseKind::Dirty);

        sleep(ms(50)).await;
        assert_eq!(store.definition_saves(), 1);
        let claims = stored(&store).await.claims(Direction::Outbound).clone();
        assert_eq!(claims.get(1), Some(DayParity::All));
        assert_eq!(claims.get(2), Some(DayParity::All));
        assert_eq!(claims.get(3), Some(DayParity::Even));
        assert_eq!(editor.view().phase, PhaseKind::Cooldown);
    }

    #[tokio::test(start_paused = true)]
    async fn edit_during_commit_is_queued_then_committed() {
        let store = seeded();
        store.set_save_delay(Some(ms(1000)));
        let editor = open(&store).await;

        editor.toggle(Direction::Outbound, 1, DayParity::All, true).await.unwrap();
        sleep(ms(900)).await;
        assert_eq!(editor.view().phase, PhaseKind::Flushing);

        editor.toggle(Direction::Outbound, 2, DayParity::Odd, true).await.unwrap();
        assert_eq!(editor.current().claims(Direction::Outbound).len(), 2);

        // First commit lands at 1800 ms with only Monday.
        sleep(ms(1000)).await;
        assert_eq!(store.definition_saves(), 1);
        assert_eq!(stored(&store).await.claims(Direction::Outbound).len(), 1);
        assert_eq!(editor.view().phase, PhaseKind::Dirty);

        // Queued value is debounced and committed on its own.
        sleep(ms(1800)).await;
        assert_eq!(store.definition_saves(), 2);
        assert_eq!(
            stored(&store).await.claims(Direction::Outbound).get(2),
            Some(DayParity::Odd)
        );
    }

    // -----------------------------------------------------------------------
    // External refreshes
    // -----------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn stale_refresh_ignored_during_cooldown() {
        let store = seeded();
        let editor = open(&store).await;
        let stale = editor.current();

        editor.toggle(Direction::Outbound, 1, DayParity::All, true).await.unwrap();
        sleep(ms(1500)).await;
        assert_eq!(editor.view().phase, PhaseKind::Cooldown);

        editor.external_refresh(stale.clone()).unwrap();
        sleep(ms(1)).await;
        assert_eq!(editor.current().claims(Direction::Outbound).get(1), Some(DayParity::All));

        sleep(ms(3000)).await;
        assert_eq!(editor.view().phase, PhaseKind::Clean);
        editor.external_refresh(stale).unwrap();
        sleep(ms(1)).await;
        assert!(editor.current().claims(Direction::Outbound).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn reload_pulls_stored_definition_when_clean() {
        let store = seeded();
        let editor = open(&store).await;
        store.seed_definition(definition(1, "Arret Mairie", &[(4, DayParity::Odd)]));

        editor.reload().await.unwrap();
        sleep(ms(1)).await;
        assert_eq!(editor.current().claims(Direction::Outbound).get(4), Some(DayParity::Odd));
    }

    // -----------------------------------------------------------------------
    // Conflicts
    // -----------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn toggle_on_taken_cell_is_rejected() {
        let store = seeded();
        let editor = open(&store).await;

        let result = editor.toggle(Direction::Outbound, 5, DayParity::Odd, true).await;
        assert_matches!(result, Err(PlanningError::Core(CoreError::Conflicts(c))) => {
            assert_eq!(c[0].owner_label, "Circuit A");
        });
        assert_eq!(editor.view().phase, PhaseKind::Clean);

        // Same weekday on the other direction is free.
        editor.toggle(Direction::Return, 5, DayParity::Odd, true).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn select_all_is_all_or_nothing() {
        let store = seeded();
        let editor = open(&store).await;

        let result = editor.select_all(Direction::Outbound).await;
        assert_matches!(result, Err(PlanningError::Core(CoreError::Conflicts(c))) if c.len() == 2);
        assert!(editor.current().claims(Direction::Outbound).is_empty());

        let def = editor.select_all(Direction::Return).await.unwrap();
        assert_eq!(def.claims(Direction::Return).len(), 7);

        let def = editor.clear(Direction::Return).await.unwrap();
        assert!(def.claims(Direction::Return).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn refreshed_occupancy_sees_new_claims() {
        let store = seeded();
        let mut editor = open(&store).await;
        store.seed_definition(definition(3, "Circuit B", &[(1, DayParity::Even)]));

        editor.toggle(Direction::Outbound, 1, DayParity::Even, true).await.unwrap();
        editor.toggle(Direction::Outbound, 1, DayParity::Even, false).await.unwrap();

        editor.refresh_occupancy().await.unwrap();
        let result = editor.toggle(Direction::Outbound, 1, DayParity::Even, true).await;
        assert_matches!(result, Err(PlanningError::Core(CoreError::Conflicts(_))));
    }

    #[tokio::test]
    async fn open_unknown_owner_is_not_found() {
        let store = InMemoryStore::new();
        let result = RecurrenceEditor::open(Arc::new(store), 7, ReconcileTiming::default()).await;
        assert_matches!(
            result.err(),
            Some(PlanningError::Core(CoreError::NotFound { id: 7, .. }))
        );
    }

    // -----------------------------------------------------------------------
    // Failures
    // -----------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn failed_commit_stays_dirty_until_flushed() {
        let store = seeded();
        store.set_fail_saves(true);
        let editor = open(&store).await;

        editor.toggle(Direction::Outbound, 2, DayParity::All, true).await.unwrap();
        sleep(ms(900)).await;
        let view = editor.view();
        assert_eq!(view.phase, PhaseKind::Dirty);
        assert!(view.last_error.is_some());

        // No automatic retry.
        sleep(ms(10_000)).await;
        assert_eq!(editor.view().phase, PhaseKind::Dirty);

        store.set_fail_saves(false);
        editor.flush().unwrap();
        sleep(ms(1)).await;
        let view = editor.view();
        assert_eq!(view.phase, PhaseKind::Cooldown);
        assert_eq!(view.last_error, None);
        assert_eq!(store.definition_saves(), 1);
    }

    // -----------------------------------------------------------------------
    // Teardown
    // -----------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn close_flushes_dirty_edit() {
        let store = seeded();
        let editor = open(&store).await;

        editor.toggle(Direction::Outbound, 3, DayParity::All, true).await.unwrap();
        let view = editor.close().await.unwrap();

        assert!(!view.unsaved);
        assert_eq!(view.phase, PhaseKind::Clean);
        assert_eq!(store.definition_saves(), 1);
        assert_eq!(stored(&store).await.claims(Direction::Outbound).get(3), Some(DayParity::All));
    }

    #[tokio::test(start_paused = true)]
    async fn close_while_flushing_commits_pending_edit() {
        let store = seeded();
        store.set_save_delay(Some(ms(1000)));
        let editor = open(&store).await;

        editor.toggle(Direction::Outbound, 1, DayParity::All, true).await.unwrap();
        sleep(ms(900)).await;
        editor.toggle(Direction::Outbound, 2, DayParity::All, true).await.unwrap();

        let view = editor.close().await.unwrap();
        assert!(!view.unsaved);
        assert_eq!(view.commits, 2);
        assert_eq!(stored(&store).await.claims(Direction::Outbound).len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn close_retries_pending_edit_after_in_flight_failure() {
        let store = seeded();
        store.set_save_delay(Some(ms(1000)));
        let editor = open(&store).await;

        editor.toggle(Direction::Outbound, 1, DayParity::All, true).await.unwrap();
        sleep(ms(900)).await;
        // The commit of Monday is in flight until t=1800 and will fail.
        editor.toggle(Direction::Outbound, 2, DayParity::All, true).await.unwrap();
        store.set_fail_saves(true);
        let recovering = store.clone();
        tokio::spawn(async move {
            sleep(ms(950)).await;
            recovering.set_fail_saves(false);
        });

        let view = editor.close().await.unwrap();
        assert!(!view.unsaved);
        assert_eq!(view.commits, 1);
        assert_eq!(view.last_error, None);
        assert_eq!(store.definition_saves(), 1);
        let claims = stored(&store).await.claims(Direction::Outbound).clone();
        assert_eq!(claims.get(1), Some(DayParity::All));
        assert_eq!(claims.get(2), Some(DayParity::All));
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_editor_still_flushes() {
        let store = seeded();
        let editor = open(&store).await;

        editor.toggle(Direction::Outbound, 6, DayParity::Odd, true).await.unwrap();
        drop(editor);
        sleep(ms(10)).await;

        assert_eq!(store.definition_saves(), 1);
        assert_eq!(stored(&store).await.claims(Direction::Outbound).get(6), Some(DayParity::Odd));
    }

    #[tokio::test(start_paused = true)]
    async fn close_after_failure_reports_unsaved() {
        let store = seeded();
        store.set_fail_saves(true);
        let editor = open(&store).await;

        editor.toggle(Direction::Outbound, 1, DayParity::All, true).await.unwrap();
        let view = editor.close().await.unwrap();
        assert!(view.unsaved);
        assert!(view.last_error.is_some());
        assert_eq!(store.definition_saves(), 0);
    }
}
