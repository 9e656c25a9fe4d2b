//! Purpose: Drive fetch-on-load, periodic polling, and write-then-reconcile.
//! Exports: `SyncOrchestrator`, `LoadPhase`, `RosterEvent`, `DEFAULT_POLL_INTERVAL`.
//! Role: Sole owner of the in-memory raw roster and its error/loading flags;
//! other components read snapshots or request operations through it.
//! Invariants: A save or delete completes its reconciling read before
//! returning; no stale roster is exposed after a mutation resolves.
//! Invariants: A failed read leaves the previous roster intact.
//! Invariants: One poll timer, re-armed on every load; never two schedules.
//! Invariants: Form-local edits live with the caller; polling only replaces
//! the raw roster underneath them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

use super::backend::Backend;
use super::confirm::Confirmation;
use super::session::{SessionBootstrap, SessionIdentity};
use crate::core::error::{Error, ErrorKind};
use crate::core::query::{self, FilterCriteria};
use crate::core::record::{StudentRecord, normalize_roster};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(20);

/// Upper bound on one poll-loop sleep so a stop flag is honored promptly.
const MAX_IDLE_SLEEP: Duration = Duration::from_millis(250);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LoadPhase {
    Unloaded,
    Loading,
    Ready,
}

/// Notifications for observers that recompute derived views.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RosterEvent {
    Loaded { records: usize },
    Saved { student_id: String },
    Deleted { id: String },
    Error { message: String },
}

struct PollTimer {
    interval: Duration,
    next_due: Option<Instant>,
}

impl PollTimer {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_due: None,
        }
    }

    /// Arming always overwrites the schedule, so repeated arms collapse to
    /// a single next-due instant (no two concurrent polls).
    fn arm(&mut self, now: Instant) {
        self.next_due = Some(now + self.interval);
    }

    fn due(&self, now: Instant) -> bool {
        self.next_due.is_some_and(|due| now >= due)
    }

    fn until_due(&self, now: Instant) -> Option<Duration> {
        self.next_due.map(|due| due.saturating_duration_since(now))
    }
}

pub struct SyncOrchestrator {
    backend: Box<dyn Backend>,
    session: Box<dyn SessionBootstrap>,
    identity: Option<SessionIdentity>,
    roster: Vec<StudentRecord>,
    phase: LoadPhase,
    saving: bool,
    deleting: bool,
    banner: Option<String>,
    timer: PollTimer,
    subscribers: Vec<Sender<RosterEvent>>,
}

impl SyncOrchestrator {
    pub fn new(backend: Box<dyn Backend>, session: Box<dyn SessionBootstrap>) -> Self {
        Self {
            backend,
            session,
            identity: None,
            roster: Vec::new(),
            phase: LoadPhase::Unloaded,
            saving: false,
            deleting: false,
            banner: None,
            timer: PollTimer::new(DEFAULT_POLL_INTERVAL),
            subscribers: Vec::new(),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.timer = PollTimer::new(interval);
        self
    }

    pub fn phase(&self) -> LoadPhase {
        self.phase
    }

    pub fn roster(&self) -> &[StudentRecord] {
        &self.roster
    }

    /// Visible error banner text, if the last operation failed.
    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn identity(&self) -> Option<&SessionIdentity> {
        self.identity.as_ref()
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn is_deleting(&self) -> bool {
        self.deleting
    }

    /// Register an observer. Disconnected receivers are pruned on emit.
    pub fn subscribe(&mut self) -> Receiver<RosterEvent> {
        let (sender, receiver) = mpsc::channel();
        self.subscribers.push(sender);
        receiver
    }

    /// Compute the filtered/searched/sorted view of the current roster.
    pub fn view(&self, criteria: &FilterCriteria) -> Vec<StudentRecord> {
        query::apply(&self.roster, criteria)
    }

    /// Fetch the roster from the active backend and replace the in-memory
    /// copy atomically. The first call waits on the session bootstrap.
    pub fn load(&mut self) -> Result<(), Error> {
        self.ensure_ready()?;
        if self.phase == LoadPhase::Unloaded {
            self.phase = LoadPhase::Loading;
        }
        let now = Instant::now();
        match self.backend.read() {
            Ok(roster) => {
                let roster = normalize_roster(roster);
                tracing::debug!(records = roster.len(), "roster loaded");
                self.roster = roster;
                self.phase = LoadPhase::Ready;
                self.banner = None;
                self.timer.arm(now);
                self.emit(RosterEvent::Loaded {
                    records: self.roster.len(),
                });
                Ok(())
            }
            Err(err) => {
                // Previous roster stays; polling keeps trying.
                if self.phase == LoadPhase::Loading {
                    self.phase = LoadPhase::Unloaded;
                }
                self.timer.arm(now);
                self.fail(err)
            }
        }
    }

    /// Create or update one record. Validation runs before any backend
    /// call; the backend's returned roster replaces the in-memory copy.
    pub fn save(&mut self, record: &StudentRecord) -> Result<(), Error> {
        if self.saving {
            return Err(Error::new(ErrorKind::Busy)
                .with_message("a save is already in flight")
                .with_hint("Wait for the current save to finish."));
        }
        validate_record(record)?;
        self.ensure_ready()?;

        self.saving = true;
        let result = self.backend.write(record);
        self.saving = false;

        match result {
            Ok(roster) => {
                self.roster = normalize_roster(roster);
                self.banner = None;
                self.emit(RosterEvent::Saved {
                    student_id: record.student_id.clone(),
                });
                Ok(())
            }
            Err(err) => self.fail(err),
        }
    }

    /// Remove one record after the confirmation collaborator affirms.
    /// Returns `Ok(false)` when the caller declines; repeated deletes of
    /// the same id are no-ops at the backend.
    pub fn delete(&mut self, id: &str, confirm: &dyn Confirmation) -> Result<bool, Error> {
        if self.deleting {
            return Err(Error::new(ErrorKind::Busy)
                .with_message("a delete is already in flight")
                .with_hint("Wait for the current delete to finish."));
        }
        if !confirm.confirm(&format!("Delete student record {id}?"))? {
            return Ok(false);
        }
        self.ensure_ready()?;

        self.deleting = true;
        let result = self.backend.remove(id);
        self.deleting = false;

        match result {
            Ok(roster) => {
                self.roster = normalize_roster(roster);
                self.banner = None;
                self.emit(RosterEvent::Deleted { id: id.to_string() });
                Ok(true)
            }
            Err(err) => self.fail(err).map(|_| false),
        }
    }

    /// Run one scheduler step: poll if the timer is due. Poll failures are
    /// recorded on the banner and emitted, never propagated — the loop
    /// must keep going.
    pub fn tick(&mut self, now: Instant) -> bool {
        if !self.timer.due(now) {
            return false;
        }
        if let Err(err) = self.load() {
            tracing::warn!(error = %err, "poll failed, keeping previous roster");
        }
        true
    }

    /// Blocking poll loop for `watch`: initial load, then `tick` until the
    /// stop flag is set. Bootstrap failure is fatal; read failures are not.
    pub fn run(&mut self, stop: &AtomicBool) -> Result<(), Error> {
        if let Err(err) = self.load() {
            if err.kind() == ErrorKind::AuthInit {
                return Err(err);
            }
            tracing::warn!(error = %err, "initial load failed, polling continues");
        }
        while !stop.load(Ordering::Acquire) {
            self.tick(Instant::now());
            std::thread::sleep(self.idle_sleep(Instant::now()));
        }
        Ok(())
    }

    fn idle_sleep(&self, now: Instant) -> Duration {
        match self.timer.until_due(now) {
            Some(remaining) if remaining < MAX_IDLE_SLEEP => remaining.max(Duration::from_millis(1)),
            _ => MAX_IDLE_SLEEP,
        }
    }

    fn ensure_ready(&mut self) -> Result<(), Error> {
        if self.identity.is_none() {
            let identity = self.session.wait_ready()?;
            tracing::debug!(user = %identity.user_id, "session ready");
            self.identity = Some(identity);
        }
        Ok(())
    }

    fn fail(&mut self, err: Error) -> Result<(), Error> {
        self.banner = Some(err.to_string());
        self.emit(RosterEvent::Error {
            message: err.to_string(),
        });
        Err(err)
    }

    fn emit(&mut self, event: RosterEvent) {
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }
}

fn validate_record(record: &StudentRecord) -> Result<(), Error> {
    let mut missing = Vec::new();
    if record.student_id.trim().is_empty() {
        missing.push("studentId");
    }
    if record.student_name.trim().is_empty() {
        missing.push("studentName");
    }
    if missing.is_empty() {
        return Ok(());
    }
    Err(Error::new(ErrorKind::Validation)
        .with_message(format!("missing required fields: {}", missing.join(", ")))
        .with_hint("Student ID and name are mandatory."))
}
