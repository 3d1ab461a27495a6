//! The `Scheduler` — owns a set of [`Schedulable`]s and cycles them on a
//! dedicated loop thread.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::thread;
use std::time::Duration;

use amas_core::sync::relock;

use crate::{DEFAULT_SLEEP_MS, Schedulable};

// ── State machine ─────────────────────────────────────────────────────────────

/// Internal scheduling state.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum SchedulingState {
    /// No loop thread is running.
    Idle,
    /// The loop thread is cycling members.
    Running,
    /// The loop thread will exit at the next tick boundary.
    PendingStop,
}

/// Lifecycle notifications emitted by a [`Scheduler`].
///
/// Notifications carry no payload beyond the event kind; observers that need
/// more read the scheduler back through their own handle.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum SchedulerEvent {
    /// The sleep interval was (re)configured by `start`, `step`, or `stop`.
    /// Emitted even while the scheduler is soft-locked, so observers can
    /// react during construction.
    SpeedChanged,
    /// A run ended: every member has executed the same number of ticks and
    /// received `on_scheduling_stops`.
    Stopped,
}

type Listener = Arc<dyn Fn(SchedulerEvent) + Send + Sync>;

// ── Scheduler ─────────────────────────────────────────────────────────────────

/// Drives a set of [`Schedulable`]s through synchronized cycles.
///
/// Created with [`Scheduler::new`], which returns an `Arc` so the loop
/// thread, listeners, and free-running workers can all hold handles.
///
/// # Membership
///
/// [`add`][Self::add] and [`remove`][Self::remove] stage changes; they are
/// materialized only when the loop is between runs (before the first tick
/// and after the loop exits), so no member ever observes a partial tick.
///
/// # Soft lock
///
/// [`lock`][Self::lock] / [`unlock`][Self::unlock] maintain a reentrant
/// counter; while it is positive, `start` and `step` are no-ops.  A
/// container locks the scheduler for the duration of its construction so
/// nothing can trigger execution before its children are registered.
pub struct Scheduler {
    weak_self: Weak<Scheduler>,
    members: Mutex<Vec<Arc<dyn Schedulable>>>,
    pending_add: Mutex<Vec<Arc<dyn Schedulable>>>,
    pending_remove: Mutex<Vec<Arc<dyn Schedulable>>>,
    state: Mutex<SchedulingState>,
    soft_locks: AtomicI64,
    sleep_ms: AtomicU64,
    listeners: Mutex<Vec<Listener>>,
}

impl Scheduler {
    /// Create an idle scheduler with no members.
    pub fn new() -> Arc<Scheduler> {
        Arc::new_cyclic(|weak| Scheduler {
            weak_self: weak.clone(),
            members: Mutex::new(Vec::new()),
            pending_add: Mutex::new(Vec::new()),
            pending_remove: Mutex::new(Vec::new()),
            state: Mutex::new(SchedulingState::Idle),
            soft_locks: AtomicI64::new(0),
            sleep_ms: AtomicU64::new(DEFAULT_SLEEP_MS),
            listeners: Mutex::new(Vec::new()),
        })
    }

    // ── Membership ────────────────────────────────────────────────────────

    /// Stage a schedulable for addition at the next loop boundary.
    pub fn add(&self, member: Arc<dyn Schedulable>) {
        relock(&self.pending_add).push(member);
    }

    /// Stage a schedulable for removal at the next loop boundary.
    ///
    /// Identity is pointer identity: the staged handle must be a clone of
    /// the one that was added.
    pub fn remove(&self, member: &Arc<dyn Schedulable>) {
        relock(&self.pending_remove).push(Arc::clone(member));
    }

    fn apply_pending_members(&self) {
        let mut members = relock(&self.members);
        members.extend(relock(&self.pending_add).drain(..));
        for gone in relock(&self.pending_remove).drain(..) {
            members.retain(|m| !Arc::ptr_eq(m, &gone));
        }
    }

    // ── Run control ───────────────────────────────────────────────────────

    /// Start (or continue) with no delay between cycles.
    pub fn start(&self) {
        self.start_with(DEFAULT_SLEEP_MS);
    }

    /// Start (or continue) with `interval_ms` milliseconds between cycles.
    ///
    /// No-op while soft-locked or not `Idle`, but the speed-changed
    /// notification fires unconditionally.
    pub fn start_with(&self, interval_ms: u64) {
        if self.soft_locks.load(Ordering::SeqCst) <= 0 {
            self.sleep_ms.store(interval_ms, Ordering::SeqCst);
            let mut state = relock(&self.state);
            if *state == SchedulingState::Idle {
                *state = SchedulingState::Running;
                drop(state);
                self.spawn_loop();
            }
        }
        self.emit(SchedulerEvent::SpeedChanged);
    }

    /// Run exactly one tick.
    ///
    /// Launches the loop already in `PendingStop`, so the do-while body
    /// executes once and the loop exits at its first boundary check.
    pub fn step(&self) {
        if self.soft_locks.load(Ordering::SeqCst) <= 0 {
            self.sleep_ms.store(0, Ordering::SeqCst);
            let mut state = relock(&self.state);
            if *state == SchedulingState::Idle {
                *state = SchedulingState::PendingStop;
                drop(state);
                self.spawn_loop();
            }
        }
        self.emit(SchedulerEvent::SpeedChanged);
    }

    /// Request a cooperative stop.
    ///
    /// Observed at the next tick boundary — a tick already in progress
    /// always completes.  Idempotent when the scheduler is `Idle`.
    pub fn stop(&self) {
        {
            let mut state = relock(&self.state);
            if *state == SchedulingState::Running {
                *state = SchedulingState::PendingStop;
            }
        }
        self.emit(SchedulerEvent::SpeedChanged);
    }

    /// Soft-lock the scheduler so a premature `start`/`step` is ignored.
    pub fn lock(&self) {
        self.soft_locks.fetch_add(1, Ordering::SeqCst);
    }

    /// Release one soft lock.
    pub fn unlock(&self) {
        self.soft_locks.fetch_sub(1, Ordering::SeqCst);
    }

    // ── Observation ───────────────────────────────────────────────────────

    /// Whether a run is currently in progress.
    pub fn is_running(&self) -> bool {
        *relock(&self.state) == SchedulingState::Running
    }

    /// Whether the scheduler is idle (no loop thread alive or pending).
    pub fn is_idle(&self) -> bool {
        *relock(&self.state) == SchedulingState::Idle
    }

    /// The configured sleep between cycles, in milliseconds.
    ///
    /// Free-running agents read this to pace their own loops.
    pub fn sleep_ms(&self) -> u64 {
        self.sleep_ms.load(Ordering::SeqCst)
    }

    /// Subscribe to lifecycle notifications.
    pub fn observe(&self, listener: impl Fn(SchedulerEvent) + Send + Sync + 'static) {
        relock(&self.listeners).push(Arc::new(listener));
    }

    fn emit(&self, event: SchedulerEvent) {
        // Snapshot under the lock, invoke outside it: a listener may call
        // back into the scheduler.
        let listeners: Vec<Listener> = relock(&self.listeners).clone();
        for listener in &listeners {
            listener(event);
        }
    }

    // ── Loop ──────────────────────────────────────────────────────────────

    fn spawn_loop(&self) {
        let Some(me) = self.weak_self.upgrade() else {
            return;
        };
        let spawned = thread::Builder::new()
            .name("amas-scheduler".into())
            .spawn(move || me.run());
        if let Err(err) = spawned {
            tracing::error!(%err, "could not spawn the scheduler loop thread");
            *relock(&self.state) = SchedulingState::Idle;
        }
    }

    /// The loop body, on the dedicated scheduler thread.
    fn run(self: Arc<Self>) {
        self.apply_pending_members();
        let members: Vec<Arc<dyn Schedulable>> = relock(&self.members).clone();

        for member in &members {
            member.on_scheduling_starts();
        }

        // Do-while: the body runs at least once, which is what makes
        // `step()` (loop launched in PendingStop) produce exactly one tick.
        loop {
            for member in &members {
                member.cycle();
            }

            let sleep = self.sleep_ms.load(Ordering::SeqCst);
            if sleep != 0 {
                thread::sleep(Duration::from_millis(sleep));
            }

            let mut must_stop = false;
            for member in &members {
                must_stop |= member.stop_condition();
            }
            if must_stop || *relock(&self.state) != SchedulingState::Running {
                break;
            }
        }

        *relock(&self.state) = SchedulingState::Idle;

        for member in &members {
            member.on_scheduling_stops();
        }

        self.apply_pending_members();
        self.emit(SchedulerEvent::Stopped);
    }
}
