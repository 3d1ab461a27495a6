//! The `Amas` — the per-tick orchestrator of a multi-agent system.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::thread;
use std::time::Duration;

use amas_agent::{AgentBehavior, AgentCell, AgentDirectory, AgentMode, SignalSink};
use amas_core::sync::relock;
use amas_core::{AgentId, AgentRng, AmasError, AmasResult, ExecutionPolicy, SimRng};
use amas_sched::{Schedulable, Scheduler, SchedulerEvent};
use rustc_hash::FxHashSet;

use crate::config::{EngineConfig, Parallelism};
use crate::environment::Environment;
use crate::latch::PhaseLatch;
use crate::model::AmasModel;

// ── Signals ───────────────────────────────────────────────────────────────────

/// The two observable per-agent lifecycle signals.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum AgentSignal {
    /// The agent finished its perception phase.
    Perceived,
    /// The agent finished its decision/action phase.
    Acted,
}

type SignalListener = Arc<dyn Fn(AgentId, AgentSignal) + Send + Sync>;

/// Per-dispatch sink: releases the tick's latches exactly once per signal
/// and fans the signal out to external listeners.
struct CycleSignals {
    perception_latch: Option<Arc<PhaseLatch>>,
    action_latch: Option<Arc<PhaseLatch>>,
    listeners: Vec<SignalListener>,
    fired_perceived: AtomicBool,
    fired_acted: AtomicBool,
}

impl CycleSignals {
    fn new(
        perception_latch: Option<Arc<PhaseLatch>>,
        action_latch: Option<Arc<PhaseLatch>>,
        listeners: Vec<SignalListener>,
    ) -> CycleSignals {
        CycleSignals {
            perception_latch,
            action_latch,
            listeners,
            fired_perceived: AtomicBool::new(false),
            fired_acted: AtomicBool::new(false),
        }
    }

    /// Release whatever this dispatch still owes the barrier.
    ///
    /// A no-op after a normal cycle; after an interrupted or phase-desynced
    /// one it is what keeps the orchestrator from waiting forever.
    fn settle(&self) {
        if let Some(latch) = &self.perception_latch {
            if !self.fired_perceived.swap(true, Ordering::SeqCst) {
                latch.release();
            }
        }
        if let Some(latch) = &self.action_latch {
            if !self.fired_acted.swap(true, Ordering::SeqCst) {
                latch.release();
            }
        }
    }
}

impl SignalSink for CycleSignals {
    fn perceived(&self, agent: AgentId) {
        if let Some(latch) = &self.perception_latch {
            if !self.fired_perceived.swap(true, Ordering::SeqCst) {
                latch.release();
            }
        }
        for listener in &self.listeners {
            listener(agent, AgentSignal::Perceived);
        }
    }

    fn acted(&self, agent: AgentId) {
        if let Some(latch) = &self.action_latch {
            if !self.fired_acted.swap(true, Ordering::SeqCst) {
                latch.release();
            }
        }
        for listener in &self.listeners {
            listener(agent, AgentSignal::Acted);
        }
    }
}

// ── Amas ──────────────────────────────────────────────────────────────────────

/// The multi-agent system controller.
///
/// A `Schedulable` that, once per tick, runs every synchronous agent through
/// its phases under a counting barrier, applies staged population changes at
/// the tick boundary, and keeps free-running agents cycling at the
/// scheduler's pace outside the barrier.
///
/// Created with [`Amas::new`], which locks the owned scheduler for the whole
/// construction protocol so nothing can trigger execution before the initial
/// population is ready.
pub struct Amas<E: Environment, M: AmasModel<E>> {
    weak_self: Weak<Amas<E, M>>,
    env: Arc<E>,
    model: M,
    config: EngineConfig,
    scheduler: Arc<Scheduler>,
    directory: Arc<AgentDirectory<E>>,
    /// Live members in admission order.  Mutated only at tick boundaries;
    /// outside the cycle hooks, readers may observe boundary churn.
    agents: Mutex<Vec<Arc<AgentCell<E>>>>,
    pending_add: Mutex<Vec<Arc<AgentCell<E>>>>,
    pending_remove: Mutex<Vec<AgentId>>,
    /// Asynchronous members whose free-running loop is currently alive.
    running_async: Mutex<FxHashSet<AgentId>>,
    signal_listeners: Mutex<Vec<SignalListener>>,
    next_id: AtomicU32,
    cycles: AtomicU64,
    rng: Mutex<SimRng>,
}

impl<E: Environment, M: AmasModel<E>> Amas<E, M> {
    /// Build a system: initialize the environment, run the model's
    /// construction hooks, admit the initial population, and register with
    /// a freshly created (still idle) scheduler.
    pub fn new(mut env: E, model: M, config: EngineConfig) -> Arc<Amas<E, M>> {
        let mut rng = SimRng::new(config.seed);
        env.on_initialization(&mut rng);
        env.on_initial_entities_creation(&mut rng);

        let scheduler = Scheduler::new();
        scheduler.lock();

        let amas = Arc::new_cyclic(|weak| Amas {
            weak_self: weak.clone(),
            env: Arc::new(env),
            model,
            config,
            scheduler: Arc::clone(&scheduler),
            directory: Arc::new(AgentDirectory::new()),
            agents: Mutex::new(Vec::new()),
            pending_add: Mutex::new(Vec::new()),
            pending_remove: Mutex::new(Vec::new()),
            running_async: Mutex::new(FxHashSet::default()),
            signal_listeners: Mutex::new(Vec::new()),
            next_id: AtomicU32::new(0),
            cycles: AtomicU64::new(0),
            rng: Mutex::new(rng),
        });

        amas.model.on_initial_configuration(&amas);
        amas.model.on_initial_agents_creation(&amas);
        amas.admit_pending_agents();
        amas.model.on_ready(&amas);

        scheduler.add(amas.clone());
        let weak = Arc::downgrade(&amas);
        scheduler.observe(move |event| {
            if event == SchedulerEvent::SpeedChanged {
                if let Some(amas) = weak.upgrade() {
                    amas.rearm_async_agents();
                }
            }
        });
        scheduler.unlock();

        amas
    }

    // ── Population ────────────────────────────────────────────────────────

    /// Stage an agent for admission at the next tick boundary (or, during
    /// construction, at the end of `on_initial_agents_creation`).
    ///
    /// The returned id is valid immediately for neighborhood wiring, but
    /// the agent joins no barrier before its admission completes.
    pub fn add_agent(&self, behavior: impl AgentBehavior<E>, mode: AgentMode) -> AgentId {
        let id = AgentId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let rng = AgentRng::new(self.config.seed, id);
        let cell = Arc::new(AgentCell::new(id, mode, rng, Box::new(behavior)));
        relock(&self.pending_add).push(cell);
        id
    }

    /// Stage an agent for removal at the end of the current tick.  The
    /// agent still executes the tick in full.
    pub fn remove_agent(&self, id: AgentId) {
        relock(&self.pending_remove).push(id);
    }

    /// Wire `neighbors` into `agent`'s neighborhood (staged or live).
    pub fn add_neighbors(&self, agent: AgentId, neighbors: &[AgentId]) -> AmasResult<()> {
        match self.find_cell(agent) {
            Some(cell) => {
                cell.add_neighbors(neighbors);
                Ok(())
            }
            None => Err(AmasError::UnknownAgent(agent)),
        }
    }

    fn find_cell(&self, id: AgentId) -> Option<Arc<AgentCell<E>>> {
        self.directory
            .get(id)
            .or_else(|| relock(&self.pending_add).iter().find(|c| c.id() == id).cloned())
    }

    /// Drain the pending-addition queue into the live set.
    ///
    /// Two passes: every cell of the batch is inserted before any
    /// `before_ready`/`ready` runs, so no ready hook ever observes a
    /// partially-added batch.
    fn admit_pending_agents(&self) {
        let added: Vec<Arc<AgentCell<E>>> = relock(&self.pending_add).drain(..).collect();
        if added.is_empty() {
            return;
        }
        {
            let mut agents = relock(&self.agents);
            for cell in &added {
                agents.push(Arc::clone(cell));
                self.directory.insert(Arc::clone(cell));
            }
        }
        for cell in &added {
            cell.before_ready(&self.env);
            cell.ready(&self.env);
            if cell.mode() == AgentMode::Asynchronous {
                self.start_async_agent(Arc::clone(cell));
            }
        }
    }

    fn apply_pending_removals(&self) {
        let removed: Vec<AgentId> = relock(&self.pending_remove).drain(..).collect();
        if removed.is_empty() {
            return;
        }
        let mut agents = relock(&self.agents);
        for id in removed {
            agents.retain(|c| c.id() != id);
            self.directory.remove(id);
        }
    }

    // ── Free-running agents ───────────────────────────────────────────────

    fn start_async_agent(&self, cell: Arc<AgentCell<E>>) {
        let id = cell.id();
        if !relock(&self.running_async).insert(id) {
            return; // already cycling
        }
        let weak = self.weak_self.clone();
        let spawned = thread::Builder::new()
            .name(format!("amas-agent-{}", id.0))
            .spawn(move || Self::run_async_agent(weak, cell));
        if let Err(err) = spawned {
            tracing::error!(%err, agent = %id, "could not spawn a free-running agent thread");
            relock(&self.running_async).remove(&id);
        }
    }

    /// The free-running loop: one full cycle, then re-check that the
    /// scheduler is still running and the agent is still a member, then
    /// sleep the scheduler's current interval and repeat.
    fn run_async_agent(weak: Weak<Amas<E, M>>, cell: Arc<AgentCell<E>>) {
        loop {
            let Some(amas) = weak.upgrade() else { return };
            let listeners: Vec<SignalListener> = relock(&amas.signal_listeners).clone();
            let signals = CycleSignals::new(None, None, listeners);
            run_agent(&cell, ExecutionPolicy::OnePhase, &amas.env, &amas.directory, &signals);

            if !(amas.scheduler.is_running() && amas.contains_agent(cell.id())) {
                relock(&amas.running_async).remove(&cell.id());
                return;
            }
            let sleep_ms = amas.scheduler.sleep_ms();
            drop(amas);
            if sleep_ms > 0 {
                thread::sleep(Duration::from_millis(sleep_ms));
            } else {
                thread::yield_now();
            }
        }
    }

    /// Speed-changed reaction: restart the loop of any asynchronous member
    /// that dropped out (for example because the scheduler was idle).
    fn rearm_async_agents(&self) {
        if !self.scheduler.is_running() {
            return;
        }
        let asyncs: Vec<Arc<AgentCell<E>>> = relock(&self.agents)
            .iter()
            .filter(|c| c.mode() == AgentMode::Asynchronous)
            .cloned()
            .collect();
        for cell in asyncs {
            self.start_async_agent(cell);
        }
    }

    // ── Read surface ──────────────────────────────────────────────────────

    pub fn env(&self) -> &E {
        &self.env
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Ticks completed so far.
    pub fn cycle_count(&self) -> u64 {
        self.cycles.load(Ordering::SeqCst)
    }

    pub fn agent_count(&self) -> usize {
        relock(&self.agents).len()
    }

    /// Live agent ids in admission order.
    pub fn agent_ids(&self) -> Vec<AgentId> {
        relock(&self.agents).iter().map(|c| c.id()).collect()
    }

    pub fn contains_agent(&self, id: AgentId) -> bool {
        self.directory.contains(id)
    }

    /// Number of free-running loops currently alive.
    pub fn free_running_count(&self) -> usize {
        relock(&self.running_async).len()
    }

    /// The criticality last published by `id`.
    pub fn criticality_of(&self, id: AgentId) -> AmasResult<f64> {
        self.directory
            .get(id)
            .map(|cell| cell.criticality())
            .ok_or(AmasError::UnknownAgent(id))
    }

    /// A copy of `id`'s criticality snapshot.
    pub fn snapshot_of(&self, id: AgentId) -> AmasResult<Vec<(AgentId, f64)>> {
        self.directory
            .get(id)
            .map(|cell| cell.snapshot())
            .ok_or(AmasError::UnknownAgent(id))
    }

    /// Run a closure with the simulation-level RNG (application draws).
    pub fn with_rng<R>(&self, f: impl FnOnce(&mut SimRng) -> R) -> R {
        f(&mut relock(&self.rng))
    }

    /// Subscribe to the per-agent lifecycle signals.
    pub fn observe_signals(&self, listener: impl Fn(AgentId, AgentSignal) + Send + Sync + 'static) {
        relock(&self.signal_listeners).push(Arc::new(listener));
    }

    // ── Dispatch ──────────────────────────────────────────────────────────

    fn dispatch(&self, cell: &Arc<AgentCell<E>>, policy: ExecutionPolicy, signals: CycleSignals) {
        match self.config.parallelism {
            Parallelism::Sequential => {
                run_agent(cell, policy, &self.env, &self.directory, &signals);
            }
            Parallelism::WorkerPool => {
                let cell = Arc::clone(cell);
                let env = Arc::clone(&self.env);
                let directory = Arc::clone(&self.directory);
                rayon::spawn(move || run_agent(&cell, policy, &env, &directory, &signals));
            }
        }
    }
}

impl<E: Environment, M: AmasModel<E>> Schedulable for Amas<E, M> {
    /// One tick: fix the synchronous set, run it under the phase barrier,
    /// apply staged population edits, report.
    fn cycle(&self) {
        self.cycles.fetch_add(1, Ordering::SeqCst);

        let mut sync_agents: Vec<Arc<AgentCell<E>>> = relock(&self.agents)
            .iter()
            .filter(|c| c.is_synchronous())
            .cloned()
            .collect();
        // Dispatch order only; the barrier makes the tick's semantics
        // independent of it.
        sync_agents.sort_by_key(|c| c.execution_order());

        self.model.on_cycle_begin(self);

        if !sync_agents.is_empty() {
            let listeners: Vec<SignalListener> = relock(&self.signal_listeners).clone();
            let perceived = Arc::new(PhaseLatch::new(sync_agents.len()));
            let acted = Arc::new(PhaseLatch::new(sync_agents.len()));

            match self.model.execution_policy() {
                ExecutionPolicy::OnePhase => {
                    for cell in &sync_agents {
                        let signals = CycleSignals::new(
                            Some(Arc::clone(&perceived)),
                            Some(Arc::clone(&acted)),
                            listeners.clone(),
                        );
                        self.dispatch(cell, ExecutionPolicy::OnePhase, signals);
                    }
                    perceived.wait();
                    acted.wait();
                }
                ExecutionPolicy::TwoPhases => {
                    for cell in &sync_agents {
                        let signals = CycleSignals::new(
                            Some(Arc::clone(&perceived)),
                            None,
                            listeners.clone(),
                        );
                        self.dispatch(cell, ExecutionPolicy::TwoPhases, signals);
                    }
                    perceived.wait();

                    for cell in &sync_agents {
                        let signals = CycleSignals::new(
                            None,
                            Some(Arc::clone(&acted)),
                            listeners.clone(),
                        );
                        self.dispatch(cell, ExecutionPolicy::TwoPhases, signals);
                    }
                    acted.wait();
                }
            }
        }

        self.apply_pending_removals();
        self.admit_pending_agents();
        self.model.on_cycle_end(self);
    }

    fn stop_condition(&self) -> bool {
        self.model.stop_condition(self)
    }
}

/// Run one agent dispatch under the panic-isolation policy: a hook that
/// unwinds is logged, the agent's interrupted phase is closed out, and the
/// dispatch settles its outstanding barrier obligations either way.
fn run_agent<E: 'static>(
    cell: &Arc<AgentCell<E>>,
    policy: ExecutionPolicy,
    env: &E,
    directory: &AgentDirectory<E>,
    signals: &CycleSignals,
) {
    let outcome =
        panic::catch_unwind(AssertUnwindSafe(|| cell.run_cycle(policy, env, directory, signals)));
    if outcome.is_err() {
        tracing::error!(agent = %cell.id(), "agent hook panicked; isolating the agent for this tick");
        cell.resolve_interrupted_phase();
    }
    signals.settle();
}
