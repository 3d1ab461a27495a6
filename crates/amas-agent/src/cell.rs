//! `AgentCell` — the engine-owned record of one agent.

use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use amas_core::sync::relock;
use amas_core::{AgentId, AgentPhase, AgentRng, ExecutionPolicy};
use rustc_hash::FxHashMap;

use crate::behavior::{AgentBehavior, AgentCtx, seed_neighbors};
use crate::directory::AgentDirectory;
use crate::signal::SignalSink;

/// Whether an agent is lock-stepped by the tick barrier or free-running.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum AgentMode {
    /// Runs inside the per-tick phase barrier.
    #[default]
    Synchronous,
    /// Cycles on its own thread at the scheduler's pace, outside any
    /// barrier.  Races with synchronous agents are accepted and confined to
    /// the locked snapshot maps and atomic criticality cells.
    Asynchronous,
}

/// State touched only by the single worker currently running the agent.
struct AgentState<E> {
    phase: AgentPhase,
    rng: AgentRng,
    /// Neighborhood ids, self always included (establishes self-candidacy
    /// in local comparisons).
    neighborhood: Vec<AgentId>,
    behavior: Box<dyn AgentBehavior<E>>,
}

/// One agent as the engine sees it: identity, published comparison state,
/// locked private state, and the locked criticality snapshot.
pub struct AgentCell<E> {
    id: AgentId,
    mode: AgentMode,
    /// f64 bits of the criticality last published by decision/action; read
    /// lock-free by neighbors' perception.
    criticality: AtomicU64,
    execution_order: AtomicI64,
    state: Mutex<AgentState<E>>,
    /// Last-known criticality per neighborhood member.  Own lock, separate
    /// from the phase barrier: free-running agents touch it at any time.
    snapshot: Mutex<FxHashMap<AgentId, f64>>,
}

impl<E: 'static> AgentCell<E> {
    pub fn new(
        id: AgentId,
        mode: AgentMode,
        rng: AgentRng,
        behavior: Box<dyn AgentBehavior<E>>,
    ) -> AgentCell<E> {
        AgentCell {
            id,
            mode,
            criticality: AtomicU64::new(f64::NEG_INFINITY.to_bits()),
            execution_order: AtomicI64::new(0),
            state: Mutex::new(AgentState {
                phase: AgentPhase::Initialization,
                rng,
                neighborhood: vec![id],
                behavior,
            }),
            snapshot: Mutex::new(FxHashMap::default()),
        }
    }

    // ── Published state ───────────────────────────────────────────────────

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn mode(&self) -> AgentMode {
        self.mode
    }

    pub fn is_synchronous(&self) -> bool {
        self.mode == AgentMode::Synchronous
    }

    /// The criticality as last published by this agent.
    pub fn criticality(&self) -> f64 {
        f64::from_bits(self.criticality.load(Ordering::SeqCst))
    }

    /// Scheduling priority for the current tick (layer + jitter).
    pub fn execution_order(&self) -> i64 {
        self.execution_order.load(Ordering::SeqCst)
    }

    /// The agent's current lifecycle phase.
    pub fn phase(&self) -> AgentPhase {
        relock(&self.state).phase
    }

    /// A copy of the criticality snapshot (neighbor id, last-seen value).
    pub fn snapshot(&self) -> Vec<(AgentId, f64)> {
        relock(&self.snapshot).iter().map(|(&id, &c)| (id, c)).collect()
    }

    /// A copy of the neighborhood ids (self always included).
    pub fn neighborhood(&self) -> Vec<AgentId> {
        relock(&self.state).neighborhood.clone()
    }

    // ── Neighborhood ──────────────────────────────────────────────────────

    /// Append neighbors, seeding their snapshot entries with negative
    /// infinity.  Must not race a perception phase touching this agent;
    /// the engine only calls it from setup paths and the agent's own hooks.
    pub fn add_neighbors(&self, ids: &[AgentId]) {
        let mut state = relock(&self.state);
        seed_neighbors(&mut state.neighborhood, &self.snapshot, ids);
    }

    // ── Admission ─────────────────────────────────────────────────────────

    /// Compute and publish the initial criticality and execution order.
    ///
    /// Runs once, after the agent's whole addition batch is in the system
    /// and before any of them cycles.  Also seeds the own snapshot slot so
    /// self-comparison is well-defined from the first perception on.
    pub fn before_ready(&self, env: &E) {
        let mut state = relock(&self.state);
        let (criticality, order) = with_behavior(self.id, env, &self.snapshot, &mut state, |b, ctx| {
            let criticality = b.compute_criticality(ctx);
            let jitter: i64 = ctx.rng.gen_range(0..10_000);
            (criticality, b.execution_order_layer() * 10_000 + jitter)
        });
        self.criticality.store(criticality.to_bits(), Ordering::SeqCst);
        self.execution_order.store(order, Ordering::SeqCst);
        relock(&self.snapshot).insert(self.id, criticality);
    }

    /// Invoke the `on_ready` hook.
    pub fn ready(&self, env: &E) {
        let mut state = relock(&self.state);
        with_behavior(self.id, env, &self.snapshot, &mut state, |b, ctx| b.on_ready(ctx));
    }

    // ── Cycle ─────────────────────────────────────────────────────────────

    /// Run this agent for one dispatch.
    ///
    /// Under `OnePhase` that is a full cycle: perception immediately
    /// followed by decision/action, no wait point between them.  Under
    /// `TwoPhases` the phase machine advances one step, so the orchestrator
    /// dispatches every agent twice per tick — once for perception, once for
    /// decision/action — with a barrier in between.
    pub fn run_cycle(
        &self,
        policy: ExecutionPolicy,
        env: &E,
        directory: &AgentDirectory<E>,
        signals: &dyn SignalSink,
    ) {
        let mut state = relock(&self.state);
        with_behavior(self.id, env, &self.snapshot, &mut state, |b, ctx| {
            b.on_agent_cycle_begin(ctx);
        });

        match policy {
            ExecutionPolicy::OnePhase => {
                self.perception(&mut state, env, directory, signals);
                self.decision_action(&mut state, env, signals);
            }
            ExecutionPolicy::TwoPhases => match state.phase.next() {
                AgentPhase::Perception => self.perception(&mut state, env, directory, signals),
                AgentPhase::DecisionAction => self.decision_action(&mut state, env, signals),
                other => {
                    tracing::error!(agent = %self.id, phase = %other, "agent dispatched in an invalid phase");
                }
            },
        }

        with_behavior(self.id, env, &self.snapshot, &mut state, |b, ctx| {
            b.on_agent_cycle_end(ctx);
        });
    }

    /// Close out a phase that was interrupted mid-flight (a hook unwound).
    ///
    /// Moves `Perception` to `PerceptionDone` and `DecisionAction` to
    /// `DecisionActionDone` so the machine re-enters cleanly next tick; any
    /// other phase is left untouched.
    pub fn resolve_interrupted_phase(&self) {
        let mut state = relock(&self.state);
        state.phase = match state.phase {
            AgentPhase::Perception => AgentPhase::PerceptionDone,
            AgentPhase::DecisionAction => AgentPhase::DecisionActionDone,
            other => other,
        };
    }

    /// Perception: hook, then refresh the snapshot from every neighborhood
    /// member's currently-published criticality.
    fn perception(
        &self,
        state: &mut AgentState<E>,
        env: &E,
        directory: &AgentDirectory<E>,
        signals: &dyn SignalSink,
    ) {
        state.phase = AgentPhase::Perception;
        with_behavior(self.id, env, &self.snapshot, state, |b, ctx| b.on_perceive(ctx));

        {
            let mut snapshot = relock(&self.snapshot);
            for &neighbor in &state.neighborhood {
                // A neighbor no longer in the system keeps its last-seen value.
                if let Some(cell) = directory.get(neighbor) {
                    snapshot.insert(neighbor, cell.criticality());
                }
            }
        }

        state.phase = AgentPhase::PerceptionDone;
        signals.perceived(self.id);
    }

    /// Decision/action: hook, republish criticality and execution order,
    /// refresh the own snapshot slot, expose.
    fn decision_action(&self, state: &mut AgentState<E>, env: &E, signals: &dyn SignalSink) {
        state.phase = AgentPhase::DecisionAction;

        let (criticality, order) = with_behavior(self.id, env, &self.snapshot, state, |b, ctx| {
            b.on_decide_and_act(ctx);
            let criticality = b.compute_criticality(ctx);
            let jitter: i64 = ctx.rng.gen_range(0..10_000);
            (criticality, b.execution_order_layer() * 10_000 + jitter)
        });
        self.criticality.store(criticality.to_bits(), Ordering::SeqCst);
        self.execution_order.store(order, Ordering::SeqCst);
        relock(&self.snapshot).insert(self.id, criticality);

        with_behavior(self.id, env, &self.snapshot, state, |b, ctx| b.on_expose(ctx));

        state.phase = AgentPhase::DecisionActionDone;
        signals.acted(self.id);
    }
}

/// Split-borrow the state guard so a hook and its `AgentCtx` can coexist:
/// the ctx borrows the RNG and neighborhood, the behavior is borrowed
/// separately.
fn with_behavior<E, R>(
    id: AgentId,
    env: &E,
    snapshot: &Mutex<FxHashMap<AgentId, f64>>,
    state: &mut AgentState<E>,
    f: impl FnOnce(&mut dyn AgentBehavior<E>, &mut AgentCtx<'_, E>) -> R,
) -> R {
    let AgentState { rng, neighborhood, behavior, .. } = state;
    let mut ctx = AgentCtx::new(id, env, rng, neighborhood, snapshot);
    f(behavior.as_mut(), &mut ctx)
}
