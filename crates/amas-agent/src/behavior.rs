//! The `AgentBehavior` trait — the main extension point for agent logic —
//! and the `AgentCtx` view its hooks receive.

use std::sync::Mutex;

use amas_core::sync::relock;
use amas_core::{AgentId, AgentRng};
use rustc_hash::FxHashMap;

/// Pluggable agent logic.
///
/// Implement this trait to define what an agent does each cycle.  Only
/// [`compute_criticality`][Self::compute_criticality] is required; every
/// lifecycle hook has a no-op default, so a behavior overrides exactly the
/// points it cares about.  The hooks form the agent's cycle:
///
/// ```text
/// on_cycle_begin
///   on_perceive            (perception phase; snapshot refresh follows)
///   on_decide_and_act      (default: on_decide, then on_act)
///   on_expose              (own criticality already republished)
/// on_cycle_end
/// ```
///
/// # Thread safety
///
/// The orchestrator may run many agents in parallel, but each behavior is
/// only ever invoked by the one worker currently running its agent — hooks
/// take `&mut self` and behaviors need `Send`, not `Sync`.  State shared
/// between agents belongs in the environment `E`, behind its own locks.
///
/// # Example
///
/// ```rust,ignore
/// struct Bidder { pressure: f64 }
///
/// impl AgentBehavior<Market> for Bidder {
///     fn compute_criticality(&mut self, _ctx: &mut AgentCtx<'_, Market>) -> f64 {
///         self.pressure
///     }
///
///     fn on_decide_and_act(&mut self, ctx: &mut AgentCtx<'_, Market>) {
///         if ctx.most_critical_neighbor(true) == Some(ctx.id) {
///             self.pressure = 0.0; // won the local arbitration
///         } else {
///             self.pressure += 1.0;
///         }
///     }
/// }
/// ```
pub trait AgentBehavior<E>: Send + 'static {
    /// The agent's urgency score — the value neighbors compare during local
    /// arbitration.  Recomputed by the engine at the end of every
    /// decision/action phase (and once before the agent becomes ready).
    ///
    /// Ties are legal; wherever a single most-critical pick is required they
    /// are broken by a uniform draw from the asking agent's RNG.
    fn compute_criticality(&mut self, ctx: &mut AgentCtx<'_, E>) -> f64;

    /// Coarse scheduling-priority layer.  The engine combines it with a
    /// random jitter as `layer * 10_000 + uniform(0..10_000)`; the result
    /// only influences dispatch order within a tick, never correctness.
    fn execution_order_layer(&self) -> i64 {
        0
    }

    /// Called once, after every agent of the same addition batch has been
    /// admitted to the system.
    fn on_ready(&mut self, _ctx: &mut AgentCtx<'_, E>) {}

    /// Called at the start of each `cycle` invocation.
    fn on_agent_cycle_begin(&mut self, _ctx: &mut AgentCtx<'_, E>) {}

    /// Called at the start of the perception phase, before the engine
    /// refreshes the neighbor-criticality snapshot.
    fn on_perceive(&mut self, _ctx: &mut AgentCtx<'_, E>) {}

    /// First half of the default [`on_decide_and_act`][Self::on_decide_and_act].
    fn on_decide(&mut self, _ctx: &mut AgentCtx<'_, E>) {}

    /// Second half of the default [`on_decide_and_act`][Self::on_decide_and_act].
    fn on_act(&mut self, _ctx: &mut AgentCtx<'_, E>) {}

    /// The decision/action phase.  Decision and action can often be grouped;
    /// override this for the combined form, or override
    /// [`on_decide`][Self::on_decide] / [`on_act`][Self::on_act] separately.
    fn on_decide_and_act(&mut self, ctx: &mut AgentCtx<'_, E>) {
        self.on_decide(ctx);
        self.on_act(ctx);
    }

    /// Called at the end of the decision/action phase, after the agent's
    /// fresh criticality has been published.  The place to export public
    /// state to the environment.
    fn on_expose(&mut self, _ctx: &mut AgentCtx<'_, E>) {}

    /// Called at the end of each `cycle` invocation.
    fn on_agent_cycle_end(&mut self, _ctx: &mut AgentCtx<'_, E>) {}
}

// ── AgentCtx ──────────────────────────────────────────────────────────────────

/// The view of an agent handed to its behavior hooks.
///
/// Borrows the agent's own mutable state (RNG, neighborhood) and its locked
/// criticality snapshot for the duration of one phase; the environment is a
/// shared reference, so anything mutable in it must carry its own locks.
pub struct AgentCtx<'a, E> {
    /// Identity of the agent being run.
    pub id: AgentId,
    /// The shared environment.
    pub env: &'a E,
    /// The agent's own deterministic random stream.
    pub rng: &'a mut AgentRng,
    neighborhood: &'a mut Vec<AgentId>,
    snapshot: &'a Mutex<FxHashMap<AgentId, f64>>,
}

impl<'a, E> AgentCtx<'a, E> {
    pub(crate) fn new(
        id: AgentId,
        env: &'a E,
        rng: &'a mut AgentRng,
        neighborhood: &'a mut Vec<AgentId>,
        snapshot: &'a Mutex<FxHashMap<AgentId, f64>>,
    ) -> Self {
        Self { id, env, rng, neighborhood, snapshot }
    }

    /// Append agents to the neighborhood.
    ///
    /// Each new neighbor's last-known criticality starts at negative
    /// infinity — unknown, lowest priority until first observed.
    /// `AgentId::INVALID` entries are silently ignored.
    pub fn add_neighbors(&mut self, ids: &[AgentId]) {
        seed_neighbors(self.neighborhood, self.snapshot, ids);
    }

    /// The current neighborhood (always contains the agent itself).
    pub fn neighborhood(&self) -> &[AgentId] {
        self.neighborhood
    }

    /// The last criticality observed for `id`, if `id` is a known neighbor.
    pub fn neighbor_criticality(&self, id: AgentId) -> Option<f64> {
        relock(self.snapshot).get(&id).copied()
    }

    /// The neighbor whose snapshot criticality is highest, ties broken by a
    /// uniform draw from this agent's RNG.
    ///
    /// Reads the snapshot map exclusively — values observed during this
    /// agent's last perception (plus its own freshly republished slot) — so
    /// repeated calls within one phase agree with each other.  With
    /// `including_self` the agent's own entry competes like any neighbor's;
    /// without it the own entry is skipped.  Returns `None` only when no
    /// candidate entry exists.
    pub fn most_critical_neighbor(&mut self, including_self: bool) -> Option<AgentId> {
        let mut best = f64::NEG_INFINITY;
        let mut tied: Vec<AgentId> = Vec::new();
        {
            let snapshot = relock(self.snapshot);
            for (&id, &criticality) in snapshot.iter() {
                if !including_self && id == self.id {
                    continue;
                }
                if criticality > best {
                    best = criticality;
                    tied.clear();
                    tied.push(id);
                } else if criticality == best {
                    tied.push(id);
                }
            }
        }
        self.rng.choose(&tied).copied()
    }
}

/// Shared neighborhood-extension logic for `AgentCtx` and `AgentCell`.
pub(crate) fn seed_neighbors(
    neighborhood: &mut Vec<AgentId>,
    snapshot: &Mutex<FxHashMap<AgentId, f64>>,
    ids: &[AgentId],
) {
    for &id in ids {
        if id == AgentId::INVALID {
            continue;
        }
        neighborhood.push(id);
        relock(snapshot).entry(id).or_insert(f64::NEG_INFINITY);
    }
}
