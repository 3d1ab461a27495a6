//! The `AmasModel` trait — the application's side of the orchestrator.

use amas_core::ExecutionPolicy;

use crate::amas::Amas;
use crate::environment::Environment;

/// Application hooks around the engine's tick structure.
///
/// All hooks take `&self` plus the owning [`Amas`]; population edits go
/// through the Amas's staged queues, which accept a shared reference, so a
/// stateless model needs no locks of its own.  A model that carries mutable
/// state guards it itself (atomics or a mutex), exactly like agent-shared
/// state in the environment.
///
/// # Construction order
///
/// `Amas::new` runs, in order and with the scheduler soft-locked:
/// `on_initial_configuration` → `on_initial_agents_creation` (call
/// [`Amas::add_agent`] here for every initial agent) → admission of the
/// staged agents → `on_ready`.
pub trait AmasModel<E: Environment>: Send + Sync + Sized + 'static {
    /// The execution policy for synchronous agents.  Consulted every tick.
    fn execution_policy(&self) -> ExecutionPolicy {
        ExecutionPolicy::OnePhase
    }

    /// Whether the scheduler must stop after the current tick.
    ///
    /// The system never stops itself; the default is "run forever".
    fn stop_condition(&self, _amas: &Amas<E, Self>) -> bool {
        false
    }

    /// First construction hook, before any agent exists.
    fn on_initial_configuration(&self, _amas: &Amas<E, Self>) {}

    /// Populate the system.  Runs before any agent is admitted.
    fn on_initial_agents_creation(&self, _amas: &Amas<E, Self>) {}

    /// All initial agents are admitted and ready.
    fn on_ready(&self, _amas: &Amas<E, Self>) {}

    /// Start of a tick, after the synchronous set for this tick is fixed.
    fn on_cycle_begin(&self, _amas: &Amas<E, Self>) {}

    /// End of a tick, after population edits have been applied.  The place
    /// to read the agent list for reporting: the set is stable here.
    fn on_cycle_end(&self, _amas: &Amas<E, Self>) {}
}
