//! The shared-world contract.

use std::sync::Arc;

use amas_core::SimRng;
use amas_sched::Schedulable;

/// The shared world an [`Amas`][crate::Amas] owns and all of its agents read.
///
/// The two initialization hooks run with exclusive ownership — before the
/// environment is shared with any agent — so they can freely build plain
/// fields.  Everything agents mutate afterwards (contested resources,
/// published reports) must sit behind the environment's own locks, because
/// hooks receive it as `&E` from many workers at once.
pub trait Environment: Send + Sync + 'static {
    /// One-time setup of the world itself.
    fn on_initialization(&mut self, _rng: &mut SimRng) {}

    /// One-time creation of non-agent entities (resources, places, …).
    fn on_initial_entities_creation(&mut self, _rng: &mut SimRng) {}

    /// One scheduled cycle of the environment.  Most environments are
    /// passive and leave this empty; the owning system drives agents, not
    /// the world.
    fn on_cycle(&self) {}
}

/// `Schedulable` adapter for an environment.
///
/// Its stop condition is always true: putting the environment on a
/// [`Scheduler`][amas_sched::Scheduler] drives exactly one cycle — one-time
/// initialization semantics, not an iterated loop.
pub struct ScheduledEnvironment<E: Environment> {
    env: Arc<E>,
}

impl<E: Environment> ScheduledEnvironment<E> {
    pub fn new(env: Arc<E>) -> ScheduledEnvironment<E> {
        ScheduledEnvironment { env }
    }

    pub fn env(&self) -> &Arc<E> {
        &self.env
    }
}

impl<E: Environment> Schedulable for ScheduledEnvironment<E> {
    fn cycle(&self) {
        self.env.on_cycle();
    }

    fn stop_condition(&self) -> bool {
        true
    }
}
