//! A counting barrier joining one tick's agents back to the orchestrator.

use std::sync::{Condvar, Mutex, PoisonError};

use amas_core::sync::relock;

/// Counting barrier sized to the number of agents participating in a phase.
///
/// Each agent releases the latch exactly once per phase; the orchestrator
/// blocks in [`wait`][Self::wait] until the count reaches zero.  A surplus
/// release is a concurrency-protocol violation: it is logged and swallowed,
/// never fatal.
///
/// There is deliberately no timeout.  An agent that never signals blocks the
/// tick forever; that is a phase-routine bug to fix, not a transient
/// condition to retry.
pub struct PhaseLatch {
    remaining: Mutex<usize>,
    zero: Condvar,
}

impl PhaseLatch {
    pub fn new(count: usize) -> PhaseLatch {
        PhaseLatch { remaining: Mutex::new(count), zero: Condvar::new() }
    }

    /// Count down one completion.
    pub fn release(&self) {
        let mut remaining = relock(&self.remaining);
        if *remaining == 0 {
            tracing::warn!("surplus release on an exhausted phase latch");
            return;
        }
        *remaining -= 1;
        if *remaining == 0 {
            self.zero.notify_all();
        }
    }

    /// Block until every participant has released.
    pub fn wait(&self) {
        let mut remaining = relock(&self.remaining);
        while *remaining > 0 {
            remaining = self
                .zero
                .wait(remaining)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}
