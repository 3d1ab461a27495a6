//! The per-agent lifecycle signal seam.

use amas_core::AgentId;

/// Receiver of the two observable per-agent lifecycle signals.
///
/// The orchestrator implements this with a counting-barrier release plus a
/// listener fan-out; free-running agents get a listener-only sink.  The
/// signals carry nothing beyond the identity of the source.
pub trait SignalSink: Send + Sync {
    /// The agent finished its perception phase.
    fn perceived(&self, agent: AgentId);

    /// The agent finished its decision/action phase.
    fn acted(&self, agent: AgentId);
}

/// A [`SignalSink`] that ignores both signals.
pub struct NoopSignals;

impl SignalSink for NoopSignals {
    fn perceived(&self, _agent: AgentId) {}
    fn acted(&self, _agent: AgentId) {}
}
