//! The agent phase machine and the cycle execution policies.

use std::fmt;

// ── AgentPhase ────────────────────────────────────────────────────────────────

/// Lifecycle phase of an agent.
///
/// `Initialization` is the sole entry state.  From there the machine cycles
/// `Perception → PerceptionDone → DecisionAction → DecisionActionDone →
/// Perception → …` forever; there is no terminal state.  An agent that wants
/// to stop participating must be removed from its system by application
/// logic.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AgentPhase {
    /// Created but not yet cycled.
    #[default]
    Initialization,
    /// Reading neighbors' published criticalities.
    Perception,
    /// Ready to decide.
    PerceptionDone,
    /// Deciding and acting.
    DecisionAction,
    /// Ready to perceive again.
    DecisionActionDone,
}

impl AgentPhase {
    /// The phase that follows `self` in the cycle.
    #[inline]
    pub fn next(self) -> AgentPhase {
        match self {
            AgentPhase::Perception => AgentPhase::PerceptionDone,
            AgentPhase::PerceptionDone => AgentPhase::DecisionAction,
            AgentPhase::DecisionAction => AgentPhase::DecisionActionDone,
            AgentPhase::Initialization | AgentPhase::DecisionActionDone => AgentPhase::Perception,
        }
    }
}

impl fmt::Display for AgentPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AgentPhase::Initialization => "initialization",
            AgentPhase::Perception => "perception",
            AgentPhase::PerceptionDone => "perception-done",
            AgentPhase::DecisionAction => "decision-action",
            AgentPhase::DecisionActionDone => "decision-action-done",
        };
        f.write_str(name)
    }
}

// ── ExecutionPolicy ───────────────────────────────────────────────────────────

/// How the orchestrator drives synchronous agents through one tick.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExecutionPolicy {
    /// Each agent runs perception immediately followed by decision/action;
    /// only the end-of-tick join is synchronized across agents.
    #[default]
    OnePhase,
    /// All agents finish perception before any agent begins decision/action —
    /// a strict super-step (bulk-synchronous) tick.
    TwoPhases,
}
