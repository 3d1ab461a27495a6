//! The agent identifier type.
//!
//! Agent identities are assigned sequentially by the owning multi-agent
//! system, are unique within it, and stay stable for the agent's lifetime.
//! Neighbor relationships are stored as `AgentId`s and resolved through the
//! system's directory, never as owning references — a ring neighborhood is
//! just a cycle of ids.

use std::fmt;

/// Identity of an agent within its multi-agent system.
///
/// `Copy + Ord + Hash` so it can be used as a map key and sorted without
/// ceremony.  The inner integer is `pub` for direct indexing; callers should
/// prefer [`AgentId::index`] for clarity.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AgentId(pub u32);

impl AgentId {
    /// Sentinel meaning "no valid agent" — equivalent to `u32::MAX`.
    ///
    /// Passing it to a neighborhood operation is silently ignored, the
    /// engine's configuration-error policy.
    pub const INVALID: AgentId = AgentId(u32::MAX);

    /// Cast to `usize` for direct use as a `Vec` index.
    #[inline(always)]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl Default for AgentId {
    /// Returns the `INVALID` sentinel so uninitialized ids are visibly invalid.
    #[inline(always)]
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agent#{}", self.0)
    }
}

impl From<AgentId> for usize {
    #[inline(always)]
    fn from(id: AgentId) -> usize {
        id.0 as usize
    }
}
