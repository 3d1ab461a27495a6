//! `amas-agent` — agent lifecycle and the criticality-voting protocol.
//!
//! # Crate layout
//!
//! | Module        | Contents                                                |
//! |---------------|---------------------------------------------------------|
//! | [`behavior`]  | `AgentBehavior<E>` hook trait, `AgentCtx<'_, E>` view   |
//! | [`cell`]      | `AgentCell<E>` — the engine-owned agent record          |
//! | [`directory`] | `AgentDirectory<E>` — id → cell arena index             |
//! | [`signal`]    | `SignalSink` — the per-agent lifecycle signal seam      |
//!
//! # Design notes
//!
//! An agent never owns its neighbors.  The neighborhood is a list of
//! [`AgentId`][amas_core::AgentId]s resolved through the system's
//! [`AgentDirectory`] at perception time, so ring and graph topologies are
//! plain id cycles with no lifetime entanglement.
//!
//! Concurrency contract of one [`AgentCell`]:
//!
//! - `criticality` and `execution_order` are atomics — published by the
//!   owner at the end of decision/action, read lock-free by any neighbor's
//!   perception.
//! - the phase, RNG, neighborhood, and behavior live behind the state lock,
//!   touched only by the single worker currently running the agent.
//! - the criticality snapshot map has its own lock, independent of any
//!   phase barrier, because free-running agents read and write it outside
//!   barrier ordering.

pub mod behavior;
pub mod cell;
pub mod directory;
pub mod signal;

#[cfg(test)]
mod tests;

pub use behavior::{AgentBehavior, AgentCtx};
pub use cell::{AgentCell, AgentMode};
pub use directory::AgentDirectory;
pub use signal::{NoopSignals, SignalSink};
