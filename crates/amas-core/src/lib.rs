//! `amas-core` — foundational types for the amas adaptive multi-agent engine.
//!
//! This crate is a dependency of every other `amas-*` crate.  It has no
//! `amas-*` dependencies and minimal external ones (only `rand` and
//! `thiserror`, plus optional `serde`).
//!
//! # What lives here
//!
//! | Module    | Contents                                            |
//! |-----------|-----------------------------------------------------|
//! | [`ids`]   | `AgentId`                                           |
//! | [`phase`] | `AgentPhase`, `ExecutionPolicy`                     |
//! | [`rng`]   | `AgentRng` (per-agent), `SimRng` (simulation-level) |
//! | [`error`] | `AmasError`, `AmasResult`                           |
//! | [`sync`]  | poison-recovering lock helpers                      |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                  |
//! |---------|---------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to ids, phases, policies.|

pub mod error;
pub mod ids;
pub mod phase;
pub mod rng;
pub mod sync;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{AmasError, AmasResult};
pub use ids::AgentId;
pub use phase::{AgentPhase, ExecutionPolicy};
pub use rng::{AgentRng, SimRng};
