//! `amas-engine` — tick orchestration for adaptive multi-agent systems.
//!
//! # One tick
//!
//! ```text
//! Scheduler loop ─► Amas::cycle
//!   ① counter    — increment the cycle count
//!   ② collect    — snapshot the synchronous agents, sort by execution order
//!   ③ hook       — model.on_cycle_begin
//!   ④ barrier    — OnePhase:  dispatch full cycles; wait(perceived); wait(acted)
//!                  TwoPhases: dispatch perceptions; wait(perceived);
//!                             dispatch decisions;   wait(acted)
//!   ⑤ population — apply staged removals, then staged additions
//!   ⑥ hook       — model.on_cycle_end
//! ```
//!
//! Under `TwoPhases` no agent begins decision/action before every
//! synchronous agent has finished perception — a strict super-step, so each
//! perception reads neighbor criticalities exactly as published at the end
//! of the previous tick.  Under `OnePhase` only the end-of-tick join is
//! guaranteed.  Free-running (asynchronous) agents cycle on their own
//! threads outside any barrier; their races are confined to the locked
//! snapshot maps and atomic criticality cells.
//!
//! # Crate layout
//!
//! | Module          | Contents                                            |
//! |-----------------|-----------------------------------------------------|
//! | [`amas`]        | `Amas` orchestrator, `AgentSignal`                  |
//! | [`model`]       | `AmasModel` — the application collaborator trait    |
//! | [`environment`] | `Environment` contract, `ScheduledEnvironment`      |
//! | [`latch`]       | `PhaseLatch` counting barrier                       |
//! | [`config`]      | `EngineConfig`, `Parallelism`                       |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! let amas = Amas::new(Table::new(8), PhiloTable { policy, .. }, EngineConfig::default());
//! amas.scheduler().start_with(100);
//! ```

pub mod amas;
pub mod config;
pub mod environment;
pub mod latch;
pub mod model;


pub use amas::{AgentSignal, Amas};
pub use config::{EngineConfig, Parallelism};
pub use environment::{Environment, ScheduledEnvironment};
pub use latch::PhaseLatch;
pub use model::AmasModel;
