//! `amas-sched` — cycle-driven scheduling for the amas engine.
//!
//! # Crate layout
//!
//! | Module          | Contents                                              |
//! |-----------------|-------------------------------------------------------|
//! | [`schedulable`] | `Schedulable` — the capability every cycle-driven     |
//! |                 | entity implements                                     |
//! | [`scheduler`]   | `Scheduler` — owns a set of schedulables and drives   |
//! |                 | them on a dedicated loop thread                       |
//!
//! # Design notes
//!
//! A `Scheduler` never executes a partial tick: membership changes are
//! staged on pending queues and materialized only between runs or at loop
//! boundaries, and `stop()` is cooperative — the loop observes it at the
//! next tick boundary.  The soft-lock counter lets a container finish
//! constructing and registering its children before anything can trigger
//! execution.

pub mod schedulable;
pub mod scheduler;


pub use schedulable::{DEFAULT_SLEEP_MS, Schedulable};
pub use scheduler::{Scheduler, SchedulerEvent};
