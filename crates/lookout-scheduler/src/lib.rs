//! Lookout Scheduler - periodic, non-overlapping scan triggers.
//!
//! [`RunScheduler`] wraps a [`RunGuard`] so that a scan started by the
//! interval loop and one started by hand can never run at the same time.

#![warn(clippy::all)]

pub mod guard;
pub mod scheduler;

pub use guard::{RunGuard, RunPermit};
pub use scheduler::{next_run_at, RunScheduler, ScheduleStats, TriggerOutcome};
pub use tokio_util::sync::CancellationToken;
