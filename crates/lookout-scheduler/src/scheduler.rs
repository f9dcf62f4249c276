//! Periodic scan trigger with overlap protection.
//!
//! Every trigger, manual or from the interval loop, goes through the same
//! [`RunGuard`]. A trigger that finds a run in flight is skipped, never
//! queued.

use crate::guard::RunGuard;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// What happened to one trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome<T> {
    /// The run executed and produced a value
    Completed(T),
    /// Another run held the guard
    Skipped,
}

impl<T> TriggerOutcome<T> {
    /// Whether the trigger was rejected.
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }
}

/// Counters reported when [`RunScheduler::run_every`] returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleStats {
    /// Ticks that started a run
    pub runs_started: usize,
    /// Ticks rejected because a run was still in flight
    pub runs_skipped: usize,
}

/// Serialises scan runs behind one guard.
#[derive(Debug, Clone, Default)]
pub struct RunScheduler {
    guard: RunGuard,
}

impl RunScheduler {
    /// Create a scheduler with a fresh guard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a run currently holds the guard.
    pub fn is_running(&self) -> bool {
        self.guard.is_running()
    }

    /// Run `job` now unless another run is in flight.
    pub async fn trigger<F, T>(&self, job: F) -> TriggerOutcome<T>
    where
        F: Future<Output = T>,
    {
        let Some(_permit) = self.guard.try_acquire() else {
            info!("Scan already in progress, skipping trigger");
            return TriggerOutcome::Skipped;
        };

        TriggerOutcome::Completed(job.await)
    }

    /// Start a run from `make_job` every `period` until `cancel` fires.
    ///
    /// Each run is spawned so the ticker keeps going while it executes;
    /// ticks landing during a run are skipped. The first tick fires
    /// immediately when `run_on_start` is set, otherwise one `period` later.
    /// Cancelling also cancels the run in flight, which is awaited before
    /// this returns.
    pub async fn run_every<F, Fut>(
        &self,
        period: Duration,
        run_on_start: bool,
        cancel: CancellationToken,
        mut make_job: F,
    ) -> ScheduleStats
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        if !run_on_start {
            // An interval's first tick completes immediately.
            ticker.tick().await;
        }

        info!(
            interval_secs = period.as_secs(),
            run_on_start,
            "Scheduler started"
        );

        let mut stats = ScheduleStats::default();
        let mut in_flight: Option<JoinHandle<()>> = None;

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let Some(permit) = self.guard.try_acquire() else {
                        stats.runs_skipped += 1;
                        warn!("Previous scan still running, skipping scheduled trigger");
                        continue;
                    };

                    stats.runs_started += 1;
                    let job = make_job();
                    let run_cancel = cancel.child_token();
                    in_flight = Some(tokio::spawn(async move {
                        let _permit = permit;
                        tokio::select! {
                            () = run_cancel.cancelled() => warn!("Scan cancelled before completion"),
                            () = job => {}
                        }
                    }));

                    debug!(next_run_at = %next_run_at(period), "Scheduled scan started");
                }
            }
        }

        if let Some(handle) = in_flight {
            if let Err(e) = handle.await {
                error!(error = %e, "Scheduled scan task failed");
            }
        }

        info!(
            runs_started = stats.runs_started,
            runs_skipped = stats.runs_skipped,
            "Scheduler stopped"
        );
        stats
    }
}

/// Wall-clock time of the tick after one `period` from now.
pub fn next_run_at(period: Duration) -> DateTime<Utc> {
    let step = chrono::Duration::from_std(period).unwrap_or(chrono::Duration::MAX);
    Utc::now()
        .checked_add_signed(step)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
