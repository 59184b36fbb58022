//! Periodic background tasks: inactivity reaping, cache sweeps, event flushes.
//!
//! Each task exposes a synchronous [`PeriodicTask::run_once`] so tests can
//! trigger a single pass directly; [`spawn_periodic`] drives it on a tokio
//! interval until cancelled.

use derive_more::{Display, Error};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Failure of a single task pass. Logged by the scheduler, never propagated.
#[derive(Debug, Clone, Display, Error)]
#[display("{task} failed: {message}")]
pub struct TaskError {
    /// Task name.
    pub task: &'static str,
    /// What went wrong.
    pub message: String,
}

impl TaskError {
    /// Creates a task error.
    pub fn new(task: &'static str, message: impl Into<String>) -> Self {
        Self {
            task,
            message: message.into(),
        }
    }
}

/// A unit of background work run on a fixed interval.
pub trait PeriodicTask: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Performs one pass, returning how many items it handled.
    fn run_once(&self) -> Result<usize, TaskError>;
}

/// Runs `task` every `every` until `cancel` fires.
///
/// The first pass happens one full interval after spawning. Failed passes are
/// logged and skipped; the loop keeps going.
pub fn spawn_periodic(
    task: Arc<dyn PeriodicTask>,
    every: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let name = task.name();
        info!(task = name, interval_ms = every.as_millis() as u64, "Starting periodic task");

        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // interval() fires immediately; consume that tick.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    match task.run_once() {
                        Ok(0) => {}
                        Ok(handled) => debug!(task = name, handled, "Periodic task pass complete"),
                        Err(e) => warn!(task = name, error = %e, "Periodic task pass failed, skipping"),
                    }
                }
            }
        }

        info!(task = name, "Periodic task stopped");
    })
}
