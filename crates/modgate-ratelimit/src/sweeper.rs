// SPDX-License-Identifier: MIT OR Apache-2.0
//! Periodic bucket housekeeping.

use crate::limiter::AdmissionLimiter;
use modgate_core::duration_ms;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use thiserror::Error;
use tracing::{debug, info};

/// Default time between sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// Reasons a sweeper cannot be started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SweeperError {
    /// The sweep interval was zero.
    #[error("sweep interval must be greater than 0")]
    ZeroInterval,
}

/// Handle to a running sweeper task. Dropping it aborts the task.
#[derive(Debug)]
pub struct SweeperHandle {
    task: Option<JoinHandle<()>>,
    stop: Option<oneshot::Sender<()>>,
}

impl SweeperHandle {
    /// Stop the sweeper and wait for it to exit.
    pub async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    /// Abort the task without waiting.
    pub fn abort(&self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }

    /// Whether the task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.abort();
    }
}

/// Spawn a task on the current tokio runtime that calls
/// [`AdmissionLimiter::sweep`] every `every`, starting one period from now.
///
/// # Errors
///
/// [`SweeperError::ZeroInterval`] if `every` is zero; no task is spawned.
///
/// # Panics
///
/// Panics if called outside a tokio runtime.
pub fn spawn_sweeper(
    limiter: Arc<AdmissionLimiter>,
    every: Duration,
) -> Result<SweeperHandle, SweeperError> {
    if every.is_zero() {
        return Err(SweeperError::ZeroInterval);
    }
    let (stop_tx, mut stop_rx) = oneshot::channel();
    let task = tokio::spawn(async move {
        info!(target: "modgate.sweeper", interval_ms = duration_ms(every), "bucket sweeper started");
        let mut tick = interval(every);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tick.tick().await;
        loop {
            tokio::select! {
                _ = tick.tick() => {
                    let removed = limiter.sweep();
                    debug!(
                        target: "modgate.sweeper",
                        removed,
                        remaining = limiter.bucket_count(),
                        "swept rate-limit buckets"
                    );
                }
                _ = &mut stop_rx => break,
            }
        }
        info!(target: "modgate.sweeper", "bucket sweeper stopped");
    });
    Ok(SweeperHandle {
        task: Some(task),
        stop: Some(stop_tx),
    })
}
