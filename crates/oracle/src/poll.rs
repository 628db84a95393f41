//! Async Poll Coordinator.
//!
//! Drives one analysis handle through `PENDING -> {RESOLVED | TIMED_OUT | FAILED}`
//! on a worker task that owns its own timer. Each attempt waits `interval`
//! first, then re-queries; at most `max_attempts` queries are ever issued.
//!
//! Cancellation is a oneshot channel checked before every attempt and raced
//! against the in-flight query, so a cancelled task never fires another
//! attempt and drops any response that arrives afterwards. Dropping the
//! [`PollTask`] cancels it as well.

use crate::gateway::PollStatus;
use async_trait::async_trait;
use common::{AnalysisHandle, Verdict};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Anything that can answer "is this analysis done yet?".
#[async_trait]
pub trait AnalysisSource: Send + Sync {
    async fn poll(&self, handle: &AnalysisHandle) -> PollStatus;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: 20,
        }
    }
}

/// Terminal state of a poll sequence.
#[derive(Debug, Clone)]
pub enum PollOutcome {
    Resolved(Verdict),
    /// The attempt ceiling was reached without a completed analysis.
    TimedOut { attempts: u32 },
    /// The oracle reported an error for this handle.
    Failed(String),
    Cancelled,
}

#[derive(Clone)]
pub struct PollCoordinator {
    source: Arc<dyn AnalysisSource>,
    config: PollConfig,
}

impl PollCoordinator {
    pub fn new(source: Arc<dyn AnalysisSource>, config: PollConfig) -> Self {
        Self { source, config }
    }

    /// Starts polling `handle` on a new task.
    pub fn spawn(&self, handle: AnalysisHandle) -> PollTask {
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let join = tokio::spawn(run(
            Arc::clone(&self.source),
            handle.clone(),
            self.config,
            cancel_rx,
        ));
        PollTask {
            handle,
            cancel: Some(cancel_tx),
            join,
        }
    }
}

/// A running poll sequence.
pub struct PollTask {
    handle: AnalysisHandle,
    cancel: Option<oneshot::Sender<()>>,
    join: JoinHandle<PollOutcome>,
}

impl PollTask {
    pub fn handle(&self) -> &AnalysisHandle {
        &self.handle
    }

    /// Stops polling. No further attempt fires; an in-flight response is discarded.
    pub fn cancel(&mut self) {
        if let Some(tx) = self.cancel.take() {
            let _ = tx.send(());
        }
    }

    /// Waits for the terminal state.
    pub async fn outcome(self) -> PollOutcome {
        // Hold the sender while waiting; dropping it would read as a cancel.
        let PollTask { cancel, join, handle } = self;
        let outcome = join.await;
        drop(cancel);
        match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(analysis = %handle, error = %e, "poll task aborted");
                PollOutcome::Failed(format!("poll task aborted: {e}"))
            }
        }
    }
}

async fn run(
    source: Arc<dyn AnalysisSource>,
    handle: AnalysisHandle,
    config: PollConfig,
    mut cancel: oneshot::Receiver<()>,
) -> PollOutcome {
    for attempt in 1..=config.max_attempts {
        tokio::select! {
            biased;
            _ = &mut cancel => return PollOutcome::Cancelled,
            _ = tokio::time::sleep(config.interval) => {}
        }

        let status = tokio::select! {
            biased;
            _ = &mut cancel => return PollOutcome::Cancelled,
            status = source.poll(&handle) => status,
        };

        match status {
            PollStatus::Pending => {
                tracing::debug!(analysis = %handle, attempt, "analysis still pending");
            }
            PollStatus::Resolved(verdict) => {
                tracing::info!(analysis = %handle, attempt, "analysis completed");
                return PollOutcome::Resolved(verdict);
            }
            PollStatus::Failed(reason) => {
                tracing::warn!(analysis = %handle, attempt, %reason, "analysis poll failed");
                return PollOutcome::Failed(reason);
            }
        }
    }

    tracing::warn!(analysis = %handle, attempts = config.max_attempts, "analysis poll timed out");
    PollOutcome::TimedOut {
        attempts: config.max_attempts,
    }
}
