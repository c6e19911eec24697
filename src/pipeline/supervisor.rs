//! Deadline enforcement for pipeline stages.
//!
//! Each externally bounded stage (render, rasterize, compress, body read) is
//! raced against its own timer. When the timer wins the caller gets `None`
//! immediately.
//!
//! # Cancellation
//!
//! Under [`CancelPolicy::Detach`] the stage runs as its own task and is left
//! running when the deadline passes: it may still finish later and write its
//! artifact to the store, so a later request can find an entry that
//! materialized after an earlier request gave up on it.
//!
//! Under [`CancelPolicy::Abort`] the stage future is dropped at the deadline.
//! Nothing it had not yet written reaches the store, and child processes
//! spawned with `kill_on_drop` are killed. Work already handed to the
//! blocking pool still runs to completion, but its result is discarded.

use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

use tokio::task::JoinError;
use tokio::time;
use tracing::{debug, error, warn};

use crate::encoding::Encoding;

/// Default stage deadline (5 seconds).
pub const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_millis(5000);

/// A bounded unit of work, named for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Render,
    Rasterize,
    Compress(Encoding),
    ReadBody,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Render => f.write_str("render"),
            Stage::Rasterize => f.write_str("rasterize"),
            Stage::Compress(encoding) => write!(f, "compress-{}", encoding),
            Stage::ReadBody => f.write_str("read-body"),
        }
    }
}

/// What happens to a stage that misses its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CancelPolicy {
    /// Keep running in the background; late results may still be cached
    #[default]
    Detach,

    /// Drop the stage future; late effects are discarded
    Abort,
}

enum Outcome<T, E> {
    Finished(Result<T, E>),
    Crashed(JoinError),
    TimedOut,
}

/// Races stages against a per-stage deadline.
///
/// Failures and timeouts are logged here and both collapse to `None`;
/// callers cannot tell them apart.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutSupervisor {
    deadline: Duration,
    policy: CancelPolicy,
}

impl TimeoutSupervisor {
    /// Create a supervisor with advisory (detaching) cancellation.
    pub fn new(deadline: Duration) -> Self {
        Self {
            deadline,
            policy: CancelPolicy::Detach,
        }
    }

    /// Set the cancellation policy.
    pub fn with_policy(mut self, policy: CancelPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    pub fn policy(&self) -> CancelPolicy {
        self.policy
    }

    /// Run `operation` under the stage deadline.
    ///
    /// Returns `Some` only when the operation completed successfully in time.
    pub async fn run<T, E, F>(&self, stage: Stage, operation: F) -> Option<T>
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let started = Instant::now();

        let outcome = match self.policy {
            CancelPolicy::Detach => {
                // Dropping the JoinHandle on timeout detaches the task
                let handle = tokio::spawn(operation);
                match time::timeout(self.deadline, handle).await {
                    Ok(Ok(result)) => Outcome::Finished(result),
                    Ok(Err(join_error)) => Outcome::Crashed(join_error),
                    Err(_) => Outcome::TimedOut,
                }
            }
            CancelPolicy::Abort => match time::timeout(self.deadline, operation).await {
                Ok(result) => Outcome::Finished(result),
                Err(_) => Outcome::TimedOut,
            },
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match outcome {
            Outcome::Finished(Ok(value)) => {
                debug!(stage = %stage, elapsed_ms, "Stage completed");
                Some(value)
            }
            Outcome::Finished(Err(e)) => {
                warn!(stage = %stage, elapsed_ms, "Stage failed: {}", e);
                None
            }
            Outcome::Crashed(e) => {
                error!(stage = %stage, elapsed_ms, "Stage task crashed: {}", e);
                None
            }
            Outcome::TimedOut => {
                warn!(
                    stage = %stage,
                    deadline_ms = self.deadline.as_millis() as u64,
                    policy = ?self.policy,
                    "Stage timed out"
                );
                None
            }
        }
    }
}

impl Default for TimeoutSupervisor {
    fn default() -> Self {
        Self::new(DEFAULT_STAGE_TIMEOUT)
    }
}

// =============================================================================
// Tests
// =============================================================================
