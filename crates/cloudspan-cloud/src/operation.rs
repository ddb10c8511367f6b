//! Long-running provider operations
//!
//! Providers answer create/delete requests with a handle that has to be
//! polled until it reaches a terminal state. [`OperationWaiter`] drives that
//! handle through `Requested → Polling → Terminal` with exponential backoff,
//! a deadline and a caller-supplied cancellation token.
//!
//! Cancelling only stops the wait. The provider keeps working on the
//! operation, so the resource may still appear (or disappear) after the
//! caller has been told the call was cancelled.

use crate::error::{CloudError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, sleep, sleep_until};
use tokio_util::sync::CancellationToken;

/// Polling schedule for long-running operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitConfig {
    /// Maximum number of polls before giving up
    #[serde(default = "default_max_polls")]
    pub max_polls: u32,
    /// Delay before the second poll (milliseconds)
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,
    /// Upper bound for a single delay (milliseconds)
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
    /// Exponential multiplier
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    /// Overall deadline (milliseconds); `None` means only `max_polls` bounds the wait
    #[serde(default = "default_timeout")]
    pub timeout_ms: Option<u64>,
}

fn default_max_polls() -> u32 {
    120
}
fn default_initial_delay() -> u64 {
    2000
}
fn default_max_delay() -> u64 {
    30000
}
fn default_multiplier() -> f64 {
    1.5
}
fn default_timeout() -> Option<u64> {
    Some(30 * 60 * 1000)
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            max_polls: default_max_polls(),
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
            multiplier: default_multiplier(),
            timeout_ms: default_timeout(),
        }
    }
}

impl WaitConfig {
    /// Delay after the given (zero-based) poll, in milliseconds
    pub fn delay_for_attempt(&self, attempt: u32) -> u64 {
        let delay = self.initial_delay_ms as f64 * self.multiplier.powi(attempt as i32);
        (delay as u64).min(self.max_delay_ms)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// Caller-side controls for a single driver call
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    cancel: CancellationToken,
    timeout: Option<Duration>,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Run one provider call under this context's cancellation and timeout
    ///
    /// The timeout is measured from the start of this call.
    pub async fn guard<F, T>(&self, what: &str, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let started = Instant::now();
        let deadline = self.timeout.map(|t| started + t);
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(CloudError::Cancelled(what.to_string())),
            _ = sleep_until_deadline(deadline) => Err(CloudError::OperationTimeout {
                operation: what.to_string(),
                polls: 0,
                waited: started.elapsed(),
            }),
            result = call => result,
        }
    }
}

/// State reported by one poll of a provider operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationState {
    InProgress,
    Succeeded,
    Failed(String),
    /// Cancelled on the provider side
    Canceled,
}

/// Where a wait currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationPhase {
    Requested,
    Polling { attempt: u32 },
    Terminal,
}

impl fmt::Display for OperationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationPhase::Requested => write!(f, "requested"),
            OperationPhase::Polling { attempt } => write!(f, "polling (attempt {})", attempt),
            OperationPhase::Terminal => write!(f, "terminal"),
        }
    }
}

/// Handle to an operation the provider is still working on
#[async_trait]
pub trait LongRunningOperation: Send {
    /// Short description used in logs and errors, e.g. "create image golden-1"
    fn describe(&self) -> &str;

    /// Ask the provider for the current state
    async fn poll(&mut self) -> Result<OperationState>;
}

/// Drives [`LongRunningOperation`]s to a terminal state
#[derive(Debug, Clone, Default)]
pub struct OperationWaiter {
    config: WaitConfig,
}

impl OperationWaiter {
    pub fn new(config: WaitConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WaitConfig {
        &self.config
    }

    /// Poll until the operation succeeds, fails, runs out of time, or the
    /// caller cancels.
    ///
    /// The effective deadline is the shorter of the configured timeout and
    /// the context's timeout.
    pub async fn wait(
        &self,
        mut operation: Box<dyn LongRunningOperation>,
        ctx: &CallContext,
    ) -> Result<()> {
        let started = Instant::now();
        let deadline = match (self.config.timeout(), ctx.timeout()) {
            (Some(a), Some(b)) => Some(started + a.min(b)),
            (Some(a), None) | (None, Some(a)) => Some(started + a),
            (None, None) => None,
        };
        let name = operation.describe().to_string();
        let mut phase = OperationPhase::Requested;
        tracing::debug!("Operation '{}' {}", name, phase);

        for attempt in 0..self.config.max_polls {
            if ctx.is_cancelled() {
                return Err(CloudError::Cancelled(name));
            }

            phase = OperationPhase::Polling { attempt };
            let state = tokio::select! {
                _ = ctx.cancellation().cancelled() => {
                    return Err(CloudError::Cancelled(name));
                }
                _ = sleep_until_deadline(deadline) => {
                    return Err(CloudError::OperationTimeout {
                        operation: name,
                        polls: attempt + 1,
                        waited: started.elapsed(),
                    });
                }
                state = operation.poll() => state?,
            };
            tracing::debug!("Operation '{}' {}: {:?}", name, phase, state);

            match state {
                OperationState::Succeeded => {
                    phase = OperationPhase::Terminal;
                    tracing::debug!(
                        "Operation '{}' {} after {:?}",
                        name,
                        phase,
                        started.elapsed()
                    );
                    return Ok(());
                }
                OperationState::Failed(message) => {
                    return Err(CloudError::OperationFailed {
                        operation: name,
                        status: "Failed".to_string(),
                        message,
                    });
                }
                OperationState::Canceled => {
                    return Err(CloudError::OperationFailed {
                        operation: name,
                        status: "Canceled".to_string(),
                        message: "cancelled by the provider".to_string(),
                    });
                }
                OperationState::InProgress => {}
            }

            if attempt + 1 >= self.config.max_polls {
                break;
            }

            let mut delay = Duration::from_millis(self.config.delay_for_attempt(attempt));
            if let Some(deadline) = deadline {
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                delay = delay.min(deadline - now);
            }

            tokio::select! {
                _ = ctx.cancellation().cancelled() => {
                    return Err(CloudError::Cancelled(name));
                }
                _ = sleep(delay) => {}
            }

            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Err(CloudError::OperationTimeout {
                    operation: name,
                    polls: attempt + 1,
                    waited: started.elapsed(),
                });
            }
        }

        Err(CloudError::OperationTimeout {
            operation: name,
            polls: self.config.max_polls,
            waited: started.elapsed(),
        })
    }
}

/// Resolves at `deadline`, or never when there is none
async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Operation that is already finished, for providers that complete synchronously
pub struct CompletedOperation {
    description: String,
}

impl CompletedOperation {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

#[async_trait]
impl LongRunningOperation for CompletedOperation {
    fn describe(&self) -> &str {
        &self.description
    }

    async fn poll(&mut self) -> Result<OperationState> {
        Ok(OperationState::Succeeded)
    }
}
