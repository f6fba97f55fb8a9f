// src/task/retry.rs

//! Retry engine: bounded attempts with exponential backoff plus jitter.
//!
//! One invocation walks `Pending -> Running -> {Success, Retrying, Failed}`;
//! `Retrying` sleeps on the *executing* worker and goes back to `Running`.
//! The scheduler never sleeps on behalf of a task.

use std::time::{Duration, Instant};

use rand::Rng;
use tracing::{debug, warn};

use crate::errors::TaskgraphError;
use crate::events::{EventSink, TaskEvent};

use super::{Inputs, Task, Value};

/// Retry configuration attached to a task.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one.
    pub retries: u32,
    /// Delay before the first retry.
    pub delay: Duration,
    /// Multiplier applied to the delay for every further retry.
    pub backoff: f64,
    /// Jitter is drawn uniformly from `[0, max_jitter]` and scales the delay
    /// by `1 + jitter`.
    pub max_jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 0,
            delay: Duration::from_secs(1),
            backoff: 2.0,
            max_jitter: 0.1,
        }
    }
}

impl RetryPolicy {
    pub(crate) fn check(&self) -> std::result::Result<(), String> {
        if self.delay.is_zero() {
            return Err("retry delay must be > 0".to_string());
        }
        if !self.backoff.is_finite() || self.backoff < 1.0 {
            return Err(format!("backoff must be >= 1.0 (got {})", self.backoff));
        }
        if !(0.0..=1.0).contains(&self.max_jitter) {
            return Err(format!(
                "max_jitter must be within [0, 1] (got {})",
                self.max_jitter
            ));
        }
        Ok(())
    }

    /// Total number of body invocations when every attempt fails.
    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// `delay * backoff^retry_index`, without jitter. Saturates at
    /// [`Duration::MAX`].
    pub fn base_delay(&self, retry_index: u32) -> Duration {
        let exp = i32::try_from(retry_index).unwrap_or(i32::MAX);
        scale(self.delay, self.backoff.powi(exp))
    }

    /// Delay for a given retry with an explicit jitter fraction (clamped to
    /// `[0, max_jitter]`).
    pub fn delay_with_jitter(&self, retry_index: u32, jitter: f64) -> Duration {
        let jitter = jitter.clamp(0.0, self.max_jitter);
        scale(self.base_delay(retry_index), 1.0 + jitter)
    }

    /// Delay for a given retry with freshly sampled jitter.
    pub fn sample_delay(&self, retry_index: u32) -> Duration {
        let jitter = if self.max_jitter > 0.0 {
            rand::thread_rng().gen_range(0.0..=self.max_jitter)
        } else {
            0.0
        };
        self.delay_with_jitter(retry_index, jitter)
    }
}

fn scale(delay: Duration, factor: f64) -> Duration {
    Duration::try_from_secs_f64(delay.as_secs_f64() * factor).unwrap_or(Duration::MAX)
}

fn millis(delay: Duration) -> u64 {
    u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}

/// Blocks the executing worker between attempts.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Real sleeper used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// State of a single task invocation.
#[derive(Debug)]
pub enum AttemptState {
    Pending,
    /// Body is executing; `attempt` is 1-based.
    Running { attempt: u32 },
    /// Previous attempt failed; sleeping before the next one.
    Retrying { attempt: u32, delay: Duration },
    Success { value: Value, attempts: u32 },
    Failed { error: anyhow::Error, attempts: u32 },
}

/// Run `task` with its retry policy.
///
/// Returns the value together with the number of attempts it took, or a
/// [`TaskgraphError::TaskExecution`] wrapping the last underlying error.
pub fn run_with_retry(
    task: &Task,
    inputs: &Inputs,
    sleeper: &dyn Sleeper,
    sink: &dyn EventSink,
) -> Result<(Value, u32), TaskgraphError> {
    let policy = task.retry_policy();
    let started = Instant::now();
    let mut state = AttemptState::Pending;

    loop {
        state = match state {
            AttemptState::Pending => AttemptState::Running { attempt: 1 },

            AttemptState::Running { attempt } => {
                sink.emit(&TaskEvent::TaskStarted {
                    task: task.name().to_string(),
                    attempt,
                });

                match task.invoke(inputs) {
                    Ok(value) => AttemptState::Success {
                        value,
                        attempts: attempt,
                    },
                    Err(error) if attempt <= policy.retries => {
                        let delay = policy.sample_delay(attempt - 1);
                        warn!(
                            task = %task.name(),
                            attempt,
                            max_retries = policy.retries,
                            delay_ms = millis(delay),
                            error = %format!("{error:#}"),
                            "task attempt failed; retrying"
                        );
                        sink.emit(&TaskEvent::TaskRetrying {
                            task: task.name().to_string(),
                            attempt,
                            max_retries: policy.retries,
                            delay_ms: millis(delay),
                        });
                        AttemptState::Retrying { attempt, delay }
                    }
                    Err(error) => AttemptState::Failed {
                        error,
                        attempts: attempt,
                    },
                }
            }

            AttemptState::Retrying { attempt, delay } => {
                sleeper.sleep(delay);
                AttemptState::Running {
                    attempt: attempt + 1,
                }
            }

            AttemptState::Success { value, attempts } => {
                debug!(task = %task.name(), attempts, "task body succeeded");
                sink.emit(&TaskEvent::TaskSucceeded {
                    task: task.name().to_string(),
                    attempts,
                    duration_ms: started.elapsed().as_millis() as u64,
                });
                return Ok((value, attempts));
            }

            AttemptState::Failed { error, attempts } => {
                sink.emit(&TaskEvent::TaskFailed {
                    task: task.name().to_string(),
                    attempts,
                    error: format!("{error:#}"),
                });
                return Err(TaskgraphError::TaskExecution {
                    task: task.name().to_string(),
                    attempts,
                    source: error,
                });
            }
        };
    }
}
