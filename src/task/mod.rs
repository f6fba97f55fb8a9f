// src/task/mod.rs

//! Task definition: a named, retryable, optionally guarded unit of work.
//!
//! - [`retry`] holds the retry policy and the per-invocation retry state
//!   machine.
//! - [`inject`] selects which accumulated results become a task's inputs.
//!
//! Tasks are always shared as `Arc<Task>`. A graph references a task, it
//! never copies it, and nothing on a `Task` changes once it is built.

pub mod inject;
pub mod retry;

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;

use crate::errors::{Result, TaskgraphError};

pub use inject::{Inputs, Results, guard_value, select_inputs};
pub use retry::{AttemptState, RetryPolicy, Sleeper, ThreadSleeper, run_with_retry};

/// Value produced and consumed by task bodies.
pub type Value = serde_json::Value;

type Body = dyn Fn(&Inputs) -> anyhow::Result<Value> + Send + Sync;
type GuardFn = dyn Fn(&Value) -> bool + Send + Sync;

/// A unit of work with identity, declared inputs, retry policy and an
/// optional guard predicate.
pub struct Task {
    name: String,
    inputs: Vec<String>,
    retry: RetryPolicy,
    guard: Option<Arc<GuardFn>>,
    body: Arc<Body>,
}

impl Task {
    /// Start building a task around `body`.
    pub fn builder<F>(name: impl Into<String>, body: F) -> TaskBuilder
    where
        F: Fn(&Inputs) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        TaskBuilder {
            name: name.into(),
            inputs: Vec::new(),
            retry: RetryPolicy::default(),
            guard: None,
            body: Arc::new(body),
        }
    }

    /// A task with no declared inputs, no retries and no guard.
    pub fn new<F>(name: impl Into<String>, body: F) -> Result<Arc<Task>>
    where
        F: Fn(&Inputs) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Task::builder(name, body).build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names of upstream results this task wants injected.
    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn has_guard(&self) -> bool {
        self.guard.is_some()
    }

    /// Evaluate the guard. Tasks without a guard always pass.
    pub fn check_guard(&self, value: &Value) -> bool {
        match &self.guard {
            Some(guard) => guard(value),
            None => true,
        }
    }

    /// Call the body exactly once.
    ///
    /// A panicking body is reported as an ordinary error so the retry engine
    /// treats it like any other failure.
    pub fn invoke(&self, inputs: &Inputs) -> anyhow::Result<Value> {
        match panic::catch_unwind(AssertUnwindSafe(|| (self.body)(inputs))) {
            Ok(result) => result,
            Err(payload) => {
                let msg = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic payload".to_string());
                Err(anyhow!("task body panicked: {msg}"))
            }
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .field("retry", &self.retry)
            .field("guarded", &self.guard.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Task`]; validated in [`TaskBuilder::build`].
pub struct TaskBuilder {
    name: String,
    inputs: Vec<String>,
    retry: RetryPolicy,
    guard: Option<Arc<GuardFn>>,
    body: Arc<Body>,
}

impl TaskBuilder {
    /// Declare one input name. Declaring the same name twice is harmless.
    pub fn input(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.inputs.contains(&name) {
            self.inputs.push(name);
        }
        self
    }

    pub fn inputs<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        names.into_iter().fold(self, |b, n| b.input(n))
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.retry.retries = retries;
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.retry.delay = delay;
        self
    }

    pub fn backoff(mut self, backoff: f64) -> Self {
        self.retry.backoff = backoff;
        self
    }

    /// Upper bound of the random jitter fraction added to each retry delay.
    pub fn max_jitter(mut self, max_jitter: f64) -> Self {
        self.retry.max_jitter = max_jitter;
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Only run when `guard` accepts the result of the first dependency.
    pub fn when<G>(mut self, guard: G) -> Self
    where
        G: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.guard = Some(Arc::new(guard));
        self
    }

    pub fn build(self) -> Result<Arc<Task>> {
        if self.name.trim().is_empty() {
            return Err(TaskgraphError::InvalidTask {
                task: self.name,
                reason: "task name must not be empty".to_string(),
            });
        }
        if let Err(reason) = self.retry.check() {
            return Err(TaskgraphError::InvalidTask {
                task: self.name,
                reason,
            });
        }

        Ok(Arc::new(Task {
            name: self.name,
            inputs: self.inputs,
            retry: self.retry,
            guard: self.guard,
            body: self.body,
        }))
    }
}
