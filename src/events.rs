// src/events.rs

//! Lifecycle events emitted by the core.
//!
//! The core never formats output itself. It hands discrete, serializable
//! [`TaskEvent`] records to an [`EventSink`], which may be called from many
//! workers at once. [`TracingSink`] forwards to `tracing` (the default),
//! [`JsonSink`] writes one JSON object per line.

use std::io::Write;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// A single lifecycle record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TaskEvent {
    RunStarted {
        run: String,
        total: usize,
    },
    TaskStarted {
        task: String,
        attempt: u32,
    },
    TaskSucceeded {
        task: String,
        attempts: u32,
        duration_ms: u64,
    },
    TaskRetrying {
        task: String,
        attempt: u32,
        max_retries: u32,
        delay_ms: u64,
    },
    TaskFailed {
        task: String,
        attempts: u32,
        error: String,
    },
    TaskSkipped {
        task: String,
        reason: String,
    },
    /// Result served from the cache; the body was not invoked.
    TaskCached {
        task: String,
    },
    RunProgress {
        run: String,
        completed: usize,
        total: usize,
    },
    RunCompleted {
        run: String,
        total: usize,
        duration_ms: u64,
    },
    RunFailed {
        run: String,
        task: String,
        error: String,
    },
}

impl TaskEvent {
    /// Task this event is about, if it is a task-level event.
    pub fn task(&self) -> Option<&str> {
        match self {
            TaskEvent::TaskStarted { task, .. }
            | TaskEvent::TaskSucceeded { task, .. }
            | TaskEvent::TaskRetrying { task, .. }
            | TaskEvent::TaskFailed { task, .. }
            | TaskEvent::TaskSkipped { task, .. }
            | TaskEvent::TaskCached { task } => Some(task),
            TaskEvent::RunFailed { task, .. } => Some(task),
            _ => None,
        }
    }
}

/// Receiver of lifecycle events. Must tolerate concurrent calls.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &TaskEvent);
}

impl<T: EventSink + ?Sized> EventSink for Arc<T> {
    fn emit(&self, event: &TaskEvent) {
        (**self).emit(event)
    }
}

/// Forwards events to `tracing` with structured fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &TaskEvent) {
        match event {
            TaskEvent::RunStarted { run, total } => {
                info!(run = %run, total, "run started");
            }
            TaskEvent::TaskStarted { task, attempt } => {
                info!(task = %task, attempt, "task started");
            }
            TaskEvent::TaskSucceeded {
                task,
                attempts,
                duration_ms,
            } => {
                info!(task = %task, attempts, duration_ms, "task succeeded");
            }
            TaskEvent::TaskRetrying {
                task,
                attempt,
                max_retries,
                delay_ms,
            } => {
                warn!(task = %task, attempt, max_retries, delay_ms, "task retrying");
            }
            TaskEvent::TaskFailed {
                task,
                attempts,
                error,
            } => {
                tracing::error!(task = %task, attempts, error = %error, "task failed");
            }
            TaskEvent::TaskSkipped { task, reason } => {
                info!(task = %task, reason = %reason, "task skipped");
            }
            TaskEvent::TaskCached { task } => {
                info!(task = %task, "task result served from cache");
            }
            TaskEvent::RunProgress {
                run,
                completed,
                total,
            } => {
                info!(run = %run, completed, total, "run progress");
            }
            TaskEvent::RunCompleted {
                run,
                total,
                duration_ms,
            } => {
                info!(run = %run, total, duration_ms, "run completed");
            }
            TaskEvent::RunFailed { run, task, error } => {
                tracing::error!(run = %run, task = %task, error = %error, "run failed");
            }
        }
    }
}

/// Writes each event as a JSON line to the wrapped writer.
#[derive(Debug)]
pub struct JsonSink<W> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl JsonSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> EventSink for JsonSink<W> {
    fn emit(&self, event: &TaskEvent) {
        let mut out = match self.out.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let res = serde_json::to_writer(&mut *out, event)
            .map_err(std::io::Error::from)
            .and_then(|()| writeln!(out))
            .and_then(|()| out.flush());
        if let Err(e) = res {
            warn!(error = %e, "failed to write JSON event");
        }
    }
}

/// Drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: &TaskEvent) {}
}
