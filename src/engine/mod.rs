// src/engine/mod.rs

//! Orchestration engine.
//!
//! This module ties together:
//! - the DAG scheduler
//! - the result cache consulted before dispatch
//! - the runtime event loop that reacts to task completions reported by an
//!   executor backend
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use crate::errors::TaskgraphError;
use crate::task::Value;

/// Canonical task name type used throughout the engine.
pub type TaskName = String;

/// Final outcome of one task dispatch, as seen by the scheduler.
#[derive(Debug)]
pub enum TaskOutcome {
    Success(Value),
    /// The guard rejected the task; it produced no result.
    Skipped { reason: String },
    /// Retries exhausted, or an infrastructure failure in the substrate.
    Failed(TaskgraphError),
}

/// Events flowing into the runtime from executors and the cache lookup.
#[derive(Debug)]
pub enum RuntimeEvent {
    /// A dispatched task reached its final outcome.
    TaskCompleted { task: TaskName, outcome: TaskOutcome },
    /// A ready task was answered from the result cache without running.
    CacheHit { task: TaskName, value: Value },
}

pub mod core;
pub mod event_handlers;
pub mod options;
pub mod runtime;

pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use options::RunOptions;
pub use runtime::Runtime;
