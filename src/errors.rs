// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskgraphError {
    /// A task body kept failing after every retry (or had none).
    #[error("Task '{task}' failed after {attempts} attempt(s): {source:#}")]
    TaskExecution {
        task: String,
        attempts: u32,
        #[source]
        source: anyhow::Error,
    },

    #[error("Cycle detected in DAG involving task '{task}': {}", cycle.join(" -> "))]
    DagCycle { task: String, cycle: Vec<String> },

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Duplicate task name in graph: {0}")]
    DuplicateTask(String),

    #[error("Invalid task '{task}': {reason}")]
    InvalidTask { task: String, reason: String },

    #[error("Flow '{0}' has no tasks to branch from or merge")]
    EmptyFlow(String),

    /// Inputs, results or events could not cross the process boundary.
    #[error("Serialization error for task '{task}': {source}")]
    Serialization {
        task: String,
        #[source]
        source: serde_json::Error,
    },

    /// Process-pool infrastructure failure (spawn, crash, bad protocol).
    #[error("Worker error for task '{task}': {message}")]
    Worker { task: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TaskgraphError {
    /// Name of the task this error is attributed to, if any.
    pub fn task_name(&self) -> Option<&str> {
        match self {
            TaskgraphError::TaskExecution { task, .. }
            | TaskgraphError::DagCycle { task, .. }
            | TaskgraphError::InvalidTask { task, .. }
            | TaskgraphError::Serialization { task, .. }
            | TaskgraphError::Worker { task, .. } => Some(task),
            TaskgraphError::TaskNotFound(task) | TaskgraphError::DuplicateTask(task) => Some(task),
            _ => None,
        }
    }

    /// Infrastructure failures are never retried and never cached.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            TaskgraphError::Serialization { .. } | TaskgraphError::Worker { .. }
        )
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, TaskgraphError>;
