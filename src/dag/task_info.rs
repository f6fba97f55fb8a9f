// src/dag/task_info.rs

//! Per-run task bookkeeping and the unit handed to executors.

use std::sync::Arc;

use crate::engine::TaskName;
use crate::task::{Inputs, Task, Value};

/// State of a task within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRunState {
    /// Waiting for dependencies to reach a terminal state.
    Pending,
    /// Dispatched to the executor (or waiting for a pool slot).
    Running,
    Succeeded,
    /// Guard rejected the task; it produced no result.
    Skipped,
    Failed,
}

impl TaskRunState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskRunState::Succeeded | TaskRunState::Skipped | TaskRunState::Failed
        )
    }
}

/// Static task information plus the per-run counters.
#[derive(Debug, Clone)]
pub struct TaskInfo {
    pub name: TaskName,
    pub task: Arc<Task>,
    /// Direct dependencies, in edge order.
    pub deps: Vec<TaskName>,
    /// Dependencies that have not reached a terminal state yet.
    pub indegree: usize,
    pub run_state: TaskRunState,
}

impl TaskInfo {
    pub fn new(task: Arc<Task>, deps: Vec<TaskName>) -> Self {
        Self {
            name: task.name().to_string(),
            indegree: deps.len(),
            task,
            deps,
            run_state: TaskRunState::Pending,
        }
    }
}

/// A task the scheduler wants executed now, with its arguments resolved.
#[derive(Debug, Clone)]
pub struct ScheduledTask {
    pub name: TaskName,
    pub task: Arc<Task>,
    /// Injected upstream results (declared names only).
    pub inputs: Inputs,
    /// Result of the first dependency, evaluated by the guard.
    pub guard_value: Option<Value>,
}
