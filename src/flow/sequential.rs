// src/flow/sequential.rs

use std::sync::Arc;

use tracing::warn;

use crate::dag::DagGraph;
use crate::engine::TaskName;
use crate::errors::{Result, TaskgraphError};
use crate::flow::Pipeline;
use crate::task::Task;

/// Chain-style builder.
///
/// The flow tracks the *current branch set*: the tasks the next call attaches
/// to. `add` and `merge` make a single task the current set; `branch` makes
/// all of its tasks the current set.
///
/// ```text
/// Flow::new("p").add(&a)?.branch(&[&b, &c])?.merge(&d)?.add(&e)?
///
///        +-> b -+
///   a ---+      +--> d --> e
///        +-> c -+
/// ```
#[derive(Debug, Clone)]
pub struct Flow {
    name: String,
    graph: DagGraph,
    branch_points: Vec<TaskName>,
}

impl Flow {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            graph: DagGraph::new(),
            branch_points: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append `task` after every task of the current branch set. The first
    /// `add` starts the flow.
    pub fn add(mut self, task: &Arc<Task>) -> Result<Self> {
        self.graph.add_task(task)?;
        for prev in &self.branch_points {
            self.graph.add_edge(prev, task.name())?;
        }
        self.branch_points = vec![task.name().to_string()];
        Ok(self)
    }

    /// Fan out: every task in `tasks` runs after the whole current branch
    /// set, and they may run in parallel with each other.
    pub fn branch(mut self, tasks: &[&Arc<Task>]) -> Result<Self> {
        if self.branch_points.is_empty() {
            return Err(TaskgraphError::EmptyFlow(self.name));
        }
        if tasks.is_empty() {
            warn!(flow = %self.name, "branch called without tasks; ignoring");
            return Ok(self);
        }

        for task in tasks {
            self.graph.add_task(task)?;
            for prev in &self.branch_points {
                self.graph.add_edge(prev, task.name())?;
            }
        }
        self.branch_points = tasks.iter().map(|t| t.name().to_string()).collect();
        Ok(self)
    }

    /// Fan in: `task` waits for every task of the current branch set.
    pub fn merge(mut self, task: &Arc<Task>) -> Result<Self> {
        if self.branch_points.is_empty() {
            return Err(TaskgraphError::EmptyFlow(self.name));
        }
        self.add(task)
    }

    /// Names of the current branch set.
    pub fn branch_points(&self) -> &[TaskName] {
        &self.branch_points
    }

    pub fn graph(&self) -> &DagGraph {
        &self.graph
    }

    /// Validate and produce the pipeline.
    pub fn build(self) -> Result<Pipeline> {
        Pipeline::new(self.name, self.graph)
    }
}
