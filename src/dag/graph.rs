// src/dag/graph.rs

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::engine::TaskName;
use crate::errors::{Result, TaskgraphError};
use crate::task::Task;

/// Internal node structure: the task plus immediate deps and dependents.
#[derive(Debug, Clone)]
struct DagNode {
    task: Arc<Task>,
    /// Direct dependencies, in the order the edges were added.
    deps: Vec<TaskName>,
    /// Direct dependents, in the order the edges were added.
    dependents: Vec<TaskName>,
}

/// In-memory task graph keyed by task name.
///
/// Edges are stored in both directions. Node order is insertion order, which
/// keeps visualization and the dispatch order of simultaneously ready roots
/// stable. Acyclicity is checked separately by [`crate::dag::validate`].
#[derive(Debug, Clone, Default)]
pub struct DagGraph {
    nodes: HashMap<TaskName, DagNode>,
    order: Vec<TaskName>,
}

impl DagGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task node.
    ///
    /// Adding the same `Arc<Task>` twice is a no-op; a *different* task with
    /// an already used name is rejected.
    pub fn add_task(&mut self, task: &Arc<Task>) -> Result<()> {
        if let Some(existing) = self.nodes.get(task.name()) {
            if Arc::ptr_eq(&existing.task, task) {
                return Ok(());
            }
            return Err(TaskgraphError::DuplicateTask(task.name().to_string()));
        }

        let name = task.name().to_string();
        self.nodes.insert(
            name.clone(),
            DagNode {
                task: Arc::clone(task),
                deps: Vec::new(),
                dependents: Vec::new(),
            },
        );
        self.order.push(name);
        Ok(())
    }

    /// Declare that `to` depends on `from`. Both tasks must already be in the
    /// graph. Repeated edges are ignored.
    pub fn add_edge(&mut self, from: &str, to: &str) -> Result<()> {
        for name in [from, to] {
            if !self.nodes.contains_key(name) {
                return Err(TaskgraphError::TaskNotFound(name.to_string()));
            }
        }

        if let Some(node) = self.nodes.get_mut(from) {
            if node.dependents.iter().any(|d| d == to) {
                return Ok(());
            }
            node.dependents.push(to.to_string());
        }
        if let Some(node) = self.nodes.get_mut(to) {
            node.deps.push(from.to_string());
        }

        debug!(from = %from, to = %to, "added edge");
        Ok(())
    }

    /// Every task in `to` depends on every task in `from` (fan-out, fan-in).
    pub fn add_edges(&mut self, from: &[&str], to: &[&str]) -> Result<()> {
        for f in from {
            for t in to {
                self.add_edge(f, t)?;
            }
        }
        Ok(())
    }

    /// Task names in insertion order.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    pub fn task(&self, name: &str) -> Option<&Arc<Task>> {
        self.nodes.get(name).map(|n| &n.task)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Immediate dependencies of a task.
    pub fn dependencies_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a task.
    pub fn dependents_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// Tasks without dependencies.
    pub fn roots(&self) -> impl Iterator<Item = &str> {
        self.tasks().filter(|name| self.dependencies_of(name).is_empty())
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.nodes.values().map(|n| n.dependents.len()).sum()
    }
}
