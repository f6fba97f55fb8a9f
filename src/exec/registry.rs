// src/exec/registry.rs

use std::collections::HashMap;
use std::sync::Arc;

use crate::dag::DagGraph;
use crate::errors::{Result, TaskgraphError};
use crate::task::Task;

/// Explicit name → task table used by worker processes.
///
/// A worker cannot receive a closure over the pipe, so it looks the task up
/// by name. The worker binary must register the same tasks the parent graph
/// uses.
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    tasks: HashMap<String, Arc<Task>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every task of `graph`.
    pub fn from_graph(graph: &DagGraph) -> Self {
        let tasks = graph
            .tasks()
            .filter_map(|name| graph.task(name).map(|t| (name.to_string(), Arc::clone(t))))
            .collect();
        Self { tasks }
    }

    /// Register a task. Registering the same `Arc` twice is a no-op; a
    /// different task under an existing name is rejected.
    pub fn register(&mut self, task: Arc<Task>) -> Result<()> {
        if let Some(existing) = self.tasks.get(task.name()) {
            if Arc::ptr_eq(existing, &task) {
                return Ok(());
            }
            return Err(TaskgraphError::DuplicateTask(task.name().to_string()));
        }
        self.tasks.insert(task.name().to_string(), task);
        Ok(())
    }

    /// Register every task of `graph`.
    pub fn register_graph(&mut self, graph: &DagGraph) -> Result<()> {
        for name in graph.tasks() {
            if let Some(task) = graph.task(name) {
                self.register(Arc::clone(task))?;
            }
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<Task>> {
        self.tasks.get(name).cloned()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tasks.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
