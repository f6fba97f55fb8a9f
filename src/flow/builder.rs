// src/flow/builder.rs

use std::sync::Arc;

use crate::dag::DagGraph;
use crate::errors::Result;
use crate::flow::Pipeline;
use crate::task::Task;

/// Build a graph from explicit edges.
///
/// ```no_run
/// # use taskgraph::flow::GraphBuilder;
/// # use taskgraph::task::Task;
/// # fn main() -> taskgraph::errors::Result<()> {
/// let extract = Task::new("extract", |_| Ok(serde_json::json!([1, 2, 3])))?;
/// let load = Task::new("load", |_| Ok(serde_json::json!(null)))?;
///
/// let mut builder = GraphBuilder::new("etl");
/// builder.add_edge(&extract, &load)?;
/// let pipeline = builder.build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    name: String,
    graph: DagGraph,
}

impl GraphBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            graph: DagGraph::new(),
        }
    }

    /// Add a task without edges.
    pub fn task(&mut self, task: &Arc<Task>) -> Result<&mut Self> {
        self.graph.add_task(task)?;
        Ok(self)
    }

    /// `to` depends on `from`. Both tasks join the graph if they are not in
    /// it yet.
    pub fn add_edge(&mut self, from: &Arc<Task>, to: &Arc<Task>) -> Result<&mut Self> {
        self.graph.add_task(from)?;
        self.graph.add_task(to)?;
        self.graph.add_edge(from.name(), to.name())?;
        Ok(self)
    }

    /// Every task in `to` depends on every task in `from`.
    pub fn add_edges(&mut self, from: &[&Arc<Task>], to: &[&Arc<Task>]) -> Result<&mut Self> {
        for f in from {
            for t in to {
                self.add_edge(f, t)?;
            }
        }
        Ok(self)
    }

    /// `tasks[i + 1]` depends on `tasks[i]`.
    pub fn chain(&mut self, tasks: &[&Arc<Task>]) -> Result<&mut Self> {
        if let [only] = tasks {
            self.task(only)?;
        }
        for pair in tasks.windows(2) {
            self.add_edge(pair[0], pair[1])?;
        }
        Ok(self)
    }

    /// `task` depends on each named task, in order.
    pub fn depends_on(&mut self, task: &str, upstream: &[&str]) -> Result<&mut Self> {
        for dep in upstream {
            self.graph.add_edge(dep, task)?;
        }
        Ok(self)
    }

    pub fn graph(&self) -> &DagGraph {
        &self.graph
    }

    /// Validate and produce the pipeline.
    pub fn build(&self) -> Result<Pipeline> {
        Pipeline::new(self.name.clone(), self.graph.clone())
    }
}
