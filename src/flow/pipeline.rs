// src/flow/pipeline.rs

use crate::dag::{self, DagGraph};
use crate::engine::RunOptions;
use crate::errors::Result;
use crate::exec::TaskRegistry;
use crate::task::Results;
use crate::visualize;

/// A named, validated task graph ready to run.
///
/// Running never mutates the graph; a pipeline may be run any number of
/// times, concurrently or not.
#[derive(Debug, Clone)]
pub struct Pipeline {
    name: String,
    graph: DagGraph,
}

impl Pipeline {
    /// Validate `graph` and wrap it.
    pub fn new(name: impl Into<String>, graph: DagGraph) -> Result<Self> {
        dag::validate(&graph)?;
        Ok(Self {
            name: name.into(),
            graph,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn graph(&self) -> &DagGraph {
        &self.graph
    }

    /// Every task in the pipeline, for serving process-pool workers.
    pub fn registry(&self) -> TaskRegistry {
        TaskRegistry::from_graph(&self.graph)
    }

    fn options_for(&self, options: &RunOptions) -> RunOptions {
        RunOptions {
            name: self.name.clone(),
            ..options.clone()
        }
    }

    /// Run to completion, blocking the caller. The run is named after the
    /// pipeline.
    pub fn run(&self, options: &RunOptions) -> Result<Results> {
        crate::execute(&self.graph, &self.options_for(options))
    }

    pub async fn run_async(&self, options: &RunOptions) -> Result<Results> {
        crate::execute_async(&self.graph, &self.options_for(options)).await
    }

    pub fn visualize(&self) -> String {
        visualize::visualize(&self.graph, &self.name)
    }

    pub fn summary(&self) -> Result<String> {
        visualize::summary(&self.graph, &self.name)
    }
}
