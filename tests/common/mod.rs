#![allow(dead_code)]

use std::sync::Arc;

use taskgraph::dag::DagGraph;
use taskgraph::task::Task;
use taskgraph::types::MaxWorkers;
use taskgraph::RunOptions;

pub use taskgraph_test_utils::builders;
pub use taskgraph_test_utils::{
    init_tracing, with_timeout, CollectingSink, FakeExecutor, RecordingSleeper, Timeline,
};

/// Thread-pool options with `workers` slots and a collecting sink.
pub fn options(workers: usize) -> (RunOptions, Arc<CollectingSink>) {
    let sink = Arc::new(CollectingSink::new());
    let options = RunOptions::new("test")
        .with_max_workers(MaxWorkers::fixed(workers).expect("workers >= 1"))
        .with_sink(sink.clone());
    (options, sink)
}

/// Graph from tasks (in insertion order) and `(from, to)` edges.
pub fn graph_of(tasks: &[&Arc<Task>], edges: &[(&str, &str)]) -> DagGraph {
    let mut graph = DagGraph::new();
    for task in tasks {
        graph.add_task(task).expect("add task");
    }
    for (from, to) in edges {
        graph.add_edge(from, to).expect("add edge");
    }
    graph
}
