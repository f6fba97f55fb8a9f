// tests/process_pool.rs

//! Runs the demo pipelines on the process pool, using the `taskgraph`
//! binary as the worker.

mod common;

use serde_json::json;

use taskgraph::cli::PipelineName;
use taskgraph::demo;
use taskgraph::errors::TaskgraphError;
use taskgraph::events::TaskEvent;
use taskgraph::exec::WorkerCommand;
use taskgraph::types::ExecutorKind;
use taskgraph::RunOptions;

use crate::common::{builders, graph_of, options, CollectingSink};

fn process_options(workers: usize) -> (RunOptions, std::sync::Arc<CollectingSink>) {
    let (opts, sink) = options(workers);
    let opts = opts
        .with_executor(ExecutorKind::Process)
        // Worker mode is selected by the environment; arguments are passed
        // through untouched.
        .with_worker(WorkerCommand::new(env!("CARGO_BIN_EXE_taskgraph")).arg("--dry-run"));
    (opts, sink)
}

#[test]
fn fanout_runs_in_worker_processes() {
    let pipeline = demo::pipeline(PipelineName::Fanout).unwrap();
    let (opts, sink) = process_options(2);

    let results = pipeline.run(&opts).unwrap();

    assert_eq!(results["fetch"], json!([1, 2, 3]));
    assert_eq!(results["count"], json!(3));
    assert_eq!(results["total"], json!(6));

    // Lifecycle events emitted inside the workers reach the parent's sink.
    for task in ["fetch", "count", "total"] {
        assert!(sink
            .for_task(task)
            .iter()
            .any(|e| matches!(e, TaskEvent::TaskSucceeded { .. })));
    }
}

#[test]
fn guard_skips_cross_the_process_boundary() {
    let pipeline = demo::pipeline(PipelineName::Approval).unwrap();
    let (opts, sink) = process_options(3);

    let results = pipeline.run(&opts).unwrap();

    assert_eq!(
        results["finalize"],
        json!({ "amount": 1260, "approval": "manual" })
    );
    assert!(!results.contains_key("auto_approve"));
    assert_eq!(sink.skipped().len(), 1);
}

#[test]
fn task_unknown_to_the_worker_is_an_infrastructure_error() {
    let stranger = builders::constant("not_registered", json!(0));
    let graph = graph_of(&[&stranger], &[]);
    let (opts, _sink) = process_options(1);

    let err = taskgraph::execute(&graph, &opts).unwrap_err();

    assert!(err.is_infrastructure());
    match err {
        TaskgraphError::Worker { task, message } => {
            assert_eq!(task, "not_registered");
            assert!(message.contains("unknown task"), "{message}");
        }
        other => panic!("expected Worker error, got {other:?}"),
    }
}

#[test]
fn missing_worker_program_fails_the_task() {
    let fetch = builders::constant("fetch", json!([]));
    let graph = graph_of(&[&fetch], &[]);
    let (opts, _sink) = options(1);
    let opts = opts
        .with_executor(ExecutorKind::Process)
        .with_worker(WorkerCommand::new("/definitely/not/a/taskgraph/binary"));

    let err = taskgraph::execute(&graph, &opts).unwrap_err();
    assert!(matches!(err, TaskgraphError::Worker { ref task, .. } if task == "fetch"));
}
