// tests/runtime_fake_executor.rs

mod common;

use std::sync::Arc;

use anyhow::anyhow;
use serde_json::json;
use tokio::sync::mpsc;

use taskgraph::cache::{MemoryCache, ResultCache};
use taskgraph::dag::{DagGraph, Scheduler};
use taskgraph::engine::{CoreCommand, CoreRuntime, Runtime, RuntimeEvent, TaskOutcome};
use taskgraph::errors::TaskgraphError;
use taskgraph::events::TaskEvent;
use taskgraph::task::Task;

use crate::common::{graph_of, init_tracing, with_timeout, CollectingSink, FakeExecutor};

/// a -> b -> c, where each task declares its direct upstream as input.
fn chain() -> DagGraph {
    let a = Task::new("a", |_| Ok(json!(null))).unwrap();
    let b = Task::builder("b", |_| Ok(json!(null))).input("a").build().unwrap();
    let c = Task::builder("c", |_| Ok(json!(null))).input("b").build().unwrap();
    graph_of(&[&a, &b, &c], &[("a", "b"), ("b", "c")])
}

fn names(cmd: &CoreCommand) -> Vec<String> {
    match cmd {
        CoreCommand::DispatchTasks(tasks) => tasks.iter().map(|t| t.name.clone()).collect(),
        _ => Vec::new(),
    }
}

#[tokio::test]
async fn runtime_dispatches_chain_in_order() {
    init_tracing();
    let graph = chain();
    let (tx, rx) = mpsc::channel::<RuntimeEvent>(16);
    let executor = FakeExecutor::new(tx);
    let dispatched = executor.dispatched();
    let sink = Arc::new(CollectingSink::new());

    let core = CoreRuntime::new(Scheduler::new(&graph), "chain");
    let runtime = Runtime::new(core, rx, executor, sink.clone());

    let results = with_timeout(runtime.run()).await.unwrap();

    let log = dispatched.lock().unwrap().clone();
    let order: Vec<&str> = log.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(order, vec!["a", "b", "c"]);
    assert!(log[0].inputs.is_empty());
    assert_eq!(log[1].inputs.get("a"), Some(&json!("a")));
    assert_eq!(log[2].inputs.get("b"), Some(&json!("b")));

    assert_eq!(results.len(), 3);

    let events = sink.events();
    assert!(matches!(events.first(), Some(TaskEvent::RunStarted { total: 3, .. })));
    assert!(matches!(events.last(), Some(TaskEvent::RunCompleted { total: 3, .. })));
    let progress: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            TaskEvent::RunProgress { completed, .. } => Some(*completed),
            _ => None,
        })
        .collect();
    assert_eq!(progress, vec![1, 2, 3]);
}

#[tokio::test]
async fn runtime_reports_fake_failure() {
    init_tracing();
    let graph = chain();
    let (tx, rx) = mpsc::channel::<RuntimeEvent>(16);
    let executor = FakeExecutor::new(tx).with_outcome(|t| {
        if t.name == "b" {
            TaskOutcome::Failed(TaskgraphError::TaskExecution {
                task: t.name.clone(),
                attempts: 1,
                source: anyhow!("fake failure"),
            })
        } else {
            TaskOutcome::Success(json!(t.name))
        }
    });
    let dispatched = executor.dispatched();
    let sink = Arc::new(CollectingSink::new());

    let core = CoreRuntime::new(Scheduler::new(&graph), "chain");
    let err = with_timeout(Runtime::new(core, rx, executor, sink.clone()).run())
        .await
        .unwrap_err();

    assert_eq!(err.task_name(), Some("b"));
    assert_eq!(dispatched.lock().unwrap().len(), 2, "c never dispatched");
    assert!(matches!(
        sink.events().last(),
        Some(TaskEvent::RunFailed { task, .. }) if task == "b"
    ));
}

#[tokio::test]
async fn runtime_serves_cached_results_without_dispatch() {
    init_tracing();
    let graph = chain();
    let cache = Arc::new(MemoryCache::new());
    cache.put("a", &json!("cached a")).unwrap();

    let (tx, rx) = mpsc::channel::<RuntimeEvent>(16);
    let executor = FakeExecutor::new(tx);
    let dispatched = executor.dispatched();
    let sink = Arc::new(CollectingSink::new());

    let shared: Arc<dyn ResultCache> = cache.clone();
    let core = CoreRuntime::new(Scheduler::new(&graph), "chain");
    let results = with_timeout(
        Runtime::new(core, rx, executor, sink.clone())
            .with_cache(Some(shared))
            .run(),
    )
    .await
    .unwrap();

    let log = dispatched.lock().unwrap().clone();
    assert_eq!(log.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(), vec!["b", "c"]);
    // b sees the cached value of a.
    assert_eq!(log[0].inputs.get("a"), Some(&json!("cached a")));
    assert_eq!(results["a"], json!("cached a"));

    // Fresh results were written back.
    assert_eq!(cache.get("c").unwrap(), Some(json!("c")));
    assert!(sink
        .events()
        .iter()
        .any(|e| matches!(e, TaskEvent::TaskCached { task } if task == "a")));
}

#[test]
fn core_emits_store_progress_then_dispatch() {
    let graph = chain();
    let mut core = CoreRuntime::new(Scheduler::new(&graph), "chain");

    let start = core.start();
    assert!(start.keep_running);
    assert_eq!(start.commands.len(), 1);
    assert_eq!(names(&start.commands[0]), vec!["a"]);

    let step = core.step(RuntimeEvent::TaskCompleted {
        task: "a".into(),
        outcome: TaskOutcome::Success(json!(10)),
    });
    assert!(step.keep_running);
    assert!(matches!(
        &step.commands[0],
        CoreCommand::StoreResult { task, value } if task == "a" && value == &json!(10)
    ));
    assert!(matches!(
        &step.commands[1],
        CoreCommand::Emit(TaskEvent::RunProgress { completed: 1, total: 3, .. })
    ));
    assert_eq!(names(&step.commands[2]), vec!["b"]);
}

#[test]
fn core_skip_releases_dependents_without_storing() {
    let graph = chain();
    let mut core = CoreRuntime::new(Scheduler::new(&graph), "chain");
    core.start();

    let step = core.step(RuntimeEvent::TaskCompleted {
        task: "a".into(),
        outcome: TaskOutcome::Skipped {
            reason: "condition not met".into(),
        },
    });

    assert!(!step
        .commands
        .iter()
        .any(|c| matches!(c, CoreCommand::StoreResult { .. })));
    let dispatched: Vec<_> = step.commands.iter().flat_map(names).collect();
    assert_eq!(dispatched, vec!["b"]);
    // Nothing to inject from a skipped upstream.
    match step.commands.last() {
        Some(CoreCommand::DispatchTasks(tasks)) => assert!(tasks[0].inputs.is_empty()),
        other => panic!("expected dispatch, got {other:?}"),
    }
}

#[test]
fn core_finishes_after_last_completion() {
    let a = Task::new("only", |_| Ok(json!(1))).unwrap();
    let graph = graph_of(&[&a], &[]);
    let mut core = CoreRuntime::new(Scheduler::new(&graph), "single");
    core.start();
    assert!(!core.is_finished());

    let step = core.step(RuntimeEvent::TaskCompleted {
        task: "only".into(),
        outcome: TaskOutcome::Success(json!(1)),
    });
    assert!(!step.keep_running);
    assert!(core.is_finished());
    assert_eq!(core.finish().unwrap()["only"], json!(1));
}
