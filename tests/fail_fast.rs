// tests/fail_fast.rs

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::anyhow;
use serde_json::json;

use taskgraph::dag::{Scheduler, TaskRunState};
use taskgraph::engine::TaskOutcome;
use taskgraph::errors::TaskgraphError;
use taskgraph::events::TaskEvent;
use taskgraph::task::Task;

use crate::common::{builders, graph_of, options};

#[test]
fn failure_stops_new_dispatch_but_drains_in_flight_tasks() {
    let failed_calls = Arc::new(AtomicUsize::new(0));
    let downstream_calls = Arc::new(AtomicUsize::new(0));

    let bad = builders::failing("bad", 0, &failed_calls);
    let slow = builders::sleepy("slow", Duration::from_millis(150));
    let after_bad = builders::counting("after_bad", &downstream_calls);
    let after_slow = builders::counting("after_slow", &downstream_calls);

    let graph = graph_of(
        &[&bad, &slow, &after_bad, &after_slow],
        &[("bad", "after_bad"), ("slow", "after_slow")],
    );

    let (opts, sink) = options(2);
    let err = taskgraph::execute(&graph, &opts).unwrap_err();

    assert_eq!(err.task_name(), Some("bad"));
    assert_eq!(failed_calls.load(Ordering::SeqCst), 1);
    assert_eq!(downstream_calls.load(Ordering::SeqCst), 0);

    let events = sink.events();
    // The slow sibling was already running and finished normally.
    assert!(events
        .iter()
        .any(|e| matches!(e, TaskEvent::TaskSucceeded { task, .. } if task == "slow")));
    assert!(events
        .iter()
        .any(|e| matches!(e, TaskEvent::RunFailed { task, .. } if task == "bad")));
    assert!(!events.iter().any(|e| matches!(e, TaskEvent::RunCompleted { .. })));
}

#[test]
fn first_failure_is_the_reported_one() {
    let early = Task::new("early", |_| Err(anyhow!("early failure"))).unwrap();
    let late = Task::new("late", |_| {
        std::thread::sleep(Duration::from_millis(100));
        Err(anyhow!("late failure"))
    })
    .unwrap();
    let graph = graph_of(&[&early, &late], &[]);

    let (opts, _sink) = options(2);
    let err = taskgraph::execute(&graph, &opts).unwrap_err();

    assert!(err.to_string().contains("early failure"), "{err}");
}

#[test]
fn scheduler_holds_released_tasks_once_halted() {
    let a = builders::constant("a", json!(1));
    let b = builders::constant("b", json!(2));
    let c = builders::constant("c", json!(3));
    let graph = graph_of(&[&a, &b, &c], &[("b", "c")]);

    let mut scheduler = Scheduler::new(&graph);
    let roots: Vec<String> = scheduler
        .start()
        .newly_scheduled
        .into_iter()
        .map(|t| t.name)
        .collect();
    assert_eq!(roots, vec!["a", "b"]);

    let step = scheduler.step_completion(
        "a",
        TaskOutcome::Failed(TaskgraphError::TaskExecution {
            task: "a".into(),
            attempts: 1,
            source: anyhow!("nope"),
        }),
    );
    assert_eq!(step.newly_failed.as_deref(), Some("a"));
    assert!(scheduler.is_halted());
    assert_eq!(scheduler.failure().and_then(|e| e.task_name()), Some("a"));
    assert!(!step.run_just_finished, "b is still in flight");

    // b succeeds, c becomes ready but is held back.
    let step = scheduler.step_completion("b", TaskOutcome::Success(json!(2)));
    assert!(step.newly_scheduled.is_empty());
    assert!(step.run_just_finished);
    assert_eq!(scheduler.run_state_of("c"), Some(TaskRunState::Pending));
    assert_eq!(scheduler.results().get("b"), Some(&json!(2)));

    let err = scheduler.finish().unwrap_err();
    assert_eq!(err.task_name(), Some("a"));
}

#[test]
fn completions_for_unknown_or_idle_tasks_are_ignored() {
    let a = builders::constant("a", json!(1));
    let b = builders::constant("b", json!(2));
    let graph = graph_of(&[&a, &b], &[("a", "b")]);

    let mut scheduler = Scheduler::new(&graph);
    scheduler.start();

    assert!(scheduler
        .handle_completion("ghost", TaskOutcome::Success(json!(0)))
        .is_empty());
    // b is still pending; a stray completion must not release anything.
    assert!(scheduler
        .handle_completion("b", TaskOutcome::Success(json!(0)))
        .is_empty());
    assert_eq!(scheduler.run_state_of("b"), Some(TaskRunState::Pending));

    let ready = scheduler.handle_completion("a", TaskOutcome::Success(json!(1)));
    assert_eq!(ready.len(), 1);
    assert_eq!(ready[0].name, "b");
}
