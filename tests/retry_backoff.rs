// tests/retry_backoff.rs

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::anyhow;
use serde_json::json;

use taskgraph::errors::TaskgraphError;
use taskgraph::events::TaskEvent;
use taskgraph::task::{RetryPolicy, Task};

use crate::common::{builders, graph_of, options, RecordingSleeper};

fn always_failing(name: &str, retries: u32, max_jitter: f64, calls: &Arc<AtomicUsize>) -> Arc<Task> {
    let calls = Arc::clone(calls);
    Task::builder(name, move |_| {
        calls.fetch_add(1, Ordering::SeqCst);
        Err(anyhow!("still broken"))
    })
    .retries(retries)
    .delay(Duration::from_secs(1))
    .backoff(2.0)
    .max_jitter(max_jitter)
    .build()
    .unwrap()
}

#[test]
fn exhausted_retries_back_off_exponentially() {
    let calls = Arc::new(AtomicUsize::new(0));
    let task = always_failing("t", 3, 0.0, &calls);
    let graph = graph_of(&[&task], &[]);

    let sleeper = Arc::new(RecordingSleeper::new());
    let (opts, sink) = options(1);
    let opts = opts.with_sleeper(sleeper.clone());

    let err = taskgraph::execute(&graph, &opts).unwrap_err();

    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(
        sleeper.delays(),
        vec![
            Duration::from_secs(1),
            Duration::from_secs(2),
            Duration::from_secs(4)
        ]
    );
    match err {
        TaskgraphError::TaskExecution { task, attempts, source } => {
            assert_eq!(task, "t");
            assert_eq!(attempts, 4);
            assert!(source.to_string().contains("still broken"));
        }
        other => panic!("expected TaskExecution, got {other:?}"),
    }

    let events = sink.for_task("t");
    let started: Vec<u32> = events
        .iter()
        .filter_map(|e| match e {
            TaskEvent::TaskStarted { attempt, .. } => Some(*attempt),
            _ => None,
        })
        .collect();
    assert_eq!(started, vec![1, 2, 3, 4]);

    let retrying: Vec<(u32, u64)> = events
        .iter()
        .filter_map(|e| match e {
            TaskEvent::TaskRetrying { attempt, delay_ms, max_retries, .. } => {
                assert_eq!(*max_retries, 3);
                Some((*attempt, *delay_ms))
            }
            _ => None,
        })
        .collect();
    assert_eq!(retrying, vec![(1, 1000), (2, 2000), (3, 4000)]);
    assert!(events.iter().any(|e| matches!(e, TaskEvent::TaskFailed { attempts: 4, .. })));
}

#[test]
fn jitter_stays_within_bounds() {
    let calls = Arc::new(AtomicUsize::new(0));
    let task = always_failing("jittery", 4, 0.5, &calls);
    let graph = graph_of(&[&task], &[]);

    let sleeper = Arc::new(RecordingSleeper::new());
    let (opts, _sink) = options(1);
    let opts = opts.with_sleeper(sleeper.clone());

    taskgraph::execute(&graph, &opts).unwrap_err();

    let delays = sleeper.delays();
    assert_eq!(delays.len(), 4);
    for (i, delay) in delays.iter().enumerate() {
        let base = Duration::from_secs(1 << i);
        assert!(*delay >= base, "retry {i}: {delay:?} < {base:?}");
        assert!(*delay <= base.mul_f64(1.5), "retry {i}: {delay:?} too long");
    }
}

#[test]
fn flaky_task_succeeds_after_retries() {
    let (task, calls) = builders::flaky("flaky", 2, 3, json!("ok"));
    let graph = graph_of(&[&task], &[]);

    let sleeper = Arc::new(RecordingSleeper::new());
    let (opts, sink) = options(1);
    let opts = opts.with_sleeper(sleeper.clone());

    let results = taskgraph::execute(&graph, &opts).unwrap();

    assert_eq!(results["flaky"], json!("ok"));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(sleeper.delays().len(), 2);
    assert!(sink
        .for_task("flaky")
        .iter()
        .any(|e| matches!(e, TaskEvent::TaskSucceeded { attempts: 3, .. })));
}

#[test]
fn no_retries_means_a_single_attempt() {
    let calls = Arc::new(AtomicUsize::new(0));
    let task = builders::failing("once", 0, &calls);
    let graph = graph_of(&[&task], &[]);

    let sleeper = Arc::new(RecordingSleeper::new());
    let (opts, _sink) = options(1);
    let opts = opts.with_sleeper(sleeper.clone());

    let err = taskgraph::execute(&graph, &opts).unwrap_err();
    assert!(matches!(err, TaskgraphError::TaskExecution { attempts: 1, .. }));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(sleeper.delays().is_empty());
}

#[test]
fn panicking_body_is_retried_like_an_error() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let task = Task::builder("panics_once", move |_| {
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            panic!("first attempt explodes");
        }
        Ok(json!(1))
    })
    .retries(1)
    .delay(Duration::from_millis(1))
    .build()
    .unwrap();
    let graph = graph_of(&[&task], &[]);

    let (opts, _sink) = options(1);
    let opts = opts.with_sleeper(Arc::new(RecordingSleeper::new()));

    let results = taskgraph::execute(&graph, &opts).unwrap();
    assert_eq!(results["panics_once"], json!(1));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn policy_computes_delays() {
    let policy = RetryPolicy {
        retries: 3,
        delay: Duration::from_millis(100),
        backoff: 3.0,
        max_jitter: 0.2,
    };
    assert_eq!(policy.max_attempts(), 4);
    assert_close(policy.base_delay(0), Duration::from_millis(100));
    assert_close(policy.base_delay(2), Duration::from_millis(900));
    // Jitter is clamped to max_jitter.
    assert_close(policy.delay_with_jitter(0, 5.0), Duration::from_millis(120));
    assert_close(policy.delay_with_jitter(1, -1.0), Duration::from_millis(300));
}

fn assert_close(actual: Duration, expected: Duration) {
    let diff = actual.abs_diff(expected);
    assert!(diff < Duration::from_micros(1), "{actual:?} != {expected:?}");
}

#[test]
fn huge_backoff_saturates_instead_of_panicking() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let task = Task::builder("t", move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Err(anyhow!("still broken"))
    })
    .retries(2)
    .delay(Duration::from_millis(1))
    .backoff(1e300)
    .max_jitter(0.0)
    .build()
    .unwrap();
    let graph = graph_of(&[&task], &[]);

    let sleeper = Arc::new(RecordingSleeper::new());
    let (opts, sink) = options(1);
    let opts = opts.with_sleeper(sleeper.clone());

    let err = taskgraph::execute(&graph, &opts).unwrap_err();
    assert!(
        matches!(err, TaskgraphError::TaskExecution { attempts: 3, .. }),
        "expected TaskExecution after 3 attempts, got {err:?}"
    );
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(
        sleeper.delays(),
        vec![Duration::from_millis(1), Duration::MAX]
    );
    assert!(sink.for_task("t").iter().any(|e| matches!(
        e,
        TaskEvent::TaskRetrying { attempt: 2, delay_ms: u64::MAX, .. }
    )));

    let policy = RetryPolicy {
        retries: 1,
        delay: Duration::from_secs(1),
        backoff: 1e300,
        max_jitter: 1.0,
    };
    assert_eq!(policy.base_delay(u32::MAX), Duration::MAX);
    assert_eq!(policy.delay_with_jitter(1, 1.0), Duration::MAX);
}

#[test]
fn invalid_policies_are_rejected_at_build_time() {
    let zero_delay = Task::builder("t", |_| Ok(json!(null)))
        .delay(Duration::ZERO)
        .build();
    assert!(matches!(zero_delay, Err(TaskgraphError::InvalidTask { .. })));

    let shrinking = Task::builder("t", |_| Ok(json!(null))).backoff(0.5).build();
    assert!(matches!(shrinking, Err(TaskgraphError::InvalidTask { .. })));

    let wild_jitter = Task::builder("t", |_| Ok(json!(null))).max_jitter(1.5).build();
    assert!(matches!(wild_jitter, Err(TaskgraphError::InvalidTask { .. })));

    let unnamed = Task::new("  ", |_| Ok(json!(null)));
    assert!(matches!(unnamed, Err(TaskgraphError::InvalidTask { .. })));
}
