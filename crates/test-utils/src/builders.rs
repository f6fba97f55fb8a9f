//! Canned tasks for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::anyhow;
use serde_json::{json, Value};
use taskgraph::task::Task;

/// A task that always returns `value`.
pub fn constant(name: &str, value: Value) -> Arc<Task> {
    Task::new(name, move |_| Ok(value.clone())).expect("valid task")
}

/// A task that returns its own name and counts invocations.
pub fn counting(name: &str, calls: &Arc<AtomicUsize>) -> Arc<Task> {
    let calls = Arc::clone(calls);
    let own = name.to_string();
    Task::new(name, move |_| {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!(own))
    })
    .expect("valid task")
}

/// A task that fails on every attempt, counting invocations.
pub fn failing(name: &str, retries: u32, calls: &Arc<AtomicUsize>) -> Arc<Task> {
    let calls = Arc::clone(calls);
    Task::builder(name, move |_| {
        let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
        Err(anyhow!("boom #{n}"))
    })
    .retries(retries)
    .delay(Duration::from_millis(1))
    .max_jitter(0.0)
    .build()
    .expect("valid task")
}

/// A task that fails `failures` times, then returns `value`.
pub fn flaky(name: &str, failures: usize, retries: u32, value: Value) -> (Arc<Task>, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let task = Task::builder(name, move |_| {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        if n < failures {
            Err(anyhow!("transient failure {}", n + 1))
        } else {
            Ok(value.clone())
        }
    })
    .retries(retries)
    .delay(Duration::from_millis(1))
    .max_jitter(0.0)
    .build()
    .expect("valid task");
    (task, calls)
}

/// A task that blocks for `duration`, then returns its own name.
pub fn sleepy(name: &str, duration: Duration) -> Arc<Task> {
    let own = name.to_string();
    Task::new(name, move |_| {
        std::thread::sleep(duration);
        Ok(json!(own))
    })
    .expect("valid task")
}

/// Start and finish instants of task bodies, shared by [`Timeline::task`].
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    spans: Arc<Mutex<Vec<Span>>>,
    running: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

#[derive(Debug, Clone)]
pub struct Span {
    pub task: String,
    pub start: Instant,
    pub end: Instant,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// A task that records when its body runs, holding the slot for `hold`.
    pub fn task(&self, name: &str, hold: Duration) -> Arc<Task> {
        let timeline = self.clone();
        let own = name.to_string();
        Task::new(name, move |_| {
            let now_running = timeline.running.fetch_add(1, Ordering::SeqCst) + 1;
            timeline.peak.fetch_max(now_running, Ordering::SeqCst);
            let start = Instant::now();
            std::thread::sleep(hold);
            let end = Instant::now();
            timeline.running.fetch_sub(1, Ordering::SeqCst);
            timeline.spans.lock().unwrap().push(Span {
                task: own.clone(),
                start,
                end,
            });
            Ok(json!(own))
        })
        .expect("valid task")
    }

    pub fn spans(&self) -> Vec<Span> {
        self.spans.lock().unwrap().clone()
    }

    pub fn span(&self, task: &str) -> Option<Span> {
        self.spans().into_iter().find(|s| s.task == task)
    }

    /// Highest number of bodies observed running at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}
