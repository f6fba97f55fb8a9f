use std::sync::Mutex;
use std::time::Duration;

use taskgraph::events::{EventSink, TaskEvent};
use taskgraph::task::Sleeper;

/// Keeps every emitted event in order.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<TaskEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TaskEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Events about `task`, in order.
    pub fn for_task(&self, task: &str) -> Vec<TaskEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.task() == Some(task))
            .collect()
    }

    pub fn skipped(&self) -> Vec<(String, String)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                TaskEvent::TaskSkipped { task, reason } => Some((task, reason)),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for CollectingSink {
    fn emit(&self, event: &TaskEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Records requested delays instead of sleeping.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}
