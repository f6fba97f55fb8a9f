use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use serde_json::json;
use tokio::sync::mpsc;
use taskgraph::dag::ScheduledTask;
use taskgraph::engine::{RuntimeEvent, TaskOutcome};
use taskgraph::errors::Result;
use taskgraph::exec::ExecutorBackend;

type OutcomeFn = dyn Fn(&ScheduledTask) -> TaskOutcome + Send + Sync;

/// A fake executor that:
/// - records which tasks were dispatched, with their injected inputs
/// - never runs task bodies
/// - immediately reports an outcome for each scheduled task (by default
///   `Success` carrying the task name).
pub struct FakeExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    dispatched: Arc<Mutex<Vec<ScheduledTask>>>,
    outcome: Arc<OutcomeFn>,
}

impl FakeExecutor {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self {
            runtime_tx,
            dispatched: Arc::new(Mutex::new(Vec::new())),
            outcome: Arc::new(|t: &ScheduledTask| TaskOutcome::Success(json!(t.name))),
        }
    }

    /// Decide each outcome with `f` instead.
    pub fn with_outcome<F>(mut self, f: F) -> Self
    where
        F: Fn(&ScheduledTask) -> TaskOutcome + Send + Sync + 'static,
    {
        self.outcome = Arc::new(f);
        self
    }

    /// Handle to the dispatch log; stays valid after the executor moves into
    /// a runtime.
    pub fn dispatched(&self) -> Arc<Mutex<Vec<ScheduledTask>>> {
        Arc::clone(&self.dispatched)
    }
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let dispatched = Arc::clone(&self.dispatched);
        let outcome = Arc::clone(&self.outcome);

        Box::pin(async move {
            for t in tasks {
                let result = outcome(&t);
                let name = t.name.clone();
                dispatched.lock().unwrap().push(t);

                tx.send(RuntimeEvent::TaskCompleted {
                    task: name,
                    outcome: result,
                })
                .await
                .map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }
}
