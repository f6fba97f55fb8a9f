// src/exec/thread_pool.rs

//! Worker-thread substrate.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, error};

use crate::dag::ScheduledTask;
use crate::engine::{RuntimeEvent, TaskOutcome};
use crate::errors::{Result, TaskgraphError};
use crate::events::EventSink;
use crate::exec::backend::ExecutorBackend;
use crate::exec::task_runner::run_invocation;
use crate::task::Sleeper;

/// Runs task bodies on Tokio's blocking thread pool, at most `capacity` at a
/// time. Tasks dispatched beyond capacity wait for a free slot.
pub struct ThreadPoolBackend {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    slots: Arc<Semaphore>,
    sleeper: Arc<dyn Sleeper>,
    sink: Arc<dyn EventSink>,
}

impl ThreadPoolBackend {
    pub fn new(
        runtime_tx: mpsc::Sender<RuntimeEvent>,
        capacity: usize,
        sleeper: Arc<dyn Sleeper>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        debug!(capacity, "thread pool backend created");
        Self {
            runtime_tx,
            slots: Arc::new(Semaphore::new(capacity.max(1))),
            sleeper,
            sink,
        }
    }
}

impl ExecutorBackend for ThreadPoolBackend {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        for task in tasks {
            let runtime_tx = self.runtime_tx.clone();
            let slots = Arc::clone(&self.slots);
            let sleeper = Arc::clone(&self.sleeper);
            let sink = Arc::clone(&self.sink);

            tokio::spawn(async move {
                let name = task.name.clone();
                let outcome = run_on_thread(task, slots, sleeper, sink).await;
                if runtime_tx
                    .send(RuntimeEvent::TaskCompleted {
                        task: name.clone(),
                        outcome,
                    })
                    .await
                    .is_err()
                {
                    debug!(task = %name, "runtime gone; dropping task completion");
                }
            });
        }

        Box::pin(async { Ok::<(), TaskgraphError>(()) })
    }
}

async fn run_on_thread(
    task: ScheduledTask,
    slots: Arc<Semaphore>,
    sleeper: Arc<dyn Sleeper>,
    sink: Arc<dyn EventSink>,
) -> TaskOutcome {
    let name = task.name.clone();

    let _permit = match slots.acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => {
            return TaskOutcome::Failed(TaskgraphError::Worker {
                task: name,
                message: "worker pool closed".to_string(),
            });
        }
    };

    debug!(task = %name, "worker slot acquired");

    let joined =
        tokio::task::spawn_blocking(move || run_invocation(&task, sleeper.as_ref(), sink.as_ref()))
            .await;

    match joined {
        Ok(outcome) => outcome,
        Err(join_err) => {
            error!(task = %name, error = %join_err, "worker thread crashed");
            TaskOutcome::Failed(TaskgraphError::Worker {
                task: name,
                message: format!("worker thread crashed: {join_err}"),
            })
        }
    }
}
