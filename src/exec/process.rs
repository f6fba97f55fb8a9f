// src/exec/process.rs

//! Isolated-process substrate.

use std::ffi::OsString;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;

use anyhow::anyhow;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, error, info, warn};

use crate::dag::ScheduledTask;
use crate::engine::{RuntimeEvent, TaskOutcome};
use crate::errors::{Result, TaskgraphError};
use crate::events::EventSink;
use crate::exec::backend::ExecutorBackend;
use crate::exec::protocol::{WorkerMessage, WorkerOutcome, WorkerRequest};
use crate::exec::worker::WORKER_ENV;

/// Program (plus arguments) started once per process-pool task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl WorkerCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// The currently running executable, which must serve worker requests
    /// when started with [`WORKER_ENV`] set.
    pub fn current_exe() -> Result<Self> {
        Ok(Self::new(std::env::current_exe()?))
    }
}

/// Runs every task in a fresh worker process, at most `capacity` at a time.
pub struct ProcessPoolBackend {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    slots: Arc<Semaphore>,
    command: Arc<WorkerCommand>,
    sink: Arc<dyn EventSink>,
}

impl ProcessPoolBackend {
    pub fn new(
        runtime_tx: mpsc::Sender<RuntimeEvent>,
        capacity: usize,
        command: WorkerCommand,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        debug!(capacity, program = %command.program.display(), "process pool backend created");
        Self {
            runtime_tx,
            slots: Arc::new(Semaphore::new(capacity.max(1))),
            command: Arc::new(command),
            sink,
        }
    }
}

impl ExecutorBackend for ProcessPoolBackend {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        for task in tasks {
            let runtime_tx = self.runtime_tx.clone();
            let slots = Arc::clone(&self.slots);
            let command = Arc::clone(&self.command);
            let sink = Arc::clone(&self.sink);

            tokio::spawn(async move {
                let name = task.name.clone();
                let outcome = match slots.acquire_owned().await {
                    Ok(_permit) => run_in_process(&command, task, sink.as_ref()).await,
                    Err(_) => TaskOutcome::Failed(TaskgraphError::Worker {
                        task: name.clone(),
                        message: "worker pool closed".to_string(),
                    }),
                };
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

/// Run one task in a worker process and translate its reply.
///
/// Infrastructure problems (spawn failure, broken pipe, a worker that exits
/// without an outcome) become [`TaskgraphError::Worker`]; they are fatal and
/// never retried.
pub async fn run_in_process(
    command: &WorkerCommand,
    task: ScheduledTask,
    sink: &dyn EventSink,
) -> TaskOutcome {
    let name = task.name.clone();
    match run_in_process_inner(command, task, sink).await {
        Ok(outcome) => outcome,
        Err(err) => {
            error!(task = %name, error = %err, "worker process error");
            TaskOutcome::Failed(err)
        }
    }
}

async fn run_in_process_inner(
    command: &WorkerCommand,
    task: ScheduledTask,
    sink: &dyn EventSink,
) -> Result<TaskOutcome> {
    let worker_err = |message: String| TaskgraphError::Worker {
        task: task.name.clone(),
        message,
    };

    let request = WorkerRequest {
        task: task.name.clone(),
        inputs: task.inputs.clone(),
        guard_value: task.guard_value.clone(),
    };
    let mut line = serde_json::to_string(&request).map_err(|source| {
        TaskgraphError::Serialization {
            task: task.name.clone(),
            source,
        }
    })?;
    line.push('\n');

    info!(task = %task.name, program = %command.program.display(), "starting worker process");

    let mut child = Command::new(&command.program)
        .args(&command.args)
        .env(WORKER_ENV, "1")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| worker_err(format!("spawning worker process: {e}")))?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| worker_err("worker stdin unavailable".to_string()))?;
    stdin
        .write_all(line.as_bytes())
        .await
        .map_err(|e| worker_err(format!("writing request to worker: {e}")))?;
    drop(stdin);

    // Always consume stderr so buffers don't fill; log at debug.
    if let Some(stderr) = child.stderr.take() {
        let task_name = task.name.clone();
        tokio::spawn(async move {
            let reader = BufReader::new(stderr);
            let mut lines = reader.lines();

            while let Ok(Some(line)) = lines.next_line().await {
                debug!(task = %task_name, "worker stderr: {}", line);
            }
        });
    }

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| worker_err("worker stdout unavailable".to_string()))?;
    let mut lines = BufReader::new(stdout).lines();
    let mut outcome: Option<WorkerOutcome> = None;

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| worker_err(format!("reading worker output: {e}")))?
    {
        match serde_json::from_str::<WorkerMessage>(&line) {
            Ok(WorkerMessage::Event(event)) => sink.emit(&event),
            Ok(WorkerMessage::Outcome(o)) => {
                if outcome.is_some() {
                    warn!(task = %task.name, "worker reported more than one outcome; keeping the first");
                } else {
                    outcome = Some(o);
                }
            }
            Err(_) => debug!(task = %task.name, "worker stdout: {}", line),
        }
    }

    let status = child
        .wait()
        .await
        .map_err(|e| worker_err(format!("waiting for worker process: {e}")))?;

    debug!(task = %task.name, exit_code = status.code().unwrap_or(-1), "worker process exited");

    let Some(outcome) = outcome else {
        return Err(worker_err(format!(
            "worker exited ({status}) without reporting an outcome"
        )));
    };

    Ok(match outcome {
        WorkerOutcome::Success { value } => TaskOutcome::Success(value),
        WorkerOutcome::Skipped { reason } => TaskOutcome::Skipped { reason },
        WorkerOutcome::Failed { attempts, error } => {
            TaskOutcome::Failed(TaskgraphError::TaskExecution {
                task: task.name.clone(),
                attempts,
                source: anyhow!(error),
            })
        }
        WorkerOutcome::Rejected { message } => TaskOutcome::Failed(worker_err(message)),
    })
}
