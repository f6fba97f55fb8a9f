// src/exec/worker.rs

//! Worker side of the process pool.
//!
//! A binary that may act as a worker checks [`is_worker_process`] first
//! thing in `main` and, if set, calls [`serve_stdio`] with a registry holding
//! the same tasks the parent's graph uses.

use std::io::{BufRead, Write};
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::dag::ScheduledTask;
use crate::engine::TaskOutcome;
use crate::errors::{Result, TaskgraphError};
use crate::events::{EventSink, TaskEvent};
use crate::exec::protocol::{WorkerMessage, WorkerOutcome, WorkerRequest};
use crate::exec::registry::TaskRegistry;
use crate::exec::task_runner::run_invocation;
use crate::task::ThreadSleeper;

/// Environment variable set on every worker process.
pub const WORKER_ENV: &str = "TASKGRAPH_WORKER";

pub fn is_worker_process() -> bool {
    std::env::var_os(WORKER_ENV).is_some_and(|v| v == "1")
}

/// Serve one request from stdin, answering on stdout.
pub fn serve_stdio(registry: &TaskRegistry) -> Result<()> {
    let stdin = std::io::stdin();
    serve(registry, stdin.lock(), std::io::stdout())
}

/// Read one [`WorkerRequest`] line from `reader`, run it, and write the
/// event stream and the final outcome to `writer`.
///
/// Requests that cannot be served (bad JSON, unknown task) are answered with
/// [`WorkerOutcome::Rejected`]; only I/O failures on the pipes are errors.
pub fn serve<R, W>(registry: &TaskRegistry, mut reader: R, writer: W) -> Result<()>
where
    R: BufRead,
    W: Write + Send,
{
    let sink = MessageSink {
        out: Mutex::new(writer),
    };

    let mut line = String::new();
    reader.read_line(&mut line)?;

    let request: WorkerRequest = match serde_json::from_str(line.trim_end()) {
        Ok(req) => req,
        Err(e) => {
            warn!(error = %e, "malformed worker request");
            return sink.write(&WorkerMessage::Outcome(WorkerOutcome::Rejected {
                message: format!("malformed request: {e}"),
            }));
        }
    };

    let Some(task) = registry.get(&request.task) else {
        warn!(task = %request.task, "task not found in worker registry");
        return sink.write(&WorkerMessage::Outcome(WorkerOutcome::Rejected {
            message: format!("unknown task '{}' in worker registry", request.task),
        }));
    };

    debug!(task = %request.task, "worker serving request");

    let scheduled = ScheduledTask {
        name: request.task,
        task,
        inputs: request.inputs,
        guard_value: request.guard_value,
    };

    let outcome = match run_invocation(&scheduled, &ThreadSleeper, &sink) {
        TaskOutcome::Success(value) => WorkerOutcome::Success { value },
        TaskOutcome::Skipped { reason } => WorkerOutcome::Skipped { reason },
        TaskOutcome::Failed(TaskgraphError::TaskExecution {
            attempts, source, ..
        }) => WorkerOutcome::Failed {
            attempts,
            error: format!("{source:#}"),
        },
        TaskOutcome::Failed(other) => WorkerOutcome::Rejected {
            message: other.to_string(),
        },
    };

    sink.write(&WorkerMessage::Outcome(outcome))
}

/// Frames lifecycle events as [`WorkerMessage::Event`] lines.
struct MessageSink<W> {
    out: Mutex<W>,
}

impl<W: Write + Send> MessageSink<W> {
    fn write(&self, message: &WorkerMessage) -> Result<()> {
        let mut out = match self.out.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        serde_json::to_writer(&mut *out, message).map_err(std::io::Error::from)?;
        writeln!(out)?;
        out.flush()?;
        Ok(())
    }
}

impl<W: Write + Send> EventSink for MessageSink<W> {
    fn emit(&self, event: &TaskEvent) {
        if let Err(e) = self.write(&WorkerMessage::Event(event.clone())) {
            warn!(error = %e, "failed to forward event to parent");
        }
    }
}
