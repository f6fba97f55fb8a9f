// src/exec/task_runner.rs

//! Per-dispatch task runner shared by every substrate.

use tracing::debug;

use crate::dag::ScheduledTask;
use crate::engine::TaskOutcome;
use crate::events::{EventSink, TaskEvent};
use crate::task::{Sleeper, run_with_retry};

/// Skip reason when the first dependency produced no value.
pub const NO_UPSTREAM_DATA: &str = "no upstream data";
/// Skip reason when the guard returned `false`.
pub const CONDITION_NOT_MET: &str = "condition not met";

/// Run one scheduled task to its final outcome: evaluate the guard, then
/// drive the retry loop. Blocks the calling thread for the whole duration,
/// including backoff sleeps.
pub fn run_invocation(
    scheduled: &ScheduledTask,
    sleeper: &dyn Sleeper,
    sink: &dyn EventSink,
) -> TaskOutcome {
    let task = &scheduled.task;

    if task.has_guard() {
        let skip = match &scheduled.guard_value {
            None => Some(NO_UPSTREAM_DATA),
            Some(value) if !task.check_guard(value) => Some(CONDITION_NOT_MET),
            Some(_) => None,
        };

        if let Some(reason) = skip {
            debug!(task = %scheduled.name, reason, "guard rejected task");
            sink.emit(&TaskEvent::TaskSkipped {
                task: scheduled.name.clone(),
                reason: reason.to_string(),
            });
            return TaskOutcome::Skipped {
                reason: reason.to_string(),
            };
        }
    }

    match run_with_retry(task, &scheduled.inputs, sleeper, sink) {
        Ok((value, _attempts)) => TaskOutcome::Success(value),
        Err(err) => TaskOutcome::Failed(err),
    }
}
