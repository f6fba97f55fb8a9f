// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use crate::dag::{ScheduledTask, Scheduler, SchedulerStep};
use crate::engine::{TaskName, TaskOutcome};
use crate::events::TaskEvent;
use crate::task::Value;

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Send these tasks to the executor (after consulting the cache).
    DispatchTasks(Vec<ScheduledTask>),
    /// Persist a freshly computed result in the cache.
    StoreResult { task: TaskName, value: Value },
    /// Hand a lifecycle event to the sink.
    Emit(TaskEvent),
}

/// Decision returned by the core after handling a single event.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute, in order.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep waiting for completions.
    pub keep_running: bool,
}

/// Release the roots of a fresh run.
pub fn handle_run_start(scheduler: &mut Scheduler) -> CoreStep {
    let step = scheduler.start();
    into_core_step(Vec::new(), step)
}

/// Handle a task completion reported by an executor.
pub fn handle_task_completion(
    scheduler: &mut Scheduler,
    run: &str,
    task: TaskName,
    outcome: TaskOutcome,
) -> CoreStep {
    let mut commands = Vec::new();

    if let TaskOutcome::Success(value) = &outcome {
        commands.push(CoreCommand::StoreResult {
            task: task.clone(),
            value: value.clone(),
        });
    }

    let step = scheduler.step_completion(&task, outcome);
    commands.push(progress_event(scheduler, run));
    into_core_step(commands, step)
}

/// Handle a ready task that was answered from the cache.
pub fn handle_cache_hit(
    scheduler: &mut Scheduler,
    run: &str,
    task: TaskName,
    value: Value,
) -> CoreStep {
    let mut commands = vec![CoreCommand::Emit(TaskEvent::TaskCached { task: task.clone() })];

    let step = scheduler.step_completion(&task, TaskOutcome::Success(value));
    commands.push(progress_event(scheduler, run));
    into_core_step(commands, step)
}

fn progress_event(scheduler: &Scheduler, run: &str) -> CoreCommand {
    CoreCommand::Emit(TaskEvent::RunProgress {
        run: run.to_string(),
        completed: scheduler.completed_count(),
        total: scheduler.total(),
    })
}

fn into_core_step(mut commands: Vec<CoreCommand>, step: SchedulerStep) -> CoreStep {
    if !step.newly_scheduled.is_empty() {
        commands.push(CoreCommand::DispatchTasks(step.newly_scheduled));
    }

    CoreStep {
        commands,
        keep_running: !step.run_just_finished,
    }
}
