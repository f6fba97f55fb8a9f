// src/dag/scheduler_step.rs

//! Step-by-step execution result types for the scheduler.

use crate::dag::task_info::ScheduledTask;
use crate::engine::TaskName;

/// Structured result of a single scheduler "step".
///
/// Tests can drive the scheduler by hand and assert on what each step
/// changed.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    /// Tasks that became ready and must be dispatched.
    pub newly_scheduled: Vec<ScheduledTask>,
    /// Task whose failure halted the run in this step, if any.
    pub newly_failed: Option<TaskName>,
    /// Whether the run reached its end in this step (nothing in flight and
    /// either everything terminal or the run halted).
    pub run_just_finished: bool,
}
