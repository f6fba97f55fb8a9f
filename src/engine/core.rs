// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from channels
//! - consulting and filling the result cache
//! - sending `ScheduledTask`s to the executor
//! - forwarding lifecycle events to the sink
//!
//! The core is intended to be extensively unit tested without any Tokio,
//! channels, or worker pools.

use crate::dag::Scheduler;
use crate::engine::RuntimeEvent;
use crate::engine::event_handlers::{
    CoreStep, handle_cache_hit, handle_run_start, handle_task_completion,
};
use crate::errors::Result;
use crate::task::Results;

/// Pure core runtime state.
///
/// This owns the DAG scheduler for exactly one run. It has **no** channels,
/// no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime {
    scheduler: Scheduler,
    run: String,
}

impl CoreRuntime {
    pub fn new(scheduler: Scheduler, run: impl Into<String>) -> Self {
        Self {
            scheduler,
            run: run.into(),
        }
    }

    pub fn run_name(&self) -> &str {
        &self.run
    }

    /// Expose the scheduler (for tests).
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn total(&self) -> usize {
        self.scheduler.total()
    }

    /// Release the roots. Must be called once before any [`CoreRuntime::step`].
    pub fn start(&mut self) -> CoreStep {
        handle_run_start(&mut self.scheduler)
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::TaskCompleted { task, outcome } => {
                handle_task_completion(&mut self.scheduler, &self.run, task, outcome)
            }
            RuntimeEvent::CacheHit { task, value } => {
                handle_cache_hit(&mut self.scheduler, &self.run, task, value)
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.scheduler.is_finished()
    }

    /// Results of the run, or its first failure.
    pub fn finish(self) -> Result<Results> {
        self.scheduler.finish()
    }
}
