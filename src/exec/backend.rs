// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of a concrete pool.
//! Both substrates implement it with identical semantics:
//!
//! - [`crate::exec::ThreadPoolBackend`] runs task bodies on worker threads.
//! - [`crate::exec::ProcessPoolBackend`] runs each task in a worker process.
//!
//! Tests can provide their own `ExecutorBackend` that, for example, records
//! which tasks were scheduled and directly emits `TaskCompleted` events.

use std::future::Future;
use std::pin::Pin;

use crate::dag::ScheduledTask;
use crate::errors::Result;

/// Trait abstracting how scheduled tasks are executed.
///
/// Every dispatched task must eventually produce exactly one
/// `RuntimeEvent::TaskCompleted` on the runtime channel, or the run never
/// finishes.
pub trait ExecutorBackend: Send {
    /// Dispatch the given tasks for execution.
    ///
    /// Implementations must not wait for the tasks to finish; tasks beyond
    /// the pool capacity queue inside the backend.
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}
