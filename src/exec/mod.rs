// src/exec/mod.rs

//! Execution substrates.
//!
//! This module runs scheduled tasks and reports each final outcome back to
//! the orchestration runtime as a `RuntimeEvent`.
//!
//! - [`task_runner`] applies the guard and the retry loop to one dispatch;
//!   both substrates share it.
//! - [`thread_pool`] runs task bodies on Tokio's blocking thread pool.
//! - [`process`] runs each task in a fresh worker process.
//! - [`protocol`] and [`worker`] define and serve the worker side of the
//!   process pool.
//! - [`registry`] resolves task names inside a worker process.
//! - [`backend`] provides the `ExecutorBackend` trait the runtime is written
//!   against, and which tests can replace with a fake implementation.

pub mod backend;
pub mod process;
pub mod protocol;
pub mod registry;
pub mod task_runner;
pub mod thread_pool;
pub mod worker;

pub use backend::ExecutorBackend;
pub use process::{ProcessPoolBackend, WorkerCommand};
pub use protocol::{WorkerMessage, WorkerOutcome, WorkerRequest};
pub use registry::TaskRegistry;
pub use task_runner::run_invocation;
pub use thread_pool::ThreadPoolBackend;
pub use worker::{WORKER_ENV, is_worker_process, serve, serve_stdio};
