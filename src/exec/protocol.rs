// src/exec/protocol.rs

//! Wire format between the process pool and its workers.
//!
//! The parent writes one [`WorkerRequest`] as a JSON line on the worker's
//! stdin and closes it. The worker answers on stdout with any number of
//! [`WorkerMessage::Event`] lines followed by exactly one
//! [`WorkerMessage::Outcome`]. Lines that are not valid messages are treated
//! as task output.

use serde::{Deserialize, Serialize};

use crate::events::TaskEvent;
use crate::task::{Inputs, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerRequest {
    /// Name the worker resolves in its [`crate::exec::TaskRegistry`].
    pub task: String,
    #[serde(default)]
    pub inputs: Inputs,
    #[serde(default)]
    pub guard_value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum WorkerMessage {
    Event(TaskEvent),
    Outcome(WorkerOutcome),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WorkerOutcome {
    Success { value: Value },
    Skipped { reason: String },
    /// The task body exhausted its retries.
    Failed { attempts: u32, error: String },
    /// The worker could not run the request at all.
    Rejected { message: String },
}
