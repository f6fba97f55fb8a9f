// src/cache/mod.rs

//! Result caching.
//!
//! The runtime consults a [`ResultCache`] before dispatching a ready task
//! and stores every freshly computed result after success. Keys are task
//! names unless a [`CacheKeyFn`] is configured; [`inputs_key`] also folds in
//! the injected inputs so a result is reused only while its upstream values
//! are unchanged. Entries may carry a time-to-live; an expired entry behaves
//! as if it were absent.
//!
//! - [`MemoryCache`] keeps entries for the lifetime of the process.
//! - [`FileCache`] persists entries as a JSON document so a later process can
//!   skip work that already succeeded.

mod entry;
pub mod file;
pub mod memory;

use std::sync::Arc;

pub use entry::{CacheEntry, CacheTable};
pub use file::{CACHE_FORMAT_VERSION, FileCache};
pub use memory::MemoryCache;

use crate::errors::Result;
use crate::task::{Inputs, Value};

/// Derives the cache key of a ready task from its name and injected inputs.
pub type CacheKeyFn = Arc<dyn Fn(&str, &Inputs) -> String + Send + Sync>;

/// Task name plus the JSON encoding of its inputs.
pub fn inputs_key(task: &str, inputs: &Inputs) -> String {
    match serde_json::to_string(inputs) {
        Ok(encoded) => format!("{task}#{encoded}"),
        Err(_) => task.to_string(),
    }
}

/// Storage for task results, shared across worker threads.
pub trait ResultCache: Send + Sync {
    /// The cached result for `task`, unless absent or expired.
    fn get(&self, task: &str) -> Result<Option<Value>>;
    /// Store `value` under `task` with the cache's default TTL.
    fn put(&self, task: &str, value: &Value) -> Result<()>;
}

impl<T: ResultCache + ?Sized> ResultCache for Arc<T> {
    fn get(&self, task: &str) -> Result<Option<Value>> {
        (**self).get(task)
    }

    fn put(&self, task: &str, value: &Value) -> Result<()> {
        (**self).put(task, value)
    }
}
