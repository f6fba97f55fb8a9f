// src/engine/options.rs

use std::fmt;
use std::sync::Arc;

use crate::cache::{CacheKeyFn, ResultCache};
use crate::events::{EventSink, TracingSink};
use crate::exec::WorkerCommand;
use crate::task::{Inputs, Sleeper, ThreadSleeper};
use crate::types::{ExecutorKind, MaxWorkers};

/// Everything one `execute` call needs besides the graph.
#[derive(Clone)]
pub struct RunOptions {
    /// Run name used in lifecycle events.
    pub name: String,
    pub max_workers: MaxWorkers,
    pub executor: ExecutorKind,
    pub sink: Arc<dyn EventSink>,
    pub cache: Option<Arc<dyn ResultCache>>,
    /// Cache key of a ready task. `None` keys on the task name.
    pub cache_key: Option<CacheKeyFn>,
    /// Used between retry attempts on the thread pool. Process workers
    /// always sleep for real.
    pub sleeper: Arc<dyn Sleeper>,
    /// Program started for each process-pool task. Defaults to the current
    /// executable.
    pub worker: Option<WorkerCommand>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            name: "workflow".to_string(),
            max_workers: MaxWorkers::Default,
            executor: ExecutorKind::Thread,
            sink: Arc::new(TracingSink),
            cache: None,
            cache_key: None,
            sleeper: Arc::new(ThreadSleeper),
            worker: None,
        }
    }
}

impl RunOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_max_workers(mut self, max_workers: MaxWorkers) -> Self {
        self.max_workers = max_workers;
        self
    }

    pub fn with_executor(mut self, executor: ExecutorKind) -> Self {
        self.executor = executor;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn ResultCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_cache_key<F>(mut self, key: F) -> Self
    where
        F: Fn(&str, &Inputs) -> String + Send + Sync + 'static,
    {
        self.cache_key = Some(Arc::new(key));
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_worker(mut self, worker: WorkerCommand) -> Self {
        self.worker = Some(worker);
        self
    }

    /// Effective pool capacity for the configured substrate.
    pub fn capacity(&self) -> usize {
        self.max_workers.resolve(self.executor)
    }
}

impl fmt::Debug for RunOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunOptions")
            .field("name", &self.name)
            .field("max_workers", &self.max_workers)
            .field("executor", &self.executor)
            .field("cache", &self.cache.is_some())
            .field("cache_key", &self.cache_key.is_some())
            .field("worker", &self.worker)
            .finish_non_exhaustive()
    }
}
