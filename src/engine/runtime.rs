// src/engine/runtime.rs

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use anyhow::anyhow;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cache::{CacheKeyFn, ResultCache};
use crate::dag::ScheduledTask;
use crate::errors::{Result, TaskgraphError};
use crate::events::{EventSink, TaskEvent};
use crate::exec::ExecutorBackend;
use crate::task::Results;

use super::core::CoreRuntime;
use super::{CoreCommand, CoreStep, RuntimeEvent, TaskName};

/// Drives the DAG scheduler in response to `RuntimeEvent`s,
/// and delegates actual task execution to an `ExecutorBackend`.
///
/// This is a pure IO shell around `CoreRuntime`, which contains all the
/// runtime semantics. This struct handles async IO: reading completions from
/// the channel, consulting the cache, and dispatching tasks to the executor.
/// It is the only place run state is mutated.
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
    sink: Arc<dyn EventSink>,
    cache: Option<Arc<dyn ResultCache>>,
    cache_key: Option<CacheKeyFn>,
    /// Keys computed at dispatch, used when the result comes back.
    pending_keys: HashMap<TaskName, String>,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("cache", &self.cache.is_some())
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(
        core: CoreRuntime,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        executor: E,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            core,
            event_rx,
            executor,
            sink,
            cache: None,
            cache_key: None,
            pending_keys: HashMap::new(),
        }
    }

    pub fn with_cache(mut self, cache: Option<Arc<dyn ResultCache>>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_cache_key(mut self, cache_key: Option<CacheKeyFn>) -> Self {
        self.cache_key = cache_key;
        self
    }

    /// Main event loop.
    ///
    /// - Releases the roots.
    /// - Consumes `RuntimeEvent`s from `event_rx` until the core reports the
    ///   run finished.
    /// - Executes commands returned by the core (dispatch, cache, events).
    pub async fn run(mut self) -> Result<Results> {
        let started = Instant::now();
        let run = self.core.run_name().to_string();
        let total = self.core.total();

        info!(run = %run, total, "runtime started");
        self.sink.emit(&TaskEvent::RunStarted {
            run: run.clone(),
            total,
        });

        let step = self.core.start();
        let mut keep_running = self.execute_step(step).await?;

        while keep_running {
            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    let in_flight = self.core.scheduler().in_flight();
                    return Err(TaskgraphError::Other(anyhow!(
                        "runtime event channel closed with {in_flight} task(s) in flight"
                    )));
                }
            };

            debug!(?event, "runtime received event");
            let step = self.core.step(event);
            keep_running = self.execute_step(step).await?;
        }

        let result = self.core.finish();
        match &result {
            Ok(results) => {
                info!(run = %run, results = results.len(), "runtime finished");
                self.sink.emit(&TaskEvent::RunCompleted {
                    run,
                    total,
                    duration_ms: started.elapsed().as_millis() as u64,
                });
            }
            Err(err) => {
                self.sink.emit(&TaskEvent::RunFailed {
                    run,
                    task: err.task_name().unwrap_or_default().to_string(),
                    error: err.to_string(),
                });
            }
        }
        result
    }

    /// Execute the commands of one step. Cache hits are fed back into the
    /// core immediately, so a single step can cascade.
    ///
    /// Returns whether the loop should keep waiting for completions.
    async fn execute_step(&mut self, step: CoreStep) -> Result<bool> {
        let mut keep_running = step.keep_running;
        let mut queue: VecDeque<CoreCommand> = step.commands.into();

        while let Some(command) = queue.pop_front() {
            match command {
                CoreCommand::DispatchTasks(tasks) => {
                    let mut to_run = Vec::with_capacity(tasks.len());
                    for task in tasks {
                        match self.cached(&task) {
                            Some(value) => {
                                let next = self.core.step(RuntimeEvent::CacheHit {
                                    task: task.name,
                                    value,
                                });
                                keep_running = next.keep_running;
                                queue.extend(next.commands);
                            }
                            None => to_run.push(task),
                        }
                    }
                    self.spawn_ready(to_run).await?;
                }
                CoreCommand::StoreResult { task, value } => {
                    let key = self.pending_keys.remove(&task).unwrap_or_else(|| task.clone());
                    if let Some(cache) = &self.cache {
                        if let Err(e) = cache.put(&key, &value) {
                            warn!(task = %task, error = %e, "failed to store result in cache");
                        }
                    }
                }
                CoreCommand::Emit(event) => self.sink.emit(&event),
            }
        }

        Ok(keep_running)
    }

    fn cached(&mut self, task: &ScheduledTask) -> Option<crate::task::Value> {
        let cache = self.cache.as_ref()?;
        let key = match &self.cache_key {
            Some(key_fn) => key_fn(&task.name, &task.inputs),
            None => task.name.clone(),
        };
        let hit = match cache.get(&key) {
            Ok(hit) => hit,
            Err(e) => {
                warn!(task = %task.name, error = %e, "cache lookup failed; running task");
                None
            }
        };
        if hit.is_none() {
            self.pending_keys.insert(task.name.clone(), key);
        }
        hit
    }

    async fn spawn_ready(&mut self, tasks: Vec<ScheduledTask>) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }

        let names: Vec<_> = tasks.iter().map(|t| t.name.as_str()).collect();
        debug!(?names, "spawning ready tasks");

        self.executor.spawn_ready_tasks(tasks).await
    }
}
