// src/dag/scheduler.rs

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::dag::graph::DagGraph;
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::state_manager::{ReadOnlyStateManager, StateManager};
use crate::dag::task_info::{ScheduledTask, TaskInfo, TaskRunState};
use crate::engine::{TaskName, TaskOutcome};
use crate::errors::{Result, TaskgraphError};
use crate::task::{Results, Value};

/// Scheduler holds a validated DAG plus the state of a single run.
///
/// It is responsible for:
/// - releasing the roots when the run starts
/// - counting down each task's unfinished dependencies (indegree)
/// - resolving injected inputs and the guard value when a task becomes ready
/// - recording results, and halting dispatch on the first failure
///
/// The scheduler performs no I/O; executors report back through
/// [`Scheduler::handle_completion`] and dispatch whatever it returns.
#[derive(Debug)]
pub struct Scheduler {
    graph: DagGraph,
    tasks: HashMap<TaskName, TaskInfo>,
    results: Results,
    started: bool,
    /// Set on the first failure; nothing new is released afterwards.
    halted: bool,
    failure: Option<TaskgraphError>,
}

impl Scheduler {
    /// Build a scheduler for one run of `graph`. The graph must already have
    /// passed [`crate::dag::validate`].
    pub fn new(graph: &DagGraph) -> Self {
        let graph = graph.clone();
        let mut tasks = HashMap::with_capacity(graph.len());

        for name in graph.tasks() {
            let Some(task) = graph.task(name) else {
                continue;
            };
            let deps = graph.dependencies_of(name).to_vec();
            tasks.insert(name.to_string(), TaskInfo::new(task.clone(), deps));
        }

        Self {
            graph,
            tasks,
            results: Results::new(),
            started: false,
            halted: false,
            failure: None,
        }
    }

    /// Release every task without dependencies, in graph insertion order.
    ///
    /// Calling this twice is a no-op the second time. For an empty graph the
    /// returned step already reports the run as finished.
    pub fn start(&mut self) -> SchedulerStep {
        let mut step = SchedulerStep::default();
        if self.started {
            warn!("scheduler already started; ignoring");
            return step;
        }
        self.started = true;

        if self.graph.is_empty() {
            warn!("graph has no tasks; nothing to run");
        } else {
            let roots: Vec<TaskName> = self.graph.roots().map(str::to_string).collect();
            debug!(roots = ?roots, "releasing root tasks");

            let mut manager = StateManager::new(&self.graph, &mut self.tasks, &self.results);
            step.newly_scheduled = manager.schedule(roots);
        }

        step.run_just_finished = self.is_finished();
        step
    }

    /// Handle the final outcome of a task (production API).
    pub fn handle_completion(&mut self, task: &str, outcome: TaskOutcome) -> Vec<ScheduledTask> {
        self.step_completion(task, outcome).newly_scheduled
    }

    /// Manual-step variant of `handle_completion` that returns a rich [`SchedulerStep`].
    pub fn step_completion(&mut self, task: &str, outcome: TaskOutcome) -> SchedulerStep {
        let mut step = SchedulerStep::default();

        let Some(info) = self.tasks.get(task) else {
            warn!(task = %task, "completion for unknown task; ignoring");
            return step;
        };
        if info.run_state != TaskRunState::Running {
            warn!(
                task = %task,
                state = ?info.run_state,
                "completion for task that is not running; ignoring"
            );
            return step;
        }

        let released = match outcome {
            TaskOutcome::Success(value) => {
                self.record_result(task, value);
                self.set_state(task, TaskRunState::Succeeded);
                debug!(task = %task, "task completed successfully");
                true
            }
            TaskOutcome::Skipped { reason } => {
                self.set_state(task, TaskRunState::Skipped);
                debug!(task = %task, reason = %reason, "task skipped");
                true
            }
            TaskOutcome::Failed(err) => {
                self.set_state(task, TaskRunState::Failed);
                if self.failure.is_none() {
                    warn!(
                        task = %task,
                        error = %err,
                        "task failed; halting dispatch of new tasks"
                    );
                    self.halted = true;
                    self.failure = Some(err);
                    step.newly_failed = Some(task.to_string());
                } else {
                    warn!(
                        task = %task,
                        error = %err,
                        "task failed after the run already halted"
                    );
                }
                false
            }
        };

        if released {
            let mut manager = StateManager::new(&self.graph, &mut self.tasks, &self.results);
            let ready = manager.release_dependents(task);
            if self.halted {
                if !ready.is_empty() {
                    debug!(held = ?ready, "run halted; not dispatching ready tasks");
                }
            } else {
                step.newly_scheduled = manager.schedule(ready);
            }
        }

        step.run_just_finished = self.is_finished();
        if step.run_just_finished {
            info!(
                completed = self.completed_count(),
                total = self.tasks.len(),
                halted = self.halted,
                "scheduler: run finished"
            );
        }

        step
    }

    fn record_result(&mut self, task: &str, value: Value) {
        if self.results.contains_key(task) {
            warn!(task = %task, "result already recorded; keeping the first one");
            return;
        }
        self.results.insert(task.to_string(), value);
    }

    fn set_state(&mut self, task: &str, state: TaskRunState) {
        let mut manager = StateManager::new(&self.graph, &mut self.tasks, &self.results);
        manager.set_state(task, state);
    }

    /// Read-only view of the given task's run state.
    pub fn run_state_of(&self, task: &str) -> Option<TaskRunState> {
        self.tasks.get(task).map(|info| info.run_state)
    }

    /// Whether every dependency of `task` reached `Succeeded` or `Skipped`.
    ///
    /// Returns `None` if the task is unknown.
    pub fn deps_satisfied(&self, task: &str) -> Option<bool> {
        let info = self.tasks.get(task)?;
        let mgr = ReadOnlyStateManager::new(&self.tasks);
        Some(mgr.deps_satisfied_for_info(info))
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Tasks dispatched but not yet reported back.
    pub fn in_flight(&self) -> usize {
        ReadOnlyStateManager::new(&self.tasks).count_in(TaskRunState::Running)
    }

    /// Tasks in a terminal state.
    pub fn completed_count(&self) -> usize {
        ReadOnlyStateManager::new(&self.tasks).count_terminal()
    }

    pub fn total(&self) -> usize {
        self.tasks.len()
    }

    /// The run is over when nothing is in flight and either every task is
    /// terminal or a failure stopped further dispatch.
    pub fn is_finished(&self) -> bool {
        if !self.started {
            return false;
        }
        let mgr = ReadOnlyStateManager::new(&self.tasks);
        mgr.count_in(TaskRunState::Running) == 0 && (self.halted || mgr.all_tasks_terminal())
    }

    pub fn results(&self) -> &Results {
        &self.results
    }

    pub fn failure(&self) -> Option<&TaskgraphError> {
        self.failure.as_ref()
    }

    /// Consume the scheduler: the first failure, or the results of every
    /// task that succeeded.
    pub fn finish(self) -> Result<Results> {
        match self.failure {
            Some(err) => Err(err),
            None => Ok(self.results),
        }
    }
}
