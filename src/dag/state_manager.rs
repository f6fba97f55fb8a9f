// src/dag/state_manager.rs

//! Per-run state transitions for tasks in the scheduler.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::dag::DagGraph;
use crate::dag::task_info::{ScheduledTask, TaskInfo, TaskRunState};
use crate::engine::TaskName;
use crate::task::{Results, guard_value, select_inputs};

/// Mutating view over one run's task table.
pub struct StateManager<'a> {
    graph: &'a DagGraph,
    tasks: &'a mut HashMap<TaskName, TaskInfo>,
    results: &'a Results,
}

impl<'a> StateManager<'a> {
    pub fn new(
        graph: &'a DagGraph,
        tasks: &'a mut HashMap<TaskName, TaskInfo>,
        results: &'a Results,
    ) -> Self {
        Self {
            graph,
            tasks,
            results,
        }
    }

    /// Record that `finished` reached a non-failed terminal state: decrement
    /// the indegree of each direct dependent and return those that became
    /// ready, in edge order.
    pub fn release_dependents(&mut self, finished: &str) -> Vec<TaskName> {
        let mut ready = Vec::new();

        for dependent in self.graph.dependents_of(finished) {
            let Some(info) = self.tasks.get_mut(dependent) else {
                warn!(task = %dependent, "dependent missing from tasks map");
                continue;
            };

            info.indegree = info.indegree.saturating_sub(1);
            debug!(
                task = %info.name,
                upstream = %finished,
                remaining = info.indegree,
                "dependency resolved"
            );

            if info.indegree == 0 && info.run_state == TaskRunState::Pending {
                ready.push(info.name.clone());
            }
        }

        ready
    }

    /// Mark the given tasks `Running` and resolve their arguments against
    /// the results accumulated so far.
    pub fn schedule(&mut self, names: Vec<TaskName>) -> Vec<ScheduledTask> {
        let mut scheduled = Vec::with_capacity(names.len());

        for name in names {
            let Some(info) = self.tasks.get_mut(&name) else {
                warn!(task = %name, "cannot schedule unknown task");
                continue;
            };
            if info.run_state != TaskRunState::Pending {
                continue;
            }

            let inputs = select_inputs(info.task.inputs(), self.results);
            let guard = guard_value(&info.deps, self.results);

            debug!(
                task = %info.name,
                injected = ?inputs.keys().collect::<Vec<_>>(),
                "dependencies satisfied; marking Running"
            );

            info.run_state = TaskRunState::Running;
            scheduled.push(ScheduledTask {
                name: info.name.clone(),
                task: info.task.clone(),
                inputs,
                guard_value: guard,
            });
        }

        scheduled
    }

    pub fn set_state(&mut self, name: &str, state: TaskRunState) -> bool {
        match self.tasks.get_mut(name) {
            Some(info) => {
                info.run_state = state;
                true
            }
            None => false,
        }
    }
}

/// Read-only queries over one run's task table.
pub struct ReadOnlyStateManager<'a> {
    tasks: &'a HashMap<TaskName, TaskInfo>,
}

impl<'a> ReadOnlyStateManager<'a> {
    pub fn new(tasks: &'a HashMap<TaskName, TaskInfo>) -> Self {
        Self { tasks }
    }

    /// Every dependency reached `Succeeded` or `Skipped`.
    pub fn deps_satisfied_for_info(&self, info: &TaskInfo) -> bool {
        info.deps.iter().all(|dep| {
            matches!(
                self.tasks.get(dep).map(|d| d.run_state),
                Some(TaskRunState::Succeeded) | Some(TaskRunState::Skipped)
            )
        })
    }

    pub fn count_in(&self, state: TaskRunState) -> usize {
        self.tasks
            .values()
            .filter(|info| info.run_state == state)
            .count()
    }

    pub fn count_terminal(&self) -> usize {
        self.tasks
            .values()
            .filter(|info| info.run_state.is_terminal())
            .count()
    }

    pub fn all_tasks_terminal(&self) -> bool {
        self.tasks.values().all(|info| info.run_state.is_terminal())
    }
}
