// src/dag/state_manager.rs

//! Per-run state management for tasks in the scheduler.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::dag::DagGraph;
use crate::dag::task_info::{RunState, ScheduledTask, TaskInfo};
use crate::engine::TaskName;

/// Manages per-run state transitions for tasks.
pub struct StateManager<'a> {
    graph: &'a DagGraph,
    tasks: &'a mut HashMap<TaskName, TaskInfo>,
    current_run_id: Option<u64>,
}

impl<'a> StateManager<'a> {
    pub fn new(
        graph: &'a DagGraph,
        tasks: &'a mut HashMap<TaskName, TaskInfo>,
        current_run_id: Option<u64>,
    ) -> Self {
        Self {
            graph,
            tasks,
            current_run_id,
        }
    }

    /// Include a triggered task and everything it (transitively) depends on
    /// in this run.
    ///
    /// - Tasks that were not yet part of the run (`run_state == None`) are
    ///   marked `Pending`.
    /// - Tasks already participating in this run keep their current state,
    ///   so a dependency that already succeeded in this run is not repeated.
    pub fn mark_task_and_dependencies_pending(&mut self, root: &str) {
        let mut stack: Vec<TaskName> = vec![root.to_string()];
        let mut visited: HashSet<TaskName> = HashSet::new();

        while let Some(name) = stack.pop() {
            if !visited.insert(name.clone()) {
                continue;
            }

            match self.tasks.get_mut(&name) {
                Some(info) => {
                    if info.run_state.is_none() {
                        info.run_state = Some(RunState::Pending);
                        debug!(task = %info.name, "marked Pending for this run");
                    }
                    stack.extend(self.graph.dependencies_of(&name).iter().cloned());
                }
                None => warn!(task = %name, "node in graph not present in tasks map"),
            }
        }
    }

    /// Whether every dependency of `info` completed successfully in the
    /// current run.
    pub fn deps_satisfied_for_info(&self, info: &TaskInfo) -> bool {
        ReadOnlyStateManager::new(self.tasks).deps_satisfied_for_info(info)
    }

    /// Move every pending or running dependent (transitively) of `blocked_task`
    /// to `state`.
    ///
    /// Returns the tasks that were newly marked, excluding `blocked_task`
    /// itself.
    pub fn mark_dependents(&mut self, blocked_task: &str, state: RunState) -> Vec<TaskName> {
        let mut stack: Vec<TaskName> = self.graph.dependents_of(blocked_task).to_vec();
        let mut newly_marked = Vec::new();

        while let Some(name) = stack.pop() {
            let Some(info) = self.tasks.get_mut(&name) else {
                continue;
            };
            match info.run_state {
                Some(RunState::Pending) | Some(RunState::Running) => {
                    info.run_state = Some(state);
                    debug!(
                        task = %info.name,
                        upstream = %blocked_task,
                        ?state,
                        "dependent blocked by upstream task"
                    );
                    newly_marked.push(info.name.clone());
                    stack.extend(self.graph.dependents_of(&name).iter().cloned());
                }
                // Already terminal, or not participating in this run.
                _ => {}
            }
        }

        newly_marked
    }

    /// Collect tasks that are `Pending` and whose dependencies are satisfied,
    /// mark them as `Running`, and return them as `ScheduledTask`s.
    pub fn collect_new_ready_tasks(&mut self) -> Vec<ScheduledTask> {
        let mut candidates: Vec<TaskName> = self
            .tasks
            .values()
            .filter(|info| {
                matches!(info.run_state, Some(RunState::Pending))
                    && self.deps_satisfied_for_info(info)
            })
            .map(|info| info.name.clone())
            .collect();
        // Deterministic dispatch order.
        candidates.sort();

        let mut ready = Vec::with_capacity(candidates.len());
        for name in candidates {
            if let Some(info) = self.tasks.get_mut(&name) {
                let is_rerun = info.last_successful_run.is_some() || info.last_failed_run.is_some();
                info!(
                    task = %info.name,
                    run_id = self.current_run_id,
                    rerun = is_rerun,
                    "dependencies satisfied; starting task"
                );

                info.run_state = Some(RunState::Running);
                ready.push(ScheduledTask::from_task_info(
                    info,
                    self.current_run_id.unwrap_or(0),
                ));
            }
        }

        ready
    }

    /// Check if every task in the run is in a terminal state.
    pub fn all_tasks_terminal(&self) -> bool {
        self.tasks
            .values()
            .filter_map(|info| info.run_state)
            .all(RunState::is_terminal)
    }
}

/// A read-only view of the state manager for checking dependency satisfaction.
pub struct ReadOnlyStateManager<'a> {
    tasks: &'a HashMap<TaskName, TaskInfo>,
}

impl<'a> ReadOnlyStateManager<'a> {
    pub fn new(tasks: &'a HashMap<TaskName, TaskInfo>) -> Self {
        Self { tasks }
    }

    /// Fan-in barrier check: every dependency must be `DoneSuccess` in the
    /// current run. Triggering a task always pulls its dependencies into the
    /// run, so there is no fallback to earlier runs.
    pub fn deps_satisfied_for_info(&self, info: &TaskInfo) -> bool {
        info.deps.iter().all(|dep_name| match self.tasks.get(dep_name) {
            Some(dep) => matches!(dep.run_state, Some(RunState::DoneSuccess)),
            None => {
                warn!(
                    task = %info.name,
                    dep = %dep_name,
                    "dependency missing from tasks map"
                );
                false
            }
        })
    }
}
