use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::dag::declare::TaskGraph;
use crate::dag::graph::DagGraph;
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::state_manager::{ReadOnlyStateManager, StateManager};
use crate::dag::task_info::{RunState, ScheduledTask, TaskInfo, TaskRunState};
use crate::engine::{TaskName, TaskOutcome};

/// Scheduler holds the immutable task graph plus mutable per-run state.
///
/// It is responsible for:
/// - remembering which tasks are part of the current run
/// - deciding when a task is ready to run (every dependency succeeded)
/// - marking tasks as succeeded/failed/cancelled
/// - blocking dependents of a failed or cancelled task
#[derive(Debug)]
pub struct Scheduler {
    graph: DagGraph,
    tasks: HashMap<TaskName, TaskInfo>,
    /// Monotonically increasing run ID.
    run_counter: u64,
    /// Currently active run ID, or `None` if there is no active run.
    current_run_id: Option<u64>,
}

impl Scheduler {
    pub fn from_graph(tasks: &TaskGraph) -> Self {
        let graph = DagGraph::from_tasks(tasks);
        let tasks = tasks
            .iter()
            .map(|decl| (decl.name.clone(), TaskInfo::from_decl(decl)))
            .collect();

        Self {
            graph,
            tasks,
            run_counter: 0,
            current_run_id: None,
        }
    }

    /// Returns `true` if there is currently no active run.
    pub fn is_idle(&self) -> bool {
        self.current_run_id.is_none()
    }

    /// Current run ID, if any.
    pub fn current_run_id(&self) -> Option<u64> {
        self.current_run_id
    }

    /// Read-only view of the given task's run state.
    pub fn run_state_of(&self, task: &str) -> Option<TaskRunState> {
        let info = self.tasks.get(task)?;
        Some(info.run_state.into())
    }

    /// Names of tasks participating in the *active* run.
    ///
    /// Empty when there is no active run, even though tasks keep the
    /// terminal state of the previous run.
    pub fn tasks_in_current_run(&self) -> Vec<TaskName> {
        if self.current_run_id.is_none() {
            return Vec::new();
        }

        self.tasks
            .values()
            .filter(|info| info.run_state.is_some())
            .map(|info| info.name.clone())
            .collect()
    }

    /// Whether the dependencies of `task` are satisfied for the current run.
    ///
    /// Returns `None` if the task is unknown.
    pub fn deps_satisfied(&self, task: &str) -> Option<bool> {
        let info = self.tasks.get(task)?;
        Some(ReadOnlyStateManager::new(&self.tasks).deps_satisfied_for_info(info))
    }

    /// Start a new run, resetting per-run state but keeping the history of
    /// successful and failed runs.
    pub fn start_new_run(&mut self) {
        self.run_counter += 1;
        self.current_run_id = Some(self.run_counter);

        for info in self.tasks.values_mut() {
            info.run_state = None;
        }

        debug!(run_id = self.run_counter, "scheduler: starting new run");
    }

    /// Handle a trigger for a task name (production API).
    pub fn handle_trigger(&mut self, task: &str) -> Vec<ScheduledTask> {
        self.trigger_step_internal(task).newly_scheduled
    }

    /// Handle completion of a task with a concrete outcome (production API).
    pub fn handle_completion(&mut self, task: &str, outcome: TaskOutcome) -> Vec<ScheduledTask> {
        self.completion_step_internal(task, outcome).newly_scheduled
    }

    /// Manual-step variant of `handle_completion` that returns a rich [`SchedulerStep`].
    pub fn step_completion(&mut self, task: &str, outcome: TaskOutcome) -> SchedulerStep {
        self.completion_step_internal(task, outcome)
    }

    /// Clear `current_run_id` if every task is terminal.
    ///
    /// Returns `true` if this call transitioned the scheduler from running
    /// to idle.
    fn maybe_finish_run(&mut self) -> bool {
        if self.current_run_id.is_none() {
            return false;
        }

        let manager = StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);

        if manager.all_tasks_terminal() {
            info!(
                run_id = self.current_run_id,
                "scheduler: all tasks terminal; run finished"
            );
            self.current_run_id = None;
            true
        } else {
            false
        }
    }

    fn trigger_step_internal(&mut self, task: &str) -> SchedulerStep {
        if !self.tasks.contains_key(task) {
            warn!(task = %task, "trigger for unknown task; ignoring");
            return SchedulerStep::default();
        }

        if self.current_run_id.is_none() {
            debug!(task = %task, "trigger with no active run; implicitly starting a new run");
            self.start_new_run();
        }

        let mut manager = StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);
        manager.mark_task_and_dependencies_pending(task);
        let newly_scheduled = manager.collect_new_ready_tasks();
        let run_just_finished = self.maybe_finish_run();

        SchedulerStep {
            newly_scheduled,
            run_just_finished,
            ..SchedulerStep::default()
        }
    }

    fn completion_step_internal(&mut self, task: &str, outcome: TaskOutcome) -> SchedulerStep {
        let Some(run_id) = self.current_run_id else {
            warn!(task = %task, "completion with no active run; ignoring");
            return SchedulerStep::default();
        };

        let mut step = SchedulerStep::default();

        match self.tasks.get_mut(task) {
            Some(info) if info.run_state != Some(RunState::Running) => {
                warn!(
                    task = %info.name,
                    run_id,
                    state = ?info.run_state,
                    "completion for a task that is not running; ignoring"
                );
            }
            Some(info) => match outcome {
                TaskOutcome::Success => {
                    info.run_state = Some(RunState::DoneSuccess);
                    info.last_successful_run = Some(run_id);
                    debug!(task = %info.name, run_id, "task completed successfully");
                    let mut manager =
                        StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);
                    step.newly_scheduled = manager.collect_new_ready_tasks();
                }
                TaskOutcome::Failed(code) => {
                    info.run_state = Some(RunState::DoneFailed);
                    info.last_failed_run = Some(run_id);
                    warn!(
                        task = %info.name,
                        run_id,
                        exit_code = code,
                        "task failed; dependents will not start in this run"
                    );
                    step.newly_failed.push(info.name.clone());
                    let mut manager =
                        StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);
                    step.newly_failed
                        .extend(manager.mark_dependents(task, RunState::DoneFailed));
                }
                TaskOutcome::Cancelled => {
                    info.run_state = Some(RunState::Cancelled);
                    info!(task = %info.name, run_id, "task cancelled");
                    step.newly_cancelled.push(info.name.clone());
                    let mut manager =
                        StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);
                    step.newly_cancelled
                        .extend(manager.mark_dependents(task, RunState::Cancelled));
                }
            },
            None => {
                warn!(task = %task, "completion for unknown task; ignoring");
            }
        }

        step.run_just_finished = self.maybe_finish_run();
        step
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::declare::{TaskAction, TaskRegistry};

    fn build_graph() -> TaskGraph {
        let mut reg = TaskRegistry::new();
        reg.declare("css", Vec::<String>::new(), TaskAction::Barrier)
            .unwrap()
            .declare("html", Vec::<String>::new(), TaskAction::Barrier)
            .unwrap()
            .declare("build", ["css", "html"], TaskAction::Barrier)
            .unwrap();
        reg.build().unwrap()
    }

    fn names(tasks: &[ScheduledTask]) -> Vec<&str> {
        tasks.iter().map(|t| t.name.as_str()).collect()
    }

    #[test]
    fn trigger_pulls_in_dependencies_and_dispatches_them_together() {
        let mut scheduler = Scheduler::from_graph(&build_graph());
        let ready = scheduler.handle_trigger("build");
        assert_eq!(names(&ready), vec!["css", "html"]);
        assert_eq!(scheduler.run_state_of("build"), Some(TaskRunState::Pending));
    }

    #[test]
    fn barrier_waits_for_every_dependency() {
        let mut scheduler = Scheduler::from_graph(&build_graph());
        scheduler.handle_trigger("build");

        assert!(scheduler.handle_completion("css", TaskOutcome::Success).is_empty());
        assert_eq!(scheduler.deps_satisfied("build"), Some(false));

        let ready = scheduler.handle_completion("html", TaskOutcome::Success);
        assert_eq!(names(&ready), vec!["build"]);

        let step = scheduler.step_completion("build", TaskOutcome::Success);
        assert!(step.run_just_finished);
        assert!(scheduler.is_idle());
    }

    #[test]
    fn failed_dependency_blocks_the_barrier() {
        let mut scheduler = Scheduler::from_graph(&build_graph());
        scheduler.handle_trigger("build");

        let step = scheduler.step_completion("html", TaskOutcome::Failed(2));
        assert_eq!(step.newly_failed, vec!["html".to_string(), "build".to_string()]);
        assert!(!step.run_just_finished, "css is still running");

        let step = scheduler.step_completion("css", TaskOutcome::Success);
        assert!(step.newly_scheduled.is_empty());
        assert!(step.run_just_finished);
        assert_eq!(scheduler.run_state_of("build"), Some(TaskRunState::DoneFailed));
    }

    #[test]
    fn cancelled_dependency_blocks_without_failing() {
        let mut scheduler = Scheduler::from_graph(&build_graph());
        scheduler.handle_trigger("build");

        let step = scheduler.step_completion("css", TaskOutcome::Cancelled);
        assert!(step.newly_failed.is_empty());
        assert_eq!(step.newly_cancelled, vec!["css".to_string(), "build".to_string()]);
    }

    #[test]
    fn trigger_of_leaf_task_runs_only_that_task() {
        let mut scheduler = Scheduler::from_graph(&build_graph());
        let ready = scheduler.handle_trigger("html");
        assert_eq!(names(&ready), vec!["html"]);
        assert_eq!(scheduler.run_state_of("build"), Some(TaskRunState::NotInRun));
        assert_eq!(scheduler.run_state_of("css"), Some(TaskRunState::NotInRun));
    }

    #[test]
    fn stray_completion_is_ignored() {
        let mut scheduler = Scheduler::from_graph(&build_graph());
        scheduler.handle_trigger("html");
        let step = scheduler.step_completion("css", TaskOutcome::Success);
        assert!(step.newly_scheduled.is_empty());
        assert_eq!(scheduler.run_state_of("css"), Some(TaskRunState::NotInRun));
        assert!(!scheduler.is_idle());
    }
}
