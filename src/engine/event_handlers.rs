// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::dag::{ScheduledTask, Scheduler, TaskRunState};
use crate::engine::queue::TriggerQueue;
use crate::engine::{RuntimeOptions, TaskName, TaskOutcome, TriggerReason};
use crate::types::TriggerWhileRunningBehaviour;

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Send these tasks to the executor.
    DispatchTasks(Vec<ScheduledTask>),
    /// Cooperatively cancel the in-flight instances of these tasks.
    CancelTasks(Vec<TaskName>),
    /// Request that the loop exits (idle in `exit_when_idle` mode).
    RequestExit,
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
    /// Tasks that failed (or were blocked by a failure) in this step.
    pub failed: Vec<TaskName>,
    /// Tasks that were cancelled (or blocked by a cancellation) in this step.
    pub cancelled: Vec<TaskName>,
}

impl CoreStep {
    pub(crate) fn continue_with(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
            failed: Vec::new(),
            cancelled: Vec::new(),
        }
    }
}

/// Handle a task trigger event.
///
/// - If the scheduler is idle, start a new run seeded with this trigger plus
///   anything that was already queued.
/// - If a run is active:
///   - a task *not* in the run is merged into it immediately, so unrelated
///     triggers share the run and execute concurrently;
///   - a task already in the run is recorded in the queue for a future run.
///     In `cancel` mode a running instance is also cancelled.
pub fn handle_task_trigger(
    scheduler: &mut Scheduler,
    queue: &mut TriggerQueue,
    task: TaskName,
    reason: TriggerReason,
) -> CoreStep {
    if scheduler.is_idle() {
        let mut triggers: BTreeSet<TaskName> = queue.drain_pending().into_iter().collect();
        triggers.insert(task);

        return start_new_run_from_triggers(scheduler, triggers.into_iter().collect());
    }

    let mut commands = Vec::new();

    match scheduler.run_state_of(&task) {
        None => {
            warn!(task = %task, ?reason, "trigger for unknown task; ignoring");
        }
        Some(TaskRunState::NotInRun) => {
            let newly_ready = scheduler.handle_trigger(&task);
            if !newly_ready.is_empty() {
                commands.push(CoreCommand::DispatchTasks(newly_ready));
            }
        }
        Some(state) => {
            debug!(task = %task, ?state, ?reason, "task already in current run; queueing re-run");
            queue.record_trigger(&task);

            if state == TaskRunState::Running
                && queue.behaviour() == TriggerWhileRunningBehaviour::Cancel
            {
                commands.push(CoreCommand::CancelTasks(vec![task]));
            }
        }
    }

    CoreStep::continue_with(commands)
}

/// Handle a task completion event.
pub fn handle_task_completion(
    scheduler: &mut Scheduler,
    queue: &mut TriggerQueue,
    options: &RuntimeOptions,
    task: TaskName,
    outcome: TaskOutcome,
) -> CoreStep {
    let mut commands = Vec::new();

    let step = scheduler.step_completion(&task, outcome);
    if !step.newly_scheduled.is_empty() {
        commands.push(CoreCommand::DispatchTasks(step.newly_scheduled));
    }

    let queued = maybe_start_queued_run(scheduler, queue);
    commands.extend(queued.commands);

    let mut keep_running = true;
    if options.exit_when_idle && scheduler.is_idle() && queue.is_empty() {
        keep_running = false;
        commands.push(CoreCommand::RequestExit);
    }

    CoreStep {
        commands,
        keep_running,
        failed: step.newly_failed,
        cancelled: step.newly_cancelled,
    }
}

/// Seed a new run from a set of triggers.
///
/// Unknown task names are dropped so that an empty run is never started.
pub fn start_new_run_from_triggers(scheduler: &mut Scheduler, triggers: Vec<TaskName>) -> CoreStep {
    let triggers: Vec<TaskName> = triggers
        .into_iter()
        .filter(|t| {
            let known = scheduler.run_state_of(t).is_some();
            if !known {
                warn!(task = %t, "dropping trigger for unknown task");
            }
            known
        })
        .collect();

    if triggers.is_empty() {
        return CoreStep::continue_with(Vec::new());
    }

    scheduler.start_new_run();

    let mut all_ready = Vec::new();
    for task in triggers {
        all_ready.extend(scheduler.handle_trigger(&task));
    }

    let mut commands = Vec::new();
    if !all_ready.is_empty() {
        commands.push(CoreCommand::DispatchTasks(all_ready));
    }
    CoreStep::continue_with(commands)
}

/// If the scheduler is idle and there are queued triggers, start a new run.
fn maybe_start_queued_run(scheduler: &mut Scheduler, queue: &mut TriggerQueue) -> CoreStep {
    if !scheduler.is_idle() || queue.is_empty() {
        return CoreStep::continue_with(Vec::new());
    }

    let triggers = queue.drain_pending();
    start_new_run_from_triggers(scheduler, triggers)
}
