// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async shell (`engine::runtime::Runtime`) is responsible for reading
//! events from channels, sending `ScheduledTask`s to the executor and
//! handling shutdown. The core has no Tokio types and performs no IO.

use crate::dag::Scheduler;
use crate::engine::event_handlers::{CoreStep, handle_task_completion, handle_task_trigger};
use crate::engine::queue::TriggerQueue;
use crate::engine::{RunReport, RuntimeEvent, RuntimeOptions};
use crate::types::TriggerWhileRunningBehaviour;

/// Pure core runtime state: scheduler, trigger queue, options and the
/// report accumulated since the last [`CoreRuntime::take_report`].
#[derive(Debug)]
pub struct CoreRuntime {
    scheduler: Scheduler,
    queue: TriggerQueue,
    options: RuntimeOptions,
    report: RunReport,
}

impl CoreRuntime {
    pub fn new(
        scheduler: Scheduler,
        behaviour: TriggerWhileRunningBehaviour,
        queue_length: usize,
        options: RuntimeOptions,
    ) -> Self {
        Self {
            scheduler,
            queue: TriggerQueue::new(behaviour, queue_length),
            options,
            report: RunReport::default(),
        }
    }

    /// Expose whether the scheduler is idle (for tests).
    pub fn is_idle(&self) -> bool {
        self.scheduler.is_idle()
    }

    /// Expose queue emptiness (for tests).
    pub fn queue_is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Read access to the scheduler (for diagnostics and tests).
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn set_exit_when_idle(&mut self, exit_when_idle: bool) {
        self.options.exit_when_idle = exit_when_idle;
    }

    /// Return the accumulated report and start a fresh one.
    pub fn take_report(&mut self) -> RunReport {
        std::mem::take(&mut self.report)
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        let step = match event {
            RuntimeEvent::TaskTriggered { task, reason } => {
                handle_task_trigger(&mut self.scheduler, &mut self.queue, task, reason)
            }
            RuntimeEvent::TaskCompleted { task, outcome } => handle_task_completion(
                &mut self.scheduler,
                &mut self.queue,
                &self.options,
                task,
                outcome,
            ),
            RuntimeEvent::ShutdownRequested => {
                self.report.interrupted = true;
                let mut step = CoreStep::continue_with(Vec::new());
                step.keep_running = false;
                step
            }
        };

        self.report.failed.extend(step.failed.iter().cloned());
        self.report.cancelled.extend(step.cancelled.iter().cloned());
        step
    }
}
