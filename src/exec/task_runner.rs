// src/exec/task_runner.rs

//! Individual task runner.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

use crate::dag::{ScheduledTask, TaskAction};
use crate::engine::{RuntimeEvent, TaskOutcome};
use crate::exec::command::run_command;
use crate::stylesheet::StylesheetPipeline;

/// Run a single task instance and emit exactly one `TaskCompleted` event
/// for it.
///
/// If the cancel channel fires, the instance is stopped and reports
/// `TaskOutcome::Cancelled`.
pub async fn run_task(
    task: ScheduledTask,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    stylesheets: Arc<StylesheetPipeline>,
    cancel_rx: oneshot::Receiver<()>,
) {
    info!(
        task = %task.name,
        run_id = task.run_id,
        action = %task.action,
        "starting task"
    );

    let outcome = match &task.action {
        TaskAction::Barrier => TaskOutcome::Success,
        TaskAction::Command(spec) => match run_command(&task.name, spec, cancel_rx).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(task = %task.name, run_id = task.run_id, error = %err, "task execution error");
                TaskOutcome::Failed(-1)
            }
        },
        TaskAction::Stylesheet(spec) => {
            run_stylesheets(&task, &stylesheets, spec, cancel_rx).await
        }
    };

    info!(task = %task.name, run_id = task.run_id, ?outcome, "task finished");

    if runtime_tx
        .send(RuntimeEvent::TaskCompleted {
            task: task.name.clone(),
            outcome,
        })
        .await
        .is_err()
    {
        warn!(task = %task.name, "runtime gone; dropping completion event");
    }
}

async fn run_stylesheets(
    task: &ScheduledTask,
    pipeline: &StylesheetPipeline,
    spec: &crate::stylesheet::StylesheetSpec,
    mut cancel_rx: oneshot::Receiver<()>,
) -> TaskOutcome {
    let cancelled = Arc::new(AtomicBool::new(false));
    let run = pipeline.run(spec, Arc::clone(&cancelled));
    tokio::pin!(run);

    let result = tokio::select! {
        res = &mut run => res,
        Ok(()) = &mut cancel_rx => {
            cancelled.store(true, Ordering::SeqCst);
            // Let in-flight compilations drain so no half-written output
            // outlives the task.
            let _ = (&mut run).await;
            return TaskOutcome::Cancelled;
        }
    };

    match result {
        Ok(report) if report.cancelled => TaskOutcome::Cancelled,
        Ok(report) => {
            info!(
                task = %task.name,
                compiled = report.compiled.len(),
                failed = report.failed.len(),
                unchanged = report.skipped_unchanged,
                pruned = report.pruned.len(),
                "stylesheets compiled"
            );
            TaskOutcome::Success
        }
        Err(err) => {
            error!(task = %task.name, run_id = task.run_id, error = %err, "stylesheet task failed");
            TaskOutcome::Failed(-1)
        }
    }
}
