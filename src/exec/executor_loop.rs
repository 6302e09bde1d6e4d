// src/exec/executor_loop.rs

//! Main executor loop that manages in-flight task instances.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::dag::ScheduledTask;
use crate::engine::{RuntimeEvent, TaskName};
use crate::exec::task_runner::run_task;
use crate::stylesheet::StylesheetPipeline;

/// Requests accepted by the executor loop.
#[derive(Debug)]
pub enum ExecutorMessage {
    Run(ScheduledTask),
    Cancel(TaskName),
}

/// Internal handle for a currently-running task instance.
///
/// - `cancel` asks the instance to stop and report `Cancelled`.
/// - `handle` is the Tokio task that is actually running it.
struct ActiveTask {
    cancel: Option<oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<()>,
}

/// Spawn the background executor loop.
///
/// Each scheduled task is executed in its own Tokio task, and **per task
/// name there is never more than one instance running at the same time**.
/// The scheduler only re-dispatches a task after its previous instance
/// reported completion.
pub fn spawn_executor(
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    stylesheets: Arc<StylesheetPipeline>,
) -> mpsc::Sender<ExecutorMessage> {
    let (tx, mut rx) = mpsc::channel::<ExecutorMessage>(32);

    tokio::spawn(async move {
        info!("executor loop started");

        let mut active: HashMap<TaskName, ActiveTask> = HashMap::new();

        while let Some(message) = rx.recv().await {
            match message {
                ExecutorMessage::Run(task) => {
                    start_task(task, &mut active, &runtime_tx, &stylesheets)
                }
                ExecutorMessage::Cancel(name) => cancel_task(&name, &mut active),
            }
            active.retain(|_, t| !t.handle.is_finished());
        }

        info!("executor loop finished (channel closed)");
    });

    tx
}

fn start_task(
    task: ScheduledTask,
    active: &mut HashMap<TaskName, ActiveTask>,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
    stylesheets: &Arc<StylesheetPipeline>,
) {
    let name = task.name.clone();

    if let Some(previous) = active.remove(&name) {
        if !previous.handle.is_finished() {
            // The previous instance already reported its completion and is
            // only unwinding; it must not outlive its successor.
            debug!(
                task = %name,
                run_id = task.run_id,
                "previous instance still unwinding; aborting it"
            );
            previous.handle.abort();
        }
    }

    let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
    let rt_tx = runtime_tx.clone();
    let pipeline = Arc::clone(stylesheets);
    let spawn_name = name.clone();

    let handle = tokio::spawn(async move {
        run_task(task, rt_tx, pipeline, cancel_rx).await;
        debug!(task = %spawn_name, "task runner future finished");
    });

    active.insert(
        name,
        ActiveTask {
            cancel: Some(cancel_tx),
            handle,
        },
    );
}

fn cancel_task(name: &str, active: &mut HashMap<TaskName, ActiveTask>) {
    let Some(existing) = active.get_mut(name) else {
        debug!(task = %name, "cancel requested but task is not running");
        return;
    };

    match existing.cancel.take() {
        Some(cancel) => {
            info!(task = %name, "cancelling running task instance");
            if cancel.send(()).is_err() {
                debug!(task = %name, "instance already finished while cancelling");
            }
        }
        None => debug!(task = %name, "instance already asked to cancel"),
    }
}
