// src/watch/event_handler.rs

//! Turning one debounced batch of changed paths into task triggers.

use std::path::PathBuf;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::{RuntimeEvent, TriggerReason};
use crate::watch::rules::WatchSet;

/// Trigger every task bound to a rule matched by `paths`, each at most once.
///
/// Returns `false` if the runtime channel is closed, in which case the
/// watcher loop should stop.
pub async fn process_batch(
    set: &WatchSet,
    paths: &[PathBuf],
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
) -> bool {
    let tasks = set.tasks_for_batch(paths.iter().map(PathBuf::as_path));
    if tasks.is_empty() {
        debug!(paths = paths.len(), "no watch rule matched batch");
        return true;
    }

    info!(?tasks, paths = paths.len(), "change detected; triggering tasks");
    for task in tasks {
        if let Err(err) = runtime_tx
            .send(RuntimeEvent::TaskTriggered {
                task,
                reason: TriggerReason::FileWatch,
            })
            .await
        {
            warn!("failed to send RuntimeEvent::TaskTriggered: {err}");
            return false;
        }
    }
    true
}
