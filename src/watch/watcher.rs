// src/watch/watcher.rs

use std::path::PathBuf;
use std::time::Duration;

use notify::{EventKind, RecommendedWatcher, RecursiveMode};
use notify_debouncer_full::{DebounceEventResult, Debouncer, RecommendedCache, new_debouncer};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::RuntimeEvent;
use crate::errors::{DocpipeError, Result};
use crate::watch::event_handler::process_batch;
use crate::watch::rules::WatchSet;

/// Handle for the filesystem watcher.
///
/// Keeps the debouncer alive; dropping it stops file watching and ends the
/// forwarding task.
pub struct WatcherHandle {
    _debouncer: Debouncer<RecommendedWatcher, RecommendedCache>,
    roots: Vec<PathBuf>,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle")
            .field("roots", &self.roots)
            .finish_non_exhaustive()
    }
}

impl WatcherHandle {
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }
}

/// Install the watcher for `set` and forward matched batches to the runtime
/// as `RuntimeEvent::TaskTriggered`.
///
/// Fails if a watch root does not exist or cannot be watched. Errors reported
/// after installation are logged and watching continues.
pub fn spawn_watcher(
    set: WatchSet,
    debounce: Duration,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> Result<WatcherHandle> {
    let roots = set.roots();
    if roots.is_empty() {
        return Err(DocpipeError::WatchSetup("no watch patterns configured".into()));
    }
    if let Some(missing) = roots.iter().find(|r| !r.is_dir()) {
        return Err(DocpipeError::WatchSetup(format!(
            "watch root {} does not exist",
            missing.display()
        )));
    }

    // Channel from the notify thread into the async world.
    let (batch_tx, mut batch_rx) = mpsc::unbounded_channel::<DebounceEventResult>();

    let mut debouncer = new_debouncer(debounce, None, move |res: DebounceEventResult| {
        // The receiver only goes away when the watcher is shutting down.
        let _ = batch_tx.send(res);
    })
    .map_err(|e| DocpipeError::WatchSetup(format!("creating watcher: {e}")))?;

    for root in &roots {
        debouncer
            .watch(root, RecursiveMode::Recursive)
            .map_err(|e| DocpipeError::WatchSetup(format!("watching {}: {e}", root.display())))?;
        info!(root = %root.display(), "watching");
    }

    tokio::spawn(async move {
        while let Some(res) = batch_rx.recv().await {
            match res {
                Ok(events) => {
                    let paths: Vec<PathBuf> = events
                        .iter()
                        .filter(|de| !matches!(de.event.kind, EventKind::Access(_)))
                        .flat_map(|de| de.event.paths.iter().cloned())
                        .collect();
                    if paths.is_empty() {
                        continue;
                    }
                    debug!(?paths, "debounced batch received");
                    if !process_batch(&set, &paths, &runtime_tx).await {
                        break;
                    }
                }
                Err(errors) => {
                    for err in errors {
                        warn!(error = %err, "file watch error");
                    }
                }
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle {
        _debouncer: debouncer,
        roots,
    })
}
