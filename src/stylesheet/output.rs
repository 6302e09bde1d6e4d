// src/stylesheet/output.rs

//! Coordinated writes to the shared CSS output directory.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::fs::FileSystem;

/// Result of a single [`OutputWriter::write`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStatus {
    Written,
    /// The file on disk already held these bytes.
    Unchanged,
}

/// Serializes writes per output path and remembers what it wrote.
///
/// Each write holds an async lock on its path for its whole duration, goes
/// to a temporary sibling and is renamed into place, so readers never see a
/// partial file.
#[derive(Debug)]
pub struct OutputWriter {
    fs: Arc<dyn FileSystem>,
    locks: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
    /// Digest of the last bytes this writer put at each path.
    written: Mutex<HashMap<PathBuf, blake3::Hash>>,
}

fn guard<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.tmp"))
}

impl OutputWriter {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            locks: Mutex::new(HashMap::new()),
            written: Mutex::new(HashMap::new()),
        }
    }

    fn lock_for(&self, path: &Path) -> Arc<tokio::sync::Mutex<()>> {
        Arc::clone(guard(&self.locks).entry(path.to_path_buf()).or_default())
    }

    /// Paths this writer has written and not pruned since.
    pub fn written_paths(&self) -> BTreeSet<PathBuf> {
        guard(&self.written).keys().cloned().collect()
    }

    /// Write `contents` to `path` unless the file already holds exactly
    /// those bytes. Whatever else is on disk, including edits made outside
    /// this process, is replaced.
    pub async fn write(&self, path: &Path, contents: Vec<u8>) -> Result<WriteStatus> {
        let lock = self.lock_for(path);
        let _held = lock.lock().await;

        let digest = blake3::hash(&contents);
        let fs = Arc::clone(&self.fs);
        let target = path.to_path_buf();
        let status = tokio::task::spawn_blocking(move || {
            let on_disk = if fs.exists(&target) {
                fs.read(&target).ok().map(|bytes| blake3::hash(&bytes))
            } else {
                None
            };
            if on_disk == Some(digest) {
                return Ok(WriteStatus::Unchanged);
            }

            let tmp = temp_sibling(&target);
            fs.write(&tmp, &contents)?;
            if let Err(err) = fs.rename(&tmp, &target) {
                let _ = fs.remove_file(&tmp);
                return Err(err);
            }
            Ok(WriteStatus::Written)
        })
        .await
        .context("output write task panicked")??;

        match status {
            WriteStatus::Unchanged => {
                debug!(path = %path.display(), "output unchanged; skipping write");
            }
            WriteStatus::Written => {
                guard(&self.written).insert(path.to_path_buf(), digest);
                debug!(path = %path.display(), "output written");
            }
        }
        Ok(status)
    }

    /// Remove outputs in `dir` that this writer produced earlier and that are
    /// not in `keep`. Files it never wrote are left alone.
    pub async fn prune(&self, dir: &Path, keep: &BTreeSet<PathBuf>) -> Result<Vec<PathBuf>> {
        let stale: Vec<PathBuf> = self
            .written_paths()
            .into_iter()
            .filter(|p| p.parent() == Some(dir) && !keep.contains(p))
            .collect();

        let mut pruned = Vec::new();
        for path in stale {
            let lock = self.lock_for(&path);
            let _held = lock.lock().await;

            let fs = Arc::clone(&self.fs);
            let target = path.clone();
            tokio::task::spawn_blocking(move || {
                if fs.exists(&target) {
                    fs.remove_file(&target)
                } else {
                    Ok(())
                }
            })
            .await
            .context("prune task panicked")??;

            guard(&self.written).remove(&path);
            info!(path = %path.display(), "pruned stale stylesheet output");
            pruned.push(path);
        }
        Ok(pruned)
    }
}
