// src/watch/path_utils.rs

//! Utility functions for path handling in the watcher.

use std::path::{Path, PathBuf};

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// - First we try a direct `strip_prefix(root)`.
/// - If that fails (e.g. due to symlinks or different absolute prefixes),
///   we canonicalize both paths and try again. Deleted files cannot be
///   canonicalized, so for those only their parent directory is.
///
/// Returns `None` if the path cannot be related to `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(to_slash(rel));
    }

    let root_canon = root.canonicalize().ok()?;
    let path_canon = canonicalize_lossy(path)?;
    path_canon.strip_prefix(&root_canon).ok().map(to_slash)
}

fn canonicalize_lossy(path: &Path) -> Option<PathBuf> {
    if let Ok(p) = path.canonicalize() {
        return Some(p);
    }
    let parent = path.parent()?.canonicalize().ok()?;
    Some(parent.join(path.file_name()?))
}

fn to_slash(rel: &Path) -> String {
    rel.to_string_lossy().replace('\\', "/")
}

/// Reduce `roots` to the minimal set of directories whose recursive watches
/// cover all of them. The result is sorted.
pub fn collapse_watch_roots(mut roots: Vec<PathBuf>) -> Vec<PathBuf> {
    roots.sort();
    roots.dedup();

    let mut collapsed: Vec<PathBuf> = Vec::new();
    for root in roots {
        if !collapsed.iter().any(|kept| root.starts_with(kept)) {
            collapsed.push(root);
        }
    }
    collapsed
}
