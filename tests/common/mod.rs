#![allow(dead_code)]

use std::path::{Path, PathBuf};

use tempfile::TempDir;

pub use docpipe_test_utils::builders::GraphBuilder;
pub use docpipe_test_utils::fake_executor::{ExecutionLog, FakeExecutor};
pub use docpipe_test_utils::{init_tracing, with_timeout};

/// A docs project in a temporary directory: `<tmp>/docs`, with `<tmp>` as
/// its parent.
pub struct Project {
    _tmp: TempDir,
    pub parent: PathBuf,
    pub dir: PathBuf,
}

impl Project {
    pub fn new() -> Self {
        let tmp = tempfile::tempdir().expect("create tempdir");
        let parent = tmp.path().canonicalize().expect("canonicalize tempdir");
        let dir = parent.join("docs");
        std::fs::create_dir_all(&dir).expect("create project dir");
        Self {
            _tmp: tmp,
            parent,
            dir,
        }
    }

    /// Write `contents` to `rel` under the project dir, creating parents.
    pub fn write(&self, rel: impl AsRef<Path>, contents: &str) -> PathBuf {
        let path = self.dir.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dir");
        }
        std::fs::write(&path, contents).expect("write file");
        path
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.join("Docpipe.toml")
    }
}

/// Poll `cond` every 10ms until it holds.
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    while !cond() {
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
}
