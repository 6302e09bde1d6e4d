// src/stylesheet/mod.rs

//! Stylesheet compilation task.
//!
//! Discovers preprocessor stylesheets under the theme directory, compiles
//! them concurrently and writes the results into one flat CSS directory.
//! A compile error in one file is logged and recorded; the remaining files
//! still compile. Write errors and a preprocessor that cannot be started at
//! all fail the task.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;
use globset::{GlobBuilder, GlobMatcher};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::errors::{DocpipeError, Result};
use crate::fs::FileSystem;
use crate::types::CollisionPolicy;

pub mod compiler;
pub mod naming;
pub mod output;

pub use compiler::{CompilerUnavailable, LesscCompiler, StyleCompiler, compiler_for};
pub use naming::{PlannedOutput, output_file_name, plan_outputs};
pub use output::{OutputWriter, WriteStatus};

/// What the stylesheet task compiles and where it writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StylesheetSpec {
    pub theme_dir: PathBuf,
    /// Glob matched against paths relative to `theme_dir`.
    pub glob: String,
    pub output_dir: PathBuf,
    pub collision: CollisionPolicy,
    pub prune_stale: bool,
}

/// Outcome of one stylesheet task run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StylesheetReport {
    /// Outputs written (or confirmed unchanged) in this run.
    pub compiled: Vec<PathBuf>,
    /// Sources that failed to read or compile.
    pub failed: Vec<PathBuf>,
    /// Outputs whose file already held the compiled bytes.
    pub skipped_unchanged: usize,
    /// Sources dropped by a `last_write_wins` collision.
    pub shadowed: Vec<PathBuf>,
    pub pruned: Vec<PathBuf>,
    /// The run stopped early because cancellation was requested.
    pub cancelled: bool,
}

enum UnitResult {
    Compiled(WriteStatus),
    CompileFailed(anyhow::Error),
    CompilerUnavailable(anyhow::Error),
    WriteFailed(anyhow::Error),
    Skipped,
}

/// Discovers, compiles and writes stylesheets. Shared by every run of the
/// stylesheet task so the output writer keeps its memory across runs.
#[derive(Debug)]
pub struct StylesheetPipeline {
    fs: Arc<dyn FileSystem>,
    compiler: Arc<dyn StyleCompiler>,
    writer: Arc<OutputWriter>,
}

impl StylesheetPipeline {
    pub fn new(fs: Arc<dyn FileSystem>, compiler: Arc<dyn StyleCompiler>) -> Self {
        let writer = Arc::new(OutputWriter::new(Arc::clone(&fs)));
        Self {
            fs,
            compiler,
            writer,
        }
    }

    /// Every file under `spec.theme_dir` whose relative path matches
    /// `spec.glob`, sorted. A missing theme directory yields no files.
    pub fn discover(&self, spec: &StylesheetSpec) -> Result<Vec<PathBuf>> {
        discover(self.fs.as_ref(), spec)
    }

    /// Run the task once: discover, plan, compile concurrently, write.
    ///
    /// Resolves only after every file unit has finished. Setting `cancel`
    /// stops units that have not started compiling or writing yet.
    pub async fn run(&self, spec: &StylesheetSpec, cancel: Arc<AtomicBool>) -> Result<StylesheetReport> {
        let fs = Arc::clone(&self.fs);
        let discover_spec = spec.clone();
        let sources = tokio::task::spawn_blocking(move || discover(fs.as_ref(), &discover_spec))
            .await
            .context("stylesheet discovery panicked")??;

        let (plan, shadowed) = plan_outputs(&sources, &spec.output_dir, spec.collision)?;
        info!(
            files = plan.len(),
            compiler = self.compiler.name(),
            output_dir = %spec.output_dir.display(),
            "compiling stylesheets"
        );

        let mut report = StylesheetReport {
            shadowed,
            ..StylesheetReport::default()
        };

        let mut units = JoinSet::new();
        for unit in plan.iter().cloned() {
            let fs = Arc::clone(&self.fs);
            let compiler = Arc::clone(&self.compiler);
            let writer = Arc::clone(&self.writer);
            let cancel = Arc::clone(&cancel);
            units.spawn(async move {
                let result = compile_unit(&unit, fs, compiler, &writer, &cancel).await;
                (unit, result)
            });
        }

        let mut fatal = None;
        while let Some(joined) = units.join_next().await {
            let (unit, result) = joined.context("stylesheet unit panicked")?;
            match result {
                UnitResult::Compiled(status) => {
                    if status == WriteStatus::Unchanged {
                        report.skipped_unchanged += 1;
                    }
                    report.compiled.push(unit.output);
                }
                UnitResult::CompileFailed(err) => {
                    error!(path = %unit.source.display(), error = %format!("{err:#}"), "stylesheet failed to compile");
                    report.failed.push(unit.source);
                }
                UnitResult::CompilerUnavailable(err) => {
                    error!(path = %unit.source.display(), error = %format!("{err:#}"), "stylesheet compiler unavailable");
                    report.failed.push(unit.source);
                    fatal.get_or_insert(err);
                }
                UnitResult::WriteFailed(err) => {
                    error!(path = %unit.output.display(), error = %format!("{err:#}"), "failed to write stylesheet output");
                    fatal.get_or_insert(err);
                }
                UnitResult::Skipped => report.cancelled = true,
            }
        }

        if let Some(err) = fatal {
            return Err(DocpipeError::Other(err));
        }

        report.compiled.sort();
        report.failed.sort();

        if report.cancelled || cancel.load(Ordering::SeqCst) {
            report.cancelled = true;
            warn!("stylesheet run cancelled before every file finished");
            return Ok(report);
        }

        if spec.prune_stale {
            let keep: BTreeSet<PathBuf> = plan.into_iter().map(|p| p.output).collect();
            report.pruned = self.writer.prune(&spec.output_dir, &keep).await?;
        }

        Ok(report)
    }
}

async fn compile_unit(
    unit: &PlannedOutput,
    fs: Arc<dyn FileSystem>,
    compiler: Arc<dyn StyleCompiler>,
    writer: &OutputWriter,
    cancel: &AtomicBool,
) -> UnitResult {
    if cancel.load(Ordering::SeqCst) {
        return UnitResult::Skipped;
    }

    let source = unit.source.clone();
    let read = tokio::task::spawn_blocking(move || fs.read_to_string(&source)).await;
    let contents = match read {
        Ok(Ok(contents)) => contents,
        Ok(Err(err)) => return UnitResult::CompileFailed(err),
        Err(err) => return UnitResult::CompileFailed(err.into()),
    };

    let css = match compiler.compile(&unit.source, contents).await {
        Ok(css) => css,
        Err(err) if err.is::<CompilerUnavailable>() => return UnitResult::CompilerUnavailable(err),
        Err(err) => return UnitResult::CompileFailed(err),
    };

    if cancel.load(Ordering::SeqCst) {
        return UnitResult::Skipped;
    }

    debug!(path = %unit.source.display(), output = %unit.output.display(), "stylesheet compiled");
    match writer.write(&unit.output, css.into_bytes()).await {
        Ok(status) => UnitResult::Compiled(status),
        Err(err) => UnitResult::WriteFailed(err),
    }
}

fn matcher(glob: &str) -> Result<GlobMatcher> {
    let glob = GlobBuilder::new(glob)
        .literal_separator(true)
        .build()
        .map_err(|e| DocpipeError::ConfigError(format!("invalid stylesheet glob `{glob}`: {e}")))?;
    Ok(glob.compile_matcher())
}

fn discover(fs: &dyn FileSystem, spec: &StylesheetSpec) -> Result<Vec<PathBuf>> {
    if !fs.is_dir(&spec.theme_dir) {
        warn!(theme_dir = %spec.theme_dir.display(), "theme directory not found; no stylesheets to compile");
        return Ok(Vec::new());
    }

    let matcher = matcher(&spec.glob)?;
    let mut found = Vec::new();
    let mut stack = vec![spec.theme_dir.clone()];
    while let Some(dir) = stack.pop() {
        for entry in fs.read_dir(&dir)? {
            if fs.is_dir(&entry) {
                stack.push(entry);
            } else if is_match(&matcher, &spec.theme_dir, &entry) {
                found.push(entry);
            }
        }
    }
    found.sort();
    Ok(found)
}

fn is_match(matcher: &GlobMatcher, base: &Path, path: &Path) -> bool {
    path.strip_prefix(base)
        .map(|rel| matcher.is_match(rel))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockFileSystem;

    fn spec() -> StylesheetSpec {
        StylesheetSpec {
            theme_dir: "/p/theme".into(),
            glob: "**/styles.less".into(),
            output_dir: "/p/theme/assets/css".into(),
            collision: CollisionPolicy::Error,
            prune_stale: false,
        }
    }

    #[test]
    fn discovery_matches_relative_glob_at_any_depth() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/theme/styles.less", "");
        fs.add_file("/p/theme/components/nav/styles.less", "");
        fs.add_file("/p/theme/components/nav/mixins.less", "");
        fs.add_file("/p/other/styles.less", "");

        let found = discover(&fs, &spec()).unwrap();
        assert_eq!(
            found,
            vec![
                PathBuf::from("/p/theme/components/nav/styles.less"),
                PathBuf::from("/p/theme/styles.less"),
            ]
        );
    }

    #[test]
    fn missing_theme_dir_finds_nothing() {
        let fs = MockFileSystem::new();
        assert!(discover(&fs, &spec()).unwrap().is_empty());
    }
}
