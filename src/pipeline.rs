// src/pipeline.rs

//! The docs-site task graph and the CLI entries that drive it.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::config::{ConfigFile, PathsSection};
use crate::dag::{CommandSpec, TaskAction, TaskGraph, TaskRegistry};
use crate::errors::{DocpipeError, Result};
use crate::stylesheet::StylesheetSpec;
use crate::watch::WatchProfile;

pub const LESS_TO_CSS: &str = "less_to_css";
pub const SPHINX_TO_HTML: &str = "sphinx_to_html";
pub const BUILD: &str = "build";
pub const BUILD_VERSIONS: &str = "build-versions";

/// What the process was asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    SphinxToHtml,
    LessToCss,
    Build,
    BuildAndWatch,
    Develop,
    BuildVersions,
}

impl Entry {
    /// Task triggered when the entry starts.
    pub fn task_name(self) -> &'static str {
        match self {
            Entry::SphinxToHtml => SPHINX_TO_HTML,
            Entry::LessToCss => LESS_TO_CSS,
            Entry::Build | Entry::BuildAndWatch | Entry::Develop => BUILD,
            Entry::BuildVersions => BUILD_VERSIONS,
        }
    }

    /// Watch rules installed after the initial run, if any.
    pub fn watch_profile(self) -> Option<WatchProfile> {
        match self {
            Entry::BuildAndWatch => Some(WatchProfile::Build),
            Entry::Develop => Some(WatchProfile::Develop),
            _ => None,
        }
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Entry::SphinxToHtml => "sphinx_to_html",
            Entry::LessToCss => "less_to_css",
            Entry::Build => "build",
            Entry::BuildAndWatch => "build_and_watch",
            Entry::Develop => "develop",
            Entry::BuildVersions => "build-versions",
        };
        f.write_str(name)
    }
}

/// Absolute locations of everything the pipeline reads and writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    pub project_dir: PathBuf,
    pub theme_dir: PathBuf,
    pub css_output_dir: PathBuf,
    pub html_output_dir: PathBuf,
}

impl ProjectPaths {
    /// Resolve the `[paths]` section against `project_dir`, which must exist.
    pub fn resolve(project_dir: &Path, paths: &PathsSection) -> Result<Self> {
        let project_dir = project_dir.canonicalize().map_err(|e| {
            DocpipeError::ConfigError(format!(
                "project directory {} is not accessible: {e}",
                project_dir.display()
            ))
        })?;

        Ok(Self {
            theme_dir: normalize(&project_dir.join(&paths.theme_dir)),
            css_output_dir: normalize(&project_dir.join(&paths.css_output_dir)),
            html_output_dir: normalize(&project_dir.join(&paths.html_output_dir)),
            project_dir,
        })
    }

    /// Directory the versioned build runs in.
    pub fn parent_dir(&self) -> Result<PathBuf> {
        self.project_dir
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| {
                DocpipeError::ConfigError(format!(
                    "project directory {} has no parent for the versioned build",
                    self.project_dir.display()
                ))
            })
    }
}

/// Lexically remove `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Pick the project directory: explicit flag, else the directory holding the
/// config file, else the current directory.
pub fn resolve_project_dir(explicit: Option<&str>, config_path: &Path) -> PathBuf {
    if let Some(dir) = explicit {
        return PathBuf::from(dir);
    }
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && config_path.exists() => {
            parent.to_path_buf()
        }
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Declare the standard graph:
///
/// ```text
/// less_to_css ──┐
///               ├──> build
/// sphinx_to_html┘
/// build-versions (standalone, cwd = parent of project dir)
/// ```
///
/// A project at the filesystem root has no parent, so it gets no versioned
/// build; the other tasks are unaffected.
pub fn build_task_graph(cfg: &ConfigFile, paths: &ProjectPaths) -> Result<TaskGraph> {
    let stylesheet = StylesheetSpec {
        theme_dir: paths.theme_dir.clone(),
        glob: cfg.stylesheet.glob.clone(),
        output_dir: paths.css_output_dir.clone(),
        collision: cfg.stylesheet.collision,
        prune_stale: cfg.stylesheet.prune_stale,
    };

    let mut registry = TaskRegistry::new();
    registry
        .declare(LESS_TO_CSS, NO_DEPS, TaskAction::Stylesheet(stylesheet))?
        .declare(
            SPHINX_TO_HTML,
            NO_DEPS,
            TaskAction::Command(CommandSpec::new(&cfg.docs.command).in_dir(&paths.project_dir)),
        )?
        .declare(BUILD, [LESS_TO_CSS, SPHINX_TO_HTML], TaskAction::Barrier)?;

    match paths.parent_dir() {
        Ok(parent) => {
            registry.declare(
                BUILD_VERSIONS,
                NO_DEPS,
                TaskAction::Command(CommandSpec::new(&cfg.versions.command).in_dir(parent)),
            )?;
        }
        Err(err) => debug!(error = %err, "skipping versioned build task"),
    }
    registry.build()
}

const NO_DEPS: [&str; 0] = [];

#[cfg(test)]
mod tests {
    use super::*;

    fn paths_in(dir: &Path) -> ProjectPaths {
        ProjectPaths::resolve(dir, &PathsSection::default()).unwrap()
    }

    #[test]
    fn sibling_theme_dir_is_normalized() {
        let tmp = tempfile::tempdir().unwrap();
        let project = tmp.path().join("docs");
        std::fs::create_dir(&project).unwrap();

        let section = PathsSection {
            theme_dir: "../docs-theme".into(),
            ..PathsSection::default()
        };
        let paths = ProjectPaths::resolve(&project, &section).unwrap();
        let root = tmp.path().canonicalize().unwrap();
        assert_eq!(paths.theme_dir, root.join("docs-theme"));
        assert_eq!(paths.html_output_dir, root.join("docs/_build"));
    }

    #[test]
    fn graph_wires_build_barrier_and_versioned_cwd() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = paths_in(tmp.path());
        let graph = build_task_graph(&ConfigFile::default(), &paths).unwrap();

        assert_eq!(graph.len(), 4);
        let build = graph.get(BUILD).unwrap();
        assert_eq!(build.deps, vec![LESS_TO_CSS.to_string(), SPHINX_TO_HTML.to_string()]);
        assert_eq!(build.action, TaskAction::Barrier);

        match &graph.get(BUILD_VERSIONS).unwrap().action {
            TaskAction::Command(cmd) => {
                assert_eq!(cmd.cwd.as_deref(), Some(paths.parent_dir().unwrap().as_path()));
                assert_eq!(cmd.command, "sphinx-multiversion docs docs/_build/html");
            }
            other => panic!("unexpected action {other:?}"),
        }

        match &graph.get(LESS_TO_CSS).unwrap().action {
            TaskAction::Stylesheet(spec) => {
                assert_eq!(spec.output_dir, paths.project_dir.join("theme/assets/css"));
                assert_eq!(spec.glob, "**/styles.less");
            }
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test]
    fn project_at_root_still_builds_docs() {
        let paths = ProjectPaths {
            project_dir: "/".into(),
            theme_dir: "/theme".into(),
            css_output_dir: "/theme/assets/css".into(),
            html_output_dir: "/_build".into(),
        };
        let graph = build_task_graph(&ConfigFile::default(), &paths).unwrap();

        assert!(graph.contains(SPHINX_TO_HTML));
        assert!(graph.contains(BUILD));
        assert!(!graph.contains(BUILD_VERSIONS));
        assert!(matches!(paths.parent_dir(), Err(DocpipeError::ConfigError(_))));
    }

    #[test]
    fn entries_map_to_tasks_and_profiles() {
        assert_eq!(Entry::BuildAndWatch.task_name(), BUILD);
        assert_eq!(Entry::BuildAndWatch.watch_profile(), Some(WatchProfile::Build));
        assert_eq!(Entry::Develop.watch_profile(), Some(WatchProfile::Develop));
        assert_eq!(Entry::BuildVersions.task_name(), BUILD_VERSIONS);
        assert_eq!(Entry::LessToCss.watch_profile(), None);
    }
}
