// src/watch/rules.rs

//! Watch profiles and the compiled rule set installed by a watch entry.

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use crate::dag::TaskGraph;
use crate::engine::TaskName;
use crate::errors::{DocpipeError, Result};
use crate::pipeline::{LESS_TO_CSS, ProjectPaths, SPHINX_TO_HTML};
use crate::watch::path_utils::collapse_watch_roots;
use crate::watch::patterns::{AnchoredPattern, AnchoredSet, RuleSpec, WatchRule};

/// Which pattern set a watch entry installs. Chosen once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchProfile {
    /// Re-run only the document compiler, watching pre-built CSS.
    Build,
    /// Also recompile stylesheets, watching theme sources directly.
    Develop,
}

impl WatchProfile {
    pub fn rules(self, paths: &ProjectPaths) -> Vec<RuleSpec> {
        let project = &paths.project_dir;
        let theme = &paths.theme_dir;

        match self {
            WatchProfile::Build => vec![RuleSpec {
                name: "sources".into(),
                patterns: vec![
                    AnchoredPattern::new(project, "**/*.rst"),
                    AnchoredPattern::new(theme, "*.html"),
                    AnchoredPattern::new(&paths.css_output_dir, "*.css"),
                    AnchoredPattern::new(theme, "**/*.js"),
                ],
                tasks: vec![SPHINX_TO_HTML.into()],
            }],
            WatchProfile::Develop => vec![
                RuleSpec {
                    name: "styles".into(),
                    patterns: vec![
                        AnchoredPattern::new(theme, "**/*.less"),
                        AnchoredPattern::new(theme, "**/*.scss"),
                    ],
                    tasks: vec![LESS_TO_CSS.into(), SPHINX_TO_HTML.into()],
                },
                RuleSpec {
                    name: "sources".into(),
                    patterns: vec![
                        AnchoredPattern::new(project, "**/*.rst"),
                        AnchoredPattern::new(theme, "*.html"),
                        AnchoredPattern::new(theme, "**/*.js"),
                    ],
                    tasks: vec![SPHINX_TO_HTML.into()],
                },
            ],
        }
    }

    pub fn excludes(self, paths: &ProjectPaths) -> Vec<AnchoredPattern> {
        let mut excludes = vec![AnchoredPattern::new(&paths.html_output_dir, "**")];
        for base in [&paths.project_dir, &paths.theme_dir] {
            excludes.push(AnchoredPattern::new(base, "**/node_modules/**"));
            excludes.push(AnchoredPattern::new(base, "**/.git/**"));
        }
        if self == WatchProfile::Develop {
            excludes.push(AnchoredPattern::new(&paths.css_output_dir, "**"));
        }
        excludes
    }
}

/// Compiled rules plus shared excludes.
#[derive(Debug, Clone)]
pub struct WatchSet {
    rules: Vec<WatchRule>,
    excludes: AnchoredSet,
}

impl WatchSet {
    /// Compile `rules` and check that every task they name is declared.
    pub fn compile(
        rules: &[RuleSpec],
        excludes: &[AnchoredPattern],
        graph: &TaskGraph,
    ) -> Result<Self> {
        for rule in rules {
            for task in &rule.tasks {
                if !graph.contains(task) {
                    return Err(DocpipeError::WatchSetup(format!(
                        "watch rule '{}' references unknown task '{}'",
                        rule.name, task
                    )));
                }
            }
        }

        let compiled = rules
            .iter()
            .map(WatchRule::compile)
            .collect::<anyhow::Result<Vec<_>>>()
            .map_err(|e| DocpipeError::WatchSetup(format!("{e:#}")))?;
        let excludes = AnchoredSet::compile(excludes)
            .context("compiling watch excludes")
            .map_err(|e| DocpipeError::WatchSetup(format!("{e:#}")))?;

        Ok(Self {
            rules: compiled,
            excludes,
        })
    }

    pub fn for_profile(profile: WatchProfile, paths: &ProjectPaths, graph: &TaskGraph) -> Result<Self> {
        Self::compile(&profile.rules(paths), &profile.excludes(paths), graph)
    }

    pub fn rules(&self) -> &[WatchRule] {
        &self.rules
    }

    /// Minimal set of directories to watch recursively.
    pub fn roots(&self) -> Vec<PathBuf> {
        let bases = self
            .rules
            .iter()
            .flat_map(|r| r.bases())
            .map(Path::to_path_buf)
            .collect();
        collapse_watch_roots(bases)
    }

    pub fn is_excluded(&self, path: &Path) -> bool {
        self.excludes.is_match(path)
    }

    /// Tasks to trigger for a batch of changed paths: each task at most
    /// once, ordered by rule and then by position within the rule.
    pub fn tasks_for_batch<'a, I>(&self, paths: I) -> Vec<TaskName>
    where
        I: IntoIterator<Item = &'a Path>,
    {
        let paths: Vec<&Path> = paths
            .into_iter()
            .filter(|p| !self.is_excluded(p))
            .collect();

        let mut tasks: Vec<TaskName> = Vec::new();
        for rule in &self.rules {
            if let Some(hit) = paths.iter().find(|p| rule.matches(p)) {
                debug!(rule = rule.name(), path = %hit.display(), "watch rule matched");
                for task in rule.tasks() {
                    if !tasks.contains(task) {
                        tasks.push(task.clone());
                    }
                }
            }
        }
        tasks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigFile;
    use crate::pipeline::build_task_graph;

    fn layout() -> ProjectPaths {
        ProjectPaths {
            project_dir: "/p".into(),
            theme_dir: "/p/theme".into(),
            css_output_dir: "/p/theme/assets/css".into(),
            html_output_dir: "/p/_build".into(),
        }
    }

    fn graph(paths: &ProjectPaths) -> TaskGraph {
        build_task_graph(&ConfigFile::default(), paths).unwrap()
    }

    fn batch(set: &WatchSet, paths: &[&str]) -> Vec<TaskName> {
        set.tasks_for_batch(paths.iter().map(Path::new))
    }

    #[test]
    fn build_profile_triggers_only_document_compiler() {
        let paths = layout();
        let set = WatchSet::for_profile(WatchProfile::Build, &paths, &graph(&paths)).unwrap();

        assert_eq!(batch(&set, &["/p/index.rst"]), vec![SPHINX_TO_HTML]);
        assert_eq!(batch(&set, &["/p/theme/assets/css/styles.css"]), vec![SPHINX_TO_HTML]);
        assert!(batch(&set, &["/p/theme/styles.less"]).is_empty());
        assert!(batch(&set, &["/p/_build/html/index.rst"]).is_empty());
        assert!(batch(&set, &["/p/README.md"]).is_empty());
    }

    #[test]
    fn develop_profile_orders_and_dedups_tasks() {
        let paths = layout();
        let set = WatchSet::for_profile(WatchProfile::Develop, &paths, &graph(&paths)).unwrap();

        assert_eq!(
            batch(&set, &["/p/index.rst", "/p/theme/components/nav/styles.less"]),
            vec![LESS_TO_CSS, SPHINX_TO_HTML]
        );
        assert_eq!(batch(&set, &["/p/theme/js/menu.js"]), vec![SPHINX_TO_HTML]);
        // Compiled output is not a source in develop mode.
        assert!(batch(&set, &["/p/theme/assets/css/styles.css"]).is_empty());
        assert!(batch(&set, &["/p/theme/node_modules/x/y.less"]).is_empty());
    }

    #[test]
    fn roots_collapse_to_project_unless_theme_is_a_sibling() {
        let paths = layout();
        let set = WatchSet::for_profile(WatchProfile::Build, &paths, &graph(&paths)).unwrap();
        assert_eq!(set.roots(), vec![PathBuf::from("/p")]);

        let mut sibling = layout();
        sibling.theme_dir = "/docs-theme".into();
        sibling.css_output_dir = "/docs-theme/assets/css".into();
        let set = WatchSet::for_profile(WatchProfile::Develop, &sibling, &graph(&sibling)).unwrap();
        assert_eq!(
            set.roots(),
            vec![PathBuf::from("/docs-theme"), PathBuf::from("/p")]
        );
    }

    #[test]
    fn rule_with_unknown_task_is_fatal() {
        let paths = layout();
        let rules = vec![RuleSpec {
            name: "typo".into(),
            patterns: vec![AnchoredPattern::new("/p", "**/*.rst")],
            tasks: vec!["sphinx_to_htm".into()],
        }];
        let err = WatchSet::compile(&rules, &[], &graph(&paths)).unwrap_err();
        assert!(matches!(err, DocpipeError::WatchSetup(msg) if msg.contains("sphinx_to_htm")));
    }
}
