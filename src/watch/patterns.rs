// src/watch/patterns.rs

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::engine::TaskName;
use crate::watch::path_utils::relative_str;

/// A glob pattern anchored at a base directory.
///
/// The pattern is matched against paths relative to `base`, with forward
/// slashes; `*` never crosses a directory separator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchoredPattern {
    pub base: PathBuf,
    pub pattern: String,
}

impl AnchoredPattern {
    pub fn new(base: impl Into<PathBuf>, pattern: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            pattern: pattern.into(),
        }
    }
}

impl fmt::Display for AnchoredPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base.join(&self.pattern).display())
    }
}

/// Uncompiled watch rule: patterns bound to an ordered list of tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSpec {
    pub name: String,
    pub patterns: Vec<AnchoredPattern>,
    pub tasks: Vec<TaskName>,
}

/// Patterns grouped by base directory and compiled into one `GlobSet` each.
#[derive(Clone, Default)]
pub struct AnchoredSet {
    groups: Vec<(PathBuf, GlobSet)>,
}

impl fmt::Debug for AnchoredSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.groups.iter().map(|(base, _)| base))
            .finish()
    }
}

impl AnchoredSet {
    pub fn compile(patterns: &[AnchoredPattern]) -> Result<Self> {
        let mut bases: Vec<&Path> = Vec::new();
        for p in patterns {
            if !bases.contains(&p.base.as_path()) {
                bases.push(&p.base);
            }
        }

        let mut groups = Vec::with_capacity(bases.len());
        for base in bases {
            let mut builder = GlobSetBuilder::new();
            for p in patterns.iter().filter(|p| p.base == base) {
                let glob = GlobBuilder::new(&p.pattern)
                    .literal_separator(true)
                    .build()
                    .with_context(|| format!("invalid glob pattern: {}", p.pattern))?;
                builder.add(glob);
            }
            let set = builder
                .build()
                .with_context(|| format!("building globset for {}", base.display()))?;
            groups.push((base.to_path_buf(), set));
        }
        Ok(Self { groups })
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Base directories, in first-seen order.
    pub fn bases(&self) -> impl Iterator<Item = &Path> {
        self.groups.iter().map(|(base, _)| base.as_path())
    }

    pub fn is_match(&self, path: &Path) -> bool {
        self.groups.iter().any(|(base, set)| {
            relative_str(base, path).is_some_and(|rel| set.is_match(rel.as_str()))
        })
    }
}

/// Compiled watch rule.
#[derive(Debug, Clone)]
pub struct WatchRule {
    name: String,
    includes: AnchoredSet,
    tasks: Vec<TaskName>,
}

impl WatchRule {
    pub fn compile(spec: &RuleSpec) -> Result<Self> {
        let includes = AnchoredSet::compile(&spec.patterns)
            .with_context(|| format!("compiling watch rule '{}'", spec.name))?;
        Ok(Self {
            name: spec.name.clone(),
            includes,
            tasks: spec.tasks.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tasks(&self) -> &[TaskName] {
        &self.tasks
    }

    pub fn bases(&self) -> impl Iterator<Item = &Path> {
        self.includes.bases()
    }

    /// Whether this rule's patterns match `path` (excludes not applied).
    pub fn matches(&self, path: &Path) -> bool {
        self.includes.is_match(path)
    }
}
