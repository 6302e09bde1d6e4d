// src/config/model.rs

use serde::Deserialize;

use crate::types::{CollisionPolicy, StyleCompilerKind, TriggerWhileRunningBehaviour};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [paths]
/// theme_dir = "theme"
/// css_output_dir = "theme/assets/css"
///
/// [stylesheet]
/// glob = "**/styles.less"
/// collision = "error"
///
/// [docs]
/// command = "make html"
///
/// [watch]
/// debounce_ms = 250
/// ```
///
/// All sections are optional; the defaults reproduce the stock docs layout
/// (LESS theme under `theme/`, Sphinx `make html`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub paths: PathsSection,

    #[serde(default)]
    pub stylesheet: StylesheetSection,

    #[serde(default)]
    pub docs: DocsSection,

    #[serde(default)]
    pub versions: VersionsSection,

    #[serde(default)]
    pub watch: WatchSection,
}

/// Validated configuration.
///
/// Only constructed through `TryFrom<RawConfigFile>` (see `validate.rs`).
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub paths: PathsSection,
    pub stylesheet: StylesheetSection,
    pub docs: DocsSection,
    pub versions: VersionsSection,
    pub watch: WatchSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            paths: raw.paths,
            stylesheet: raw.stylesheet,
            docs: raw.docs,
            versions: raw.versions,
            watch: raw.watch,
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::new_unchecked(RawConfigFile::default())
    }
}

/// `[paths]` section. Relative paths are resolved against the project dir.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathsSection {
    /// Theme directory; may live outside the project (e.g. `../docs-theme`).
    #[serde(default = "default_theme_dir")]
    pub theme_dir: String,

    /// Flat directory receiving compiled CSS files.
    #[serde(default = "default_css_output_dir")]
    pub css_output_dir: String,

    /// Root of the document compiler's output tree. Never watched.
    #[serde(default = "default_html_output_dir")]
    pub html_output_dir: String,
}

fn default_theme_dir() -> String {
    "theme".to_string()
}

fn default_css_output_dir() -> String {
    "theme/assets/css".to_string()
}

fn default_html_output_dir() -> String {
    "_build".to_string()
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            theme_dir: default_theme_dir(),
            css_output_dir: default_css_output_dir(),
            html_output_dir: default_html_output_dir(),
        }
    }
}

/// `[stylesheet]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StylesheetSection {
    /// Glob selecting entry stylesheets, relative to `paths.theme_dir`.
    #[serde(default = "default_stylesheet_glob")]
    pub glob: String,

    #[serde(default)]
    pub compiler: StyleCompilerKind,

    /// Program used when `compiler = "lessc"`.
    #[serde(default = "default_lessc")]
    pub lessc: String,

    #[serde(default)]
    pub collision: CollisionPolicy,

    /// Remove CSS files written by an earlier run whose source disappeared.
    #[serde(default)]
    pub prune_stale: bool,
}

fn default_stylesheet_glob() -> String {
    "**/styles.less".to_string()
}

fn default_lessc() -> String {
    "lessc".to_string()
}

impl Default for StylesheetSection {
    fn default() -> Self {
        Self {
            glob: default_stylesheet_glob(),
            compiler: StyleCompilerKind::default(),
            lessc: default_lessc(),
            collision: CollisionPolicy::default(),
            prune_stale: false,
        }
    }
}

/// `[docs]` section: the document compiler invocation.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DocsSection {
    #[serde(default = "default_docs_command")]
    pub command: String,
}

fn default_docs_command() -> String {
    "make html".to_string()
}

impl Default for DocsSection {
    fn default() -> Self {
        Self {
            command: default_docs_command(),
        }
    }
}

/// `[versions]` section: the multi-version build, run from the parent of
/// the project directory.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VersionsSection {
    #[serde(default = "default_versions_command")]
    pub command: String,
}

fn default_versions_command() -> String {
    "sphinx-multiversion docs docs/_build/html".to_string()
}

impl Default for VersionsSection {
    fn default() -> Self {
        Self {
            command: default_versions_command(),
        }
    }
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchSection {
    /// Window used to coalesce bursts of filesystem events.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// `"queue"` or `"cancel"`.
    #[serde(default)]
    pub triggered_while_running_behaviour: TriggerWhileRunningBehaviour,

    /// Maximum number of queued re-runs to remember.
    #[serde(default = "default_queue_length")]
    pub queue_length: usize,
}

fn default_debounce_ms() -> u64 {
    250
}

fn default_queue_length() -> usize {
    1
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            triggered_while_running_behaviour: TriggerWhileRunningBehaviour::default(),
            queue_length: default_queue_length(),
        }
    }
}
