use serde::Deserialize;

/// Behaviour when a new trigger arrives for a task that is already part of
/// the active run.
///
/// - `Queue`: remember the trigger and start a new run when the current one
///   finishes (default behaviour).
/// - `Cancel`: drop previously queued triggers, keep only the latest one and
///   cancel the superseded in-flight instance of the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerWhileRunningBehaviour {
    #[default]
    Queue,
    Cancel,
}

/// What to do when two stylesheets flatten to the same output file name
/// (e.g. `a/styles.less` and `b/styles.less` both become `styles.css`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// Fail the stylesheet task before anything is compiled or written.
    #[default]
    Error,
    /// Keep the source with the lexicographically last path; the others are
    /// skipped with a warning.
    LastWriteWins,
}

/// Which preprocessor turns stylesheet sources into CSS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleCompilerKind {
    /// External `lessc` binary, fed on stdin.
    #[default]
    Lessc,
    /// In-process Sass/SCSS compiler.
    Grass,
}
