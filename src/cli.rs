// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! Every subcommand names an entry of the build pipeline; running `docpipe`
//! without one is the same as `docpipe build_and_watch`.

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::DEFAULT_CONFIG_FILE;
use crate::pipeline::Entry;

/// Command-line arguments for `docpipe`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "docpipe",
    version,
    about = "Compile theme stylesheets and docs, and rebuild them when sources change.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML). A missing file means built-in defaults.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_FILE, global = true)]
    pub config: String,

    /// Docs project directory. Defaults to the config file's directory.
    #[arg(long, value_name = "DIR", global = true)]
    pub project_dir: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DOCPIPE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    /// Print the task graph, watch rules and resolved paths, run nothing.
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Option<TaskCommand>,
}

impl CliArgs {
    /// The pipeline entry selected by the subcommand.
    pub fn entry(&self) -> Entry {
        self.command.map(Entry::from).unwrap_or(Entry::BuildAndWatch)
    }
}

/// Named tasks exposed on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum TaskCommand {
    /// Run the document compiler once.
    #[command(name = "sphinx_to_html")]
    SphinxToHtml,
    /// Compile the theme stylesheets once.
    #[command(name = "less_to_css")]
    LessToCss,
    /// Compile stylesheets and docs once.
    #[command(name = "build")]
    Build,
    /// Compile once, then rebuild the docs whenever sources change.
    #[command(name = "build_and_watch")]
    BuildAndWatch,
    /// Compile once, then watch theme sources too (theme development).
    #[command(name = "develop")]
    Develop,
    /// Run the multi-version docs build from the parent directory.
    #[command(name = "build-versions")]
    BuildVersions,
}

impl From<TaskCommand> for Entry {
    fn from(cmd: TaskCommand) -> Self {
        match cmd {
            TaskCommand::SphinxToHtml => Entry::SphinxToHtml,
            TaskCommand::LessToCss => Entry::LessToCss,
            TaskCommand::Build => Entry::Build,
            TaskCommand::BuildAndWatch => Entry::BuildAndWatch,
            TaskCommand::Develop => Entry::Develop,
            TaskCommand::BuildVersions => Entry::BuildVersions,
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_defaults_to_build_and_watch() {
        let args = CliArgs::try_parse_from(["docpipe"]).unwrap();
        assert_eq!(args.entry(), Entry::BuildAndWatch);
        assert_eq!(args.config, "Docpipe.toml");
    }

    #[test]
    fn task_names_are_accepted_verbatim() {
        let args = CliArgs::try_parse_from(["docpipe", "less_to_css"]).unwrap();
        assert_eq!(args.entry(), Entry::LessToCss);

        let args = CliArgs::try_parse_from(["docpipe", "build-versions", "--dry-run"]).unwrap();
        assert_eq!(args.entry(), Entry::BuildVersions);
        assert!(args.dry_run);
    }

    #[test]
    fn unknown_task_is_rejected() {
        assert!(CliArgs::try_parse_from(["docpipe", "deploy"]).is_err());
    }
}
