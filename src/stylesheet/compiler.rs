// src/stylesheet/compiler.rs

//! Stylesheet preprocessors.
//!
//! The preprocessor is an opaque text → CSS transform. Two are provided:
//! the external `lessc` program, fed on stdin, and the in-process `grass`
//! Sass compiler (behind the `grass` feature).

use std::fmt::Debug;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;

use anyhow::{Context, anyhow};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::config::StylesheetSection;
use crate::errors::{DocpipeError, Result};
use crate::types::StyleCompilerKind;

pub type CompileFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>>;

/// Turns the text of one stylesheet into CSS.
pub trait StyleCompiler: Send + Sync + Debug {
    fn name(&self) -> &str;

    /// Compile `contents`, which was read from `source`. Relative imports
    /// resolve against the directory of `source`.
    fn compile<'a>(&'a self, source: &'a Path, contents: String) -> CompileFuture<'a>;
}

/// The preprocessor program could not be started. This says nothing about
/// the stylesheet being compiled, so the pipeline fails the whole task on it
/// instead of recording a per-file error.
#[derive(Debug, thiserror::Error)]
#[error("stylesheet compiler `{program}` could not be started: {source}")]
pub struct CompilerUnavailable {
    pub program: String,
    #[source]
    pub source: std::io::Error,
}

/// Build the compiler selected in the `[stylesheet]` section.
pub fn compiler_for(section: &StylesheetSection) -> Result<Arc<dyn StyleCompiler>> {
    match section.compiler {
        StyleCompilerKind::Lessc => Ok(Arc::new(LesscCompiler::new(&section.lessc)?)),
        #[cfg(feature = "grass")]
        StyleCompilerKind::Grass => Ok(Arc::new(GrassCompiler)),
        #[cfg(not(feature = "grass"))]
        StyleCompilerKind::Grass => Err(DocpipeError::ConfigError(
            "stylesheet.compiler = \"grass\" needs docpipe built with the `grass` feature".into(),
        )),
    }
}

fn include_dir(source: &Path) -> PathBuf {
    match source.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// External `lessc`, reading the stylesheet from stdin and writing CSS to stdout.
#[derive(Debug, Clone)]
pub struct LesscCompiler {
    program: String,
    args: Vec<String>,
}

impl LesscCompiler {
    /// `command` is a program optionally followed by arguments, e.g.
    /// `"npx lessc"`.
    pub fn new(command: &str) -> Result<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| DocpipeError::ConfigError("stylesheet.lessc is empty".into()))?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }
}

impl StyleCompiler for LesscCompiler {
    fn name(&self) -> &str {
        "lessc"
    }

    fn compile<'a>(&'a self, source: &'a Path, contents: String) -> CompileFuture<'a> {
        Box::pin(async move {
            let mut child = Command::new(&self.program)
                .args(&self.args)
                .arg(format!("--include-path={}", include_dir(source).display()))
                .arg("-")
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .spawn()
                .map_err(|source| CompilerUnavailable {
                    program: self.program.clone(),
                    source,
                })?;

            let mut stdin = child
                .stdin
                .take()
                .context("lessc stdin was not captured")?;
            let feed = async move {
                stdin.write_all(contents.as_bytes()).await?;
                stdin.shutdown().await
            };

            let (fed, output) = tokio::join!(feed, child.wait_with_output());
            let output = output.context("waiting for lessc")?;
            if !output.status.success() {
                return Err(anyhow!(
                    "lessc exited with {}: {}",
                    output.status.code().unwrap_or(-1),
                    String::from_utf8_lossy(&output.stderr).trim()
                ));
            }
            fed.context("feeding lessc stdin")?;

            String::from_utf8(output.stdout).context("lessc produced non UTF-8 output")
        })
    }
}

/// In-process Sass compilation.
#[cfg(feature = "grass")]
#[derive(Debug, Clone, Copy, Default)]
pub struct GrassCompiler;

#[cfg(feature = "grass")]
impl StyleCompiler for GrassCompiler {
    fn name(&self) -> &str {
        "grass"
    }

    fn compile<'a>(&'a self, source: &'a Path, contents: String) -> CompileFuture<'a> {
        let dir = include_dir(source);
        Box::pin(async move {
            tokio::task::spawn_blocking(move || {
                let opts = grass::Options::default().load_path(&dir);
                grass::from_string(contents, &opts).map_err(|e| anyhow!("{e}"))
            })
            .await
            .context("grass compile task panicked")?
        })
    }
}
