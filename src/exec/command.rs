// src/exec/command.rs

//! External process execution through the platform shell.
//!
//! Both output streams of the child are relayed line by line at `info`, so
//! `make html` progress and its final status show at the default level.

use std::process::Stdio;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::dag::CommandSpec;
use crate::engine::TaskOutcome;
use crate::errors::Result;

/// Build a shell command appropriate for the platform.
pub fn shell_command(spec: &CommandSpec) -> Command {
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(&spec.command);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(&spec.command);
        c
    };

    if let Some(cwd) = &spec.cwd {
        cmd.current_dir(cwd);
    }

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    cmd
}

/// Run `spec` to completion, forwarding its output to the log.
///
/// Returns `Cancelled` if `cancel_rx` fires first; the child is killed.
pub async fn run_command(
    task: &str,
    spec: &CommandSpec,
    mut cancel_rx: oneshot::Receiver<()>,
) -> Result<TaskOutcome> {
    let mut child = shell_command(spec).spawn().with_context(|| {
        format!("spawning `{}` for task '{}'", spec.command, task)
    })?;

    // Always consume both pipes so buffers don't fill.
    if let Some(stdout) = child.stdout.take() {
        forward_lines(task.to_string(), "stdout", stdout);
    }
    if let Some(stderr) = child.stderr.take() {
        forward_lines(task.to_string(), "stderr", stderr);
    }

    tokio::select! {
        status = child.wait() => {
            let status = status
                .with_context(|| format!("waiting for process of task '{task}'"))?;
            let code = status.code().unwrap_or(-1);
            info!(task, exit_code = code, success = status.success(), "process exited");
            Ok(if status.success() {
                TaskOutcome::Success
            } else {
                TaskOutcome::Failed(code)
            })
        }
        Ok(()) = &mut cancel_rx => {
            info!(task, "cancellation requested; killing process");
            if let Err(e) = child.kill().await {
                warn!(task, error = %e, "failed to kill child process on cancellation");
            }
            Ok(TaskOutcome::Cancelled)
        }
    }
}

fn forward_lines<R>(task: String, stream: &'static str, reader: R)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            info!(task = %task, stream, "{}", line);
        }
    });
}
