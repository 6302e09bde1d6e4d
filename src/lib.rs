// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod pipeline;
pub mod stylesheet;
pub mod types;
pub mod watch;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{ConfigFile, load_or_default};
use crate::dag::{Scheduler, TaskGraph};
use crate::engine::{CoreRuntime, RunReport, Runtime, RuntimeEvent, RuntimeOptions, TriggerReason};
use crate::errors::{DocpipeError, Error, Result};
use crate::exec::RealExecutorBackend;
use crate::fs::RealFileSystem;
use crate::pipeline::{Entry, ProjectPaths, build_task_graph, resolve_project_dir};
use crate::stylesheet::{StylesheetPipeline, compiler_for};
use crate::watch::{WatchProfile, WatchSet, spawn_watcher};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and path resolution
/// - the task graph, scheduler, queue and runtime
/// - the executor
/// - the file watcher (watch entries only, after a successful initial run)
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_or_default(&config_path)?;
    let entry = args.entry();

    let project_dir = resolve_project_dir(args.project_dir.as_deref(), &config_path);
    let paths = ProjectPaths::resolve(&project_dir, &cfg.paths)?;
    if entry == Entry::BuildVersions {
        // Reports a root project dir clearly instead of as a missing task.
        paths.parent_dir()?;
    }
    let graph = build_task_graph(&cfg, &paths)?;
    graph.require(entry.task_name())?;

    // Rules are validated before anything runs.
    let watch = entry
        .watch_profile()
        .map(|profile| WatchSet::for_profile(profile, &paths, &graph).map(|set| (profile, set)))
        .transpose()?;

    if args.dry_run {
        print_dry_run(entry, &cfg, &paths, &graph, watch.as_ref().map(|(p, _)| *p));
        return Ok(());
    }

    let compiler = compiler_for(&cfg.stylesheet)?;
    let stylesheets = Arc::new(StylesheetPipeline::new(Arc::new(RealFileSystem), compiler));

    // Runtime event channel.
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
    let executor = RealExecutorBackend::new(rt_tx.clone(), stylesheets);

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    let core = CoreRuntime::new(
        Scheduler::from_graph(&graph),
        cfg.watch.triggered_while_running_behaviour,
        cfg.watch.queue_length,
        RuntimeOptions {
            exit_when_idle: true,
        },
    );
    let mut runtime = Runtime::new(core, rt_rx, executor);

    info!(%entry, task = entry.task_name(), project_dir = %paths.project_dir.display(), "starting");
    rt_tx
        .send(RuntimeEvent::TaskTriggered {
            task: entry.task_name().to_string(),
            reason: TriggerReason::Manual,
        })
        .await
        .map_err(Error::from)?;

    check_initial_run(runtime.run().await?)?;

    let Some((profile, set)) = watch else {
        info!(%entry, "done");
        return Ok(());
    };

    let watcher = spawn_watcher(set, Duration::from_millis(cfg.watch.debounce_ms), rt_tx.clone())?;
    debug!(?watcher, ?profile, "watcher installed");
    info!("watching for changes; press Ctrl-C to stop");

    runtime.core_mut().set_exit_when_idle(false);
    let report = runtime.run().await?;
    if !report.failed.is_empty() {
        warn!(failed = ?report.failed, "tasks failed while watching");
    }

    drop(watcher);
    Ok(())
}

/// The entry's chain must have completed: a Ctrl-C before the end is
/// [`DocpipeError::Interrupted`], any failed task is
/// [`DocpipeError::TasksFailed`].
fn check_initial_run(report: RunReport) -> Result<()> {
    if report.interrupted {
        warn!("interrupted before the initial run finished");
        return Err(DocpipeError::Interrupted);
    }
    if !report.failed.is_empty() {
        return Err(DocpipeError::TasksFailed(report.failed));
    }
    Ok(())
}

/// Dry-run output: resolved paths, tasks and watch rules.
fn print_dry_run(
    entry: Entry,
    cfg: &ConfigFile,
    paths: &ProjectPaths,
    graph: &TaskGraph,
    profile: Option<WatchProfile>,
) {
    println!("docpipe dry-run (entry: {entry})");
    println!("  project_dir     = {}", paths.project_dir.display());
    println!("  theme_dir       = {}", paths.theme_dir.display());
    println!("  css_output_dir  = {}", paths.css_output_dir.display());
    println!("  html_output_dir = {}", paths.html_output_dir.display());
    println!(
        "  watch: debounce_ms = {}, triggered_while_running_behaviour = {:?}, queue_length = {}",
        cfg.watch.debounce_ms, cfg.watch.triggered_while_running_behaviour, cfg.watch.queue_length
    );
    println!();

    println!("tasks ({}):", graph.len());
    for task in graph.iter() {
        println!("  - {}", task.name);
        println!("      action: {}", task.action);
        if !task.deps.is_empty() {
            println!("      after: {:?}", task.deps);
        }
    }

    if let Some(profile) = profile {
        println!();
        println!("watch rules ({profile:?} profile):");
        for rule in profile.rules(paths) {
            println!("  - {} -> {:?}", rule.name, rule.tasks);
            for pattern in &rule.patterns {
                println!("      {pattern}");
            }
        }
        println!("  exclude:");
        for pattern in profile.excludes(paths) {
            println!("      {pattern}");
        }
    }

    debug!("dry-run complete (no execution)");
}
