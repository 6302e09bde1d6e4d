// tests/runtime_fake_executor.rs

mod common;
use crate::common::{FakeExecutor, GraphBuilder, init_tracing, wait_until, with_timeout};

use tokio::sync::mpsc;

use docpipe::dag::{Scheduler, TaskGraph};
use docpipe::engine::{
    CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions, TaskOutcome, TriggerReason,
    TriggerWhileRunningBehaviour,
};

fn core(graph: &TaskGraph, behaviour: TriggerWhileRunningBehaviour) -> CoreRuntime {
    CoreRuntime::new(
        Scheduler::from_graph(graph),
        behaviour,
        1,
        RuntimeOptions {
            exit_when_idle: true,
        },
    )
}

fn trigger(task: &str) -> RuntimeEvent {
    RuntimeEvent::TaskTriggered {
        task: task.to_string(),
        reason: TriggerReason::Manual,
    }
}

fn done(task: &str, outcome: TaskOutcome) -> RuntimeEvent {
    RuntimeEvent::TaskCompleted {
        task: task.to_string(),
        outcome,
    }
}

#[tokio::test]
async fn build_waits_for_both_dependencies() {
    init_tracing();
    let graph = GraphBuilder::docs_pipeline().build();
    let (tx, rx) = mpsc::channel(64);
    let executor = FakeExecutor::new(tx.clone());
    let log = executor.log();
    let mut runtime = Runtime::new(core(&graph, TriggerWhileRunningBehaviour::Queue), rx, executor);

    tx.send(trigger("build")).await.unwrap();
    let report = with_timeout(runtime.run()).await.unwrap();

    assert!(report.is_success());
    assert_eq!(log.executed(), vec!["less_to_css", "sphinx_to_html", "build"]);
}

#[tokio::test]
async fn failed_dependency_fails_build_without_running_it() {
    init_tracing();
    let graph = GraphBuilder::docs_pipeline().build();
    let (tx, rx) = mpsc::channel(64);
    let executor =
        FakeExecutor::new(tx.clone()).with_outcome("sphinx_to_html", TaskOutcome::Failed(2));
    let log = executor.log();
    let mut runtime = Runtime::new(core(&graph, TriggerWhileRunningBehaviour::Queue), rx, executor);

    tx.send(trigger("build")).await.unwrap();
    let report = with_timeout(runtime.run()).await.unwrap();

    assert!(!report.is_success());
    assert_eq!(report.failed, vec!["sphinx_to_html", "build"]);
    assert_eq!(log.executed(), vec!["less_to_css", "sphinx_to_html"]);
}

#[tokio::test]
async fn burst_of_triggers_coalesces_into_one_rerun() {
    init_tracing();
    let graph = GraphBuilder::docs_pipeline().build();
    let (tx, rx) = mpsc::channel(64);
    let executor = FakeExecutor::holding(tx.clone());
    let log = executor.log();
    let mut runtime = Runtime::new(core(&graph, TriggerWhileRunningBehaviour::Queue), rx, executor);
    let handle = tokio::spawn(async move { runtime.run().await });

    tx.send(trigger("sphinx_to_html")).await.unwrap();
    for _ in 0..5 {
        tx.send(trigger("sphinx_to_html")).await.unwrap();
    }
    with_timeout(wait_until(|| log.executed().len() == 1)).await;

    tx.send(done("sphinx_to_html", TaskOutcome::Success)).await.unwrap();
    with_timeout(wait_until(|| log.executed().len() == 2)).await;
    tx.send(done("sphinx_to_html", TaskOutcome::Success)).await.unwrap();

    let report = with_timeout(handle).await.unwrap().unwrap();
    assert!(report.is_success());
    assert_eq!(log.executed(), vec!["sphinx_to_html", "sphinx_to_html"]);
    assert!(log.cancelled().is_empty());
}

#[tokio::test]
async fn cancel_behaviour_cancels_superseded_instance() {
    init_tracing();
    let graph = GraphBuilder::docs_pipeline().build();
    let (tx, rx) = mpsc::channel(64);
    let executor = FakeExecutor::holding(tx.clone());
    let log = executor.log();
    let mut runtime = Runtime::new(core(&graph, TriggerWhileRunningBehaviour::Cancel), rx, executor);
    let handle = tokio::spawn(async move { runtime.run().await });

    tx.send(trigger("less_to_css")).await.unwrap();
    with_timeout(wait_until(|| log.executed().len() == 1)).await;

    // Superseding trigger: the running instance is cancelled and a fresh
    // run dispatches the task again.
    tx.send(trigger("less_to_css")).await.unwrap();
    with_timeout(wait_until(|| log.executed().len() == 2)).await;
    assert_eq!(log.cancelled(), vec!["less_to_css"]);

    tx.send(done("less_to_css", TaskOutcome::Success)).await.unwrap();
    let report = with_timeout(handle).await.unwrap().unwrap();

    assert!(report.is_success());
    assert_eq!(report.cancelled, vec!["less_to_css"]);
}

#[tokio::test]
async fn watch_phase_keeps_running_until_shutdown() {
    init_tracing();
    let graph = GraphBuilder::docs_pipeline().build();
    let (tx, rx) = mpsc::channel(64);
    let executor = FakeExecutor::new(tx.clone());
    let log = executor.log();
    let mut runtime = Runtime::new(core(&graph, TriggerWhileRunningBehaviour::Queue), rx, executor);

    tx.send(trigger("build")).await.unwrap();
    assert!(with_timeout(runtime.run()).await.unwrap().is_success());

    runtime.core_mut().set_exit_when_idle(false);
    tx.send(RuntimeEvent::TaskTriggered {
        task: "sphinx_to_html".into(),
        reason: TriggerReason::FileWatch,
    })
    .await
    .unwrap();
    tx.send(RuntimeEvent::ShutdownRequested).await.unwrap();

    let report = with_timeout(runtime.run()).await.unwrap();
    assert!(report.interrupted);
    assert_eq!(
        log.executed(),
        vec!["less_to_css", "sphinx_to_html", "build", "sphinx_to_html"]
    );
    // The in-flight instance is stopped on shutdown.
    assert_eq!(log.cancelled(), vec!["sphinx_to_html"]);
}

#[tokio::test]
async fn unknown_trigger_does_not_start_a_run() {
    init_tracing();
    let graph = GraphBuilder::docs_pipeline().build();
    let (tx, rx) = mpsc::channel(64);
    let executor = FakeExecutor::new(tx.clone());
    let log = executor.log();
    let mut runtime = Runtime::new(core(&graph, TriggerWhileRunningBehaviour::Queue), rx, executor);

    tx.send(trigger("no_such_task")).await.unwrap();
    tx.send(trigger("less_to_css")).await.unwrap();
    let report = with_timeout(runtime.run()).await.unwrap();

    assert!(report.is_success());
    assert_eq!(log.executed(), vec!["less_to_css"]);
    assert!(runtime.core().is_idle());
}

#[tokio::test]
async fn failed_rerun_while_watching_does_not_stop_the_loop() {
    init_tracing();
    let graph = GraphBuilder::docs_pipeline().build();
    let (tx, rx) = mpsc::channel(64);
    let executor =
        FakeExecutor::new(tx.clone()).with_outcome("sphinx_to_html", TaskOutcome::Failed(2));
    let log = executor.log();
    let mut runtime = Runtime::new(core(&graph, TriggerWhileRunningBehaviour::Queue), rx, executor);
    runtime.core_mut().set_exit_when_idle(false);
    let handle = tokio::spawn(async move { runtime.run().await });

    let file_change = || RuntimeEvent::TaskTriggered {
        task: "sphinx_to_html".into(),
        reason: TriggerReason::FileWatch,
    };

    tx.send(file_change()).await.unwrap();
    with_timeout(wait_until(|| log.executed().len() == 1)).await;

    // The loop is still alive after the failure and picks up the next change.
    tx.send(file_change()).await.unwrap();
    with_timeout(wait_until(|| log.executed().len() == 2)).await;
    assert!(!handle.is_finished());

    tx.send(RuntimeEvent::ShutdownRequested).await.unwrap();
    let report = with_timeout(handle).await.unwrap().unwrap();

    assert!(report.interrupted);
    assert!(report.failed.iter().any(|t| t == "sphinx_to_html"));
    assert_eq!(log.executed(), vec!["sphinx_to_html", "sphinx_to_html"]);
}
