//! Real filesystem watcher driven by temporary projects.

use std::time::Duration;

use tokio::sync::mpsc;

use docpipe::config::{ConfigFile, PathsSection};
use docpipe::engine::{RuntimeEvent, TriggerReason};
use docpipe::errors::DocpipeError;
use docpipe::pipeline::{ProjectPaths, build_task_graph};
use docpipe::watch::{WatchProfile, WatchSet, spawn_watcher};

use crate::common::{Project, init_tracing, with_timeout};

fn watch_set(project: &Project, profile: WatchProfile) -> WatchSet {
    let paths = ProjectPaths::resolve(&project.dir, &PathsSection::default()).unwrap();
    let graph = build_task_graph(&ConfigFile::default(), &paths).unwrap();
    WatchSet::for_profile(profile, &paths, &graph).unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn editing_markup_triggers_document_compiler() {
    init_tracing();
    let project = Project::new();
    project.write("index.rst", "Title\n=====\n");
    project.write("theme/layout.html", "<html></html>");

    let (tx, mut rx) = mpsc::channel(16);
    let _handle = spawn_watcher(
        watch_set(&project, WatchProfile::Build),
        Duration::from_millis(50),
        tx,
    )
    .unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    project.write("guide/intro.rst", "Intro\n");

    let event = with_timeout(rx.recv()).await.unwrap();
    match event {
        RuntimeEvent::TaskTriggered { task, reason } => {
            assert_eq!(task, "sphinx_to_html");
            assert_eq!(reason, TriggerReason::FileWatch);
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn output_tree_changes_trigger_nothing() {
    init_tracing();
    let project = Project::new();
    project.write("index.rst", "Title\n");
    project.write("theme/layout.html", "<html></html>");
    project.write("_build/html/.keep", "");

    let (tx, mut rx) = mpsc::channel(16);
    let _handle = spawn_watcher(
        watch_set(&project, WatchProfile::Build),
        Duration::from_millis(50),
        tx,
    )
    .unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    project.write("_build/html/_sources/index.rst", "copied source");
    project.write("notes.txt", "not watched");
    tokio::time::sleep(Duration::from_millis(500)).await;

    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn missing_watch_root_is_a_setup_error() {
    init_tracing();
    let project = Project::new();
    let section = PathsSection {
        theme_dir: "../missing-theme".into(),
        css_output_dir: "../missing-theme/assets/css".into(),
        ..PathsSection::default()
    };
    let paths = ProjectPaths::resolve(&project.dir, &section).unwrap();
    let graph = build_task_graph(&ConfigFile::default(), &paths).unwrap();
    let set = WatchSet::for_profile(WatchProfile::Develop, &paths, &graph).unwrap();

    let (tx, _rx) = mpsc::channel(16);
    let err = spawn_watcher(set, Duration::from_millis(50), tx).unwrap_err();
    assert!(matches!(err, DocpipeError::WatchSetup(_)));
}
