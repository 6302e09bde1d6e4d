//! End-to-end runs of CLI entries with real shell commands.

#![cfg(unix)]

use clap::Parser;

use docpipe::cli::CliArgs;
use docpipe::errors::DocpipeError;

use crate::common::{Project, init_tracing, with_timeout};

fn args(project: &Project, rest: &[&str]) -> CliArgs {
    let config = project.config_path();
    let mut argv = vec!["docpipe", "--config", config.to_str().unwrap()];
    argv.extend_from_slice(rest);
    CliArgs::parse_from(argv)
}

#[tokio::test]
async fn versioned_build_runs_in_parent_of_project_dir() {
    init_tracing();
    let project = Project::new();
    project.write(
        "Docpipe.toml",
        "[versions]\ncommand = \"pwd > versions-cwd.txt\"\n",
    );

    with_timeout(docpipe::run(args(&project, &["build-versions"])))
        .await
        .unwrap();

    let cwd = std::fs::read_to_string(project.parent.join("versions-cwd.txt")).unwrap();
    assert_eq!(cwd.trim(), project.parent.to_str().unwrap());
    assert!(!project.dir.join("versions-cwd.txt").exists());
}

#[tokio::test]
async fn document_compiler_runs_in_project_dir() {
    init_tracing();
    let project = Project::new();
    project.write("Docpipe.toml", "[docs]\ncommand = \"echo built > html.txt\"\n");

    with_timeout(docpipe::run(args(&project, &["sphinx_to_html"])))
        .await
        .unwrap();

    let out = std::fs::read_to_string(project.dir.join("html.txt")).unwrap();
    assert_eq!(out.trim(), "built");
}

#[tokio::test]
async fn failing_document_compiler_fails_the_build() {
    init_tracing();
    let project = Project::new();
    project.write("Docpipe.toml", "[docs]\ncommand = \"exit 3\"\n");

    let err = with_timeout(docpipe::run(args(&project, &["build"])))
        .await
        .unwrap_err();

    match err {
        DocpipeError::TasksFailed(tasks) => {
            assert_eq!(tasks, vec!["sphinx_to_html", "build"]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn missing_stylesheet_compiler_fails_less_to_css() {
    init_tracing();
    let project = Project::new();
    project.write("theme/styles.less", "a { color: red; }");
    project.write(
        "Docpipe.toml",
        "[stylesheet]\ncompiler = \"lessc\"\nlessc = \"no-such-lessc-binary\"\n",
    );

    let err = with_timeout(docpipe::run(args(&project, &["less_to_css"])))
        .await
        .unwrap_err();

    match err {
        DocpipeError::TasksFailed(tasks) => assert_eq!(tasks, vec!["less_to_css"]),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!project.dir.join("theme/assets/css/styles.css").exists());
}

#[tokio::test]
async fn failed_initial_build_does_not_start_watching() {
    init_tracing();
    let project = Project::new();
    project.write("Docpipe.toml", "[docs]\ncommand = \"exit 1\"\n");

    // Would block forever if the watcher were installed.
    let err = with_timeout(docpipe::run(args(&project, &["build_and_watch"])))
        .await
        .unwrap_err();
    assert!(matches!(err, DocpipeError::TasksFailed(_)));
}

#[tokio::test]
async fn dry_run_executes_nothing() {
    init_tracing();
    let project = Project::new();
    project.write("Docpipe.toml", "[docs]\ncommand = \"touch ran.txt\"\n");

    with_timeout(docpipe::run(args(&project, &["--dry-run", "develop"])))
        .await
        .unwrap();

    assert!(!project.dir.join("ran.txt").exists());
}

#[tokio::test]
async fn missing_config_file_falls_back_to_defaults() {
    init_tracing();
    let project = Project::new();
    let dir = project.dir.to_str().unwrap();

    with_timeout(docpipe::run(args(
        &project,
        &["--project-dir", dir, "--dry-run", "build-versions"],
    )))
    .await
    .unwrap();
}

#[tokio::test]
async fn invalid_config_is_rejected() {
    init_tracing();
    let project = Project::new();
    project.write("Docpipe.toml", "[watch]\nqueue_length = 0\n");

    let err = docpipe::run(args(&project, &["--dry-run"])).await.unwrap_err();
    assert!(matches!(err, DocpipeError::ConfigError(_)));
}
