use docpipe::dag::{CommandSpec, TaskAction, TaskGraph, TaskRegistry};

/// Builder for `TaskGraph` to simplify scheduler and runtime tests.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    registry: TaskRegistry,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn barrier(mut self, name: &str, deps: &[&str]) -> Self {
        self.registry
            .declare(name, deps.iter().copied(), TaskAction::Barrier)
            .expect("duplicate task in GraphBuilder");
        self
    }

    pub fn command(mut self, name: &str, deps: &[&str], cmd: &str) -> Self {
        self.registry
            .declare(
                name,
                deps.iter().copied(),
                TaskAction::Command(CommandSpec::new(cmd)),
            )
            .expect("duplicate task in GraphBuilder");
        self
    }

    /// `less_to_css` + `sphinx_to_html` fanning into `build`.
    pub fn docs_pipeline() -> Self {
        Self::new()
            .command("less_to_css", &[], "true")
            .command("sphinx_to_html", &[], "true")
            .barrier("build", &["less_to_css", "sphinx_to_html"])
    }

    pub fn build(self) -> TaskGraph {
        self.registry.build().expect("invalid graph from GraphBuilder")
    }
}
