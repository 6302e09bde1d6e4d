// src/dag/declare.rs

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::engine::TaskName;
use crate::errors::{DocpipeError, Result};
use crate::stylesheet::StylesheetSpec;

/// External command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Command line, run through the platform shell.
    pub command: String,
    /// Working directory override; `None` inherits the process cwd.
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            cwd: None,
        }
    }

    pub fn in_dir(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }
}

/// What a task does once its dependencies are satisfied.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskAction {
    /// No work of its own: completes as soon as it is dispatched.
    Barrier,
    /// Compile every matching stylesheet into the flat CSS directory.
    Stylesheet(StylesheetSpec),
    /// Run an external process; complete when it exits.
    Command(CommandSpec),
}

impl fmt::Display for TaskAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskAction::Barrier => write!(f, "barrier"),
            TaskAction::Stylesheet(spec) => write!(
                f,
                "stylesheets {} -> {}",
                spec.theme_dir.join(&spec.glob).display(),
                spec.output_dir.display()
            ),
            TaskAction::Command(cmd) => match &cmd.cwd {
                Some(cwd) => write!(f, "`{}` (in {})", cmd.command, cwd.display()),
                None => write!(f, "`{}`", cmd.command),
            },
        }
    }
}

/// A declared task.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDecl {
    pub name: TaskName,
    pub deps: Vec<TaskName>,
    pub action: TaskAction,
}

/// Collects task declarations before they are frozen into a [`TaskGraph`].
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: BTreeMap<TaskName, TaskDecl>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task. Names must be unique.
    pub fn declare<I, S>(
        &mut self,
        name: impl Into<TaskName>,
        deps: I,
        action: TaskAction,
    ) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        let name = name.into();
        if self.tasks.contains_key(&name) {
            return Err(DocpipeError::ConfigError(format!(
                "task '{name}' is declared twice"
            )));
        }
        let decl = TaskDecl {
            name: name.clone(),
            deps: deps.into_iter().map(Into::into).collect(),
            action,
        };
        self.tasks.insert(name, decl);
        Ok(self)
    }

    /// Validate the declarations and freeze them.
    ///
    /// Checks for:
    /// - at least one task,
    /// - unknown or self dependencies,
    /// - cycles.
    pub fn build(self) -> Result<TaskGraph> {
        ensure_has_tasks(&self.tasks)?;
        validate_task_dependencies(&self.tasks)?;
        validate_dag(&self.tasks)?;
        Ok(TaskGraph { tasks: self.tasks })
    }
}

/// Validated, immutable set of tasks.
#[derive(Debug, Clone)]
pub struct TaskGraph {
    tasks: BTreeMap<TaskName, TaskDecl>,
}

impl TaskGraph {
    pub fn get(&self, name: &str) -> Option<&TaskDecl> {
        self.tasks.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    /// Declarations in name order.
    pub fn iter(&self) -> impl Iterator<Item = &TaskDecl> {
        self.tasks.values()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Resolve a name or fail with [`DocpipeError::TaskNotFound`].
    pub fn require(&self, name: &str) -> Result<&TaskDecl> {
        self.get(name)
            .ok_or_else(|| DocpipeError::TaskNotFound(name.to_string()))
    }
}

fn ensure_has_tasks(tasks: &BTreeMap<TaskName, TaskDecl>) -> Result<()> {
    if tasks.is_empty() {
        return Err(DocpipeError::ConfigError(
            "task graph must contain at least one task".to_string(),
        ));
    }
    Ok(())
}

fn validate_task_dependencies(tasks: &BTreeMap<TaskName, TaskDecl>) -> Result<()> {
    for (name, task) in tasks.iter() {
        for dep in task.deps.iter() {
            if dep == name {
                return Err(DocpipeError::ConfigError(format!(
                    "task '{name}' cannot depend on itself"
                )));
            }
            if !tasks.contains_key(dep) {
                return Err(DocpipeError::ConfigError(format!(
                    "task '{name}' has unknown dependency '{dep}'"
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(tasks: &BTreeMap<TaskName, TaskDecl>) -> Result<()> {
    // Edge direction: dep -> task.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in tasks.keys() {
        graph.add_node(name.as_str());
    }

    for (name, task) in tasks.iter() {
        for dep in task.deps.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            let node = cycle.node_id();
            Err(DocpipeError::DagCycle(format!(
                "cycle detected in task graph involving task '{node}'"
            )))
        }
    }
}
