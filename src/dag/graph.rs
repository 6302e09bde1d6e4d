// src/dag/graph.rs

use std::collections::HashMap;

use crate::dag::declare::TaskGraph;

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone)]
struct DagNode {
    /// Direct dependencies: tasks that must complete before this one can run.
    deps: Vec<String>,
    /// Direct dependents: tasks that depend on this one.
    dependents: Vec<String>,
}

/// Adjacency view of a validated [`TaskGraph`], keyed by task name.
///
/// Acyclicity and reference validity are checked by `TaskRegistry::build`,
/// so here we just keep adjacency information for scheduling.
#[derive(Debug, Clone)]
pub struct DagGraph {
    nodes: HashMap<String, DagNode>,
}

impl DagGraph {
    pub fn from_tasks(tasks: &TaskGraph) -> Self {
        let mut nodes: HashMap<String, DagNode> = tasks
            .iter()
            .map(|decl| {
                (
                    decl.name.clone(),
                    DagNode {
                        deps: decl.deps.clone(),
                        dependents: Vec::new(),
                    },
                )
            })
            .collect();

        for decl in tasks.iter() {
            for dep in &decl.deps {
                if let Some(dep_node) = nodes.get_mut(dep) {
                    dep_node.dependents.push(decl.name.clone());
                }
            }
        }

        Self { nodes }
    }

    /// Immediate dependencies of a task.
    pub fn dependencies_of(&self, name: &str) -> &[String] {
        self.nodes
            .get(name)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a task.
    pub fn dependents_of(&self, name: &str) -> &[String] {
        self.nodes
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }
}
