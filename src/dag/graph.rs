// src/dag/graph.rs

use std::collections::BTreeMap;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::dag::task::TaskDescriptor;
use crate::engine::TaskName;
use crate::errors::{FrontdagError, Result};

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone)]
struct DagNode {
    /// Direct dependencies: tasks that must finish before this one can run.
    deps: Vec<TaskName>,
    /// Direct dependents: tasks that depend on this one.
    dependents: Vec<TaskName>,
    enabled: bool,
}

/// Validated, acyclic task graph keyed by task name.
#[derive(Debug, Clone)]
pub struct DagGraph {
    nodes: BTreeMap<TaskName, DagNode>,
}

impl DagGraph {
    /// Build and validate a graph from task descriptors.
    ///
    /// Rejects duplicate names, unknown or self dependencies, and cycles.
    pub fn from_tasks(tasks: &[TaskDescriptor]) -> Result<Self> {
        let mut nodes: BTreeMap<TaskName, DagNode> = BTreeMap::new();

        // First pass: create nodes with their dependency lists.
        for task in tasks {
            let node = DagNode {
                deps: task.deps.clone(),
                dependents: Vec::new(),
                enabled: task.is_enabled(),
            };
            if nodes.insert(task.name.clone(), node).is_some() {
                return Err(FrontdagError::ConfigError(format!(
                    "task '{}' is registered twice",
                    task.name
                )));
            }
        }

        validate_dependencies(&nodes)?;
        validate_acyclic(&nodes)?;

        // Second pass: populate dependents based on deps.
        for task in tasks {
            for dep in task.deps.iter() {
                if let Some(dep_node) = nodes.get_mut(dep) {
                    dep_node.dependents.push(task.name.clone());
                }
            }
        }

        Ok(Self { nodes })
    }

    /// Return all task names, sorted.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(|s| s.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.nodes.get(name).is_some_and(|n| n.enabled)
    }

    /// Immediate dependencies of a task.
    pub fn dependencies_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a task.
    pub fn dependents_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// All tasks, parents before children.
    pub fn topological_order(&self) -> Vec<TaskName> {
        let graph = edge_graph(&self.nodes);
        // Validated on construction, so the sort cannot fail.
        toposort(&graph, None)
            .map(|order| order.into_iter().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

/// Edge direction: dep -> task.
fn edge_graph(nodes: &BTreeMap<TaskName, DagNode>) -> DiGraphMap<&str, ()> {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    for name in nodes.keys() {
        graph.add_node(name.as_str());
    }
    for (name, node) in nodes.iter() {
        for dep in node.deps.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }
    graph
}

fn validate_dependencies(nodes: &BTreeMap<TaskName, DagNode>) -> Result<()> {
    for (name, node) in nodes.iter() {
        for dep in node.deps.iter() {
            if dep == name {
                return Err(FrontdagError::ConfigError(format!(
                    "task '{}' cannot depend on itself",
                    name
                )));
            }
            if !nodes.contains_key(dep) {
                return Err(FrontdagError::ConfigError(format!(
                    "task '{}' has unknown dependency '{}'",
                    name, dep
                )));
            }
        }
    }
    Ok(())
}

fn validate_acyclic(nodes: &BTreeMap<TaskName, DagNode>) -> Result<()> {
    let graph = edge_graph(nodes);

    // A topological sort will fail if there is a cycle.
    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(FrontdagError::DagCycle(format!(
            "cycle detected in task DAG involving task '{}'",
            cycle.node_id()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(name: &str, deps: &[&str]) -> TaskDescriptor {
        deps.iter()
            .fold(TaskDescriptor::builder(name), |b, d| b.after(*d))
            .build()
    }

    #[test]
    fn dependents_are_derived_from_deps() {
        let graph = DagGraph::from_tasks(&[
            task("install-node", &[]),
            task("install-npm", &["install-node"]),
            task("install-frontend", &["install-npm"]),
        ])
        .unwrap();

        assert_eq!(graph.dependents_of("install-node"), ["install-npm"]);
        assert_eq!(graph.dependencies_of("install-frontend"), ["install-npm"]);
        assert_eq!(
            graph.topological_order(),
            vec!["install-node", "install-npm", "install-frontend"]
        );
    }

    #[test]
    fn cycle_is_rejected() {
        let err = DagGraph::from_tasks(&[task("A", &["B"]), task("B", &["A"])]).unwrap_err();
        match err {
            FrontdagError::DagCycle(msg) => assert!(msg.contains("cycle detected")),
            other => panic!("expected DagCycle, got {other:?}"),
        }
    }

    #[test]
    fn unknown_and_self_dependencies_are_rejected() {
        let unknown = DagGraph::from_tasks(&[task("A", &["Missing"])]).unwrap_err();
        assert!(matches!(unknown, FrontdagError::ConfigError(msg) if msg.contains("unknown dependency")));

        let own = DagGraph::from_tasks(&[task("A", &["A"])]).unwrap_err();
        assert!(matches!(own, FrontdagError::ConfigError(msg) if msg.contains("itself")));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = DagGraph::from_tasks(&[task("A", &[]), task("A", &[])]).unwrap_err();
        assert!(matches!(err, FrontdagError::ConfigError(_)));
    }
}
