// src/dag/graph.rs

use std::collections::{BTreeMap, BTreeSet};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::errors::{AssetdagError, Result};
use crate::types::TaskName;

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct PlanNode {
    /// Steps that must complete before this one can start.
    deps: BTreeSet<TaskName>,
    /// Steps that wait on this one.
    dependents: BTreeSet<TaskName>,
}

/// Flattened execution graph for one invocation: each step appears once and
/// its dependencies are the union of every ordering constraint on it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    nodes: BTreeMap<TaskName, PlanNode>,
}

impl Plan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `name` (if missing) and union `deps` into its dependencies.
    pub fn add_step<I, S>(&mut self, name: &str, deps: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.nodes.entry(name.to_string()).or_default();

        for dep in deps {
            let dep = dep.as_ref();
            self.nodes
                .entry(dep.to_string())
                .or_default()
                .dependents
                .insert(name.to_string());
            if let Some(node) = self.nodes.get_mut(name) {
                node.deps.insert(dep.to_string());
            }
        }
    }

    /// Union another plan into this one.
    pub fn merge(&mut self, other: &Plan) {
        for (name, node) in other.nodes.iter() {
            self.add_step(name, node.deps.iter());
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// True when the two plans share no step.
    pub fn is_disjoint(&self, other: &Plan) -> bool {
        !other.steps().any(|s| self.contains(s))
    }

    /// Step names in lexical order.
    pub fn steps(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Immediate dependencies of a step.
    pub fn dependencies_of(&self, name: &str) -> Vec<&str> {
        self.nodes
            .get(name)
            .map(|n| n.deps.iter().map(|s| s.as_str()).collect())
            .unwrap_or_default()
    }

    /// Immediate dependents of a step.
    pub fn dependents_of(&self, name: &str) -> Vec<&str> {
        self.nodes
            .get(name)
            .map(|n| n.dependents.iter().map(|s| s.as_str()).collect())
            .unwrap_or_default()
    }

    /// Steps in an order that respects every dependency.
    ///
    /// Fails with [`AssetdagError::Cycle`] naming one step on the cycle.
    pub fn topological_order(&self) -> Result<Vec<TaskName>> {
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

        for name in self.nodes.keys() {
            graph.add_node(name.as_str());
        }
        for (name, node) in self.nodes.iter() {
            for dep in node.deps.iter() {
                graph.add_edge(dep.as_str(), name.as_str(), ());
            }
        }

        match toposort(&graph, None) {
            Ok(order) => Ok(order.into_iter().map(|s| s.to_string()).collect()),
            Err(cycle) => Err(AssetdagError::Cycle(format!(
                "cycle in execution plan involving step '{}'",
                cycle.node_id()
            ))),
        }
    }
}
