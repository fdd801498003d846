//! Learned workflow graph: statuses as nodes, transitions as edges.

use crate::types::{Status, Transition};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, EdgeRef};
use std::collections::HashMap;

/// Directed graph of statuses observed while working with issues.
///
/// Status names are matched case-insensitively; the first spelling seen is kept.
#[derive(Debug, Clone, Default)]
pub struct WorkflowGraph {
    graph: DiGraph<String, Transition>,
    status_indices: HashMap<String, NodeIndex>,
}

impl WorkflowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn normalize(name: &str) -> String {
        name.trim().to_lowercase()
    }

    fn node(&self, name: &str) -> Option<NodeIndex> {
        self.status_indices.get(&Self::normalize(name)).copied()
    }

    /// Add a status if unknown and return its node
    pub fn add_status(&mut self, name: &str) -> NodeIndex {
        if let Some(node) = self.node(name) {
            return node;
        }
        let node = self.graph.add_node(name.trim().to_string());
        self.status_indices.insert(Self::normalize(name), node);
        node
    }

    /// Record a transition available from `from`; duplicates are ignored
    pub fn add_transition(&mut self, from: &str, transition: &Transition) {
        let source = self.add_status(from);
        let target = self.add_status(&transition.to.name);

        let known = self
            .graph
            .edges(source)
            .any(|e| e.target() == target && e.weight().id == transition.id);
        if !known {
            self.graph.add_edge(source, target, transition.clone());
        }
    }

    /// Fewest-hop transition sequence between two statuses
    pub fn shortest_path(&self, from: &str, to: &str) -> Option<Vec<Transition>> {
        let start = self.node(from)?;
        let goal = self.node(to)?;
        if start == goal {
            return Some(Vec::new());
        }

        let (_, nodes) = petgraph::algo::astar(&self.graph, start, |n| n == goal, |_| 1, |_| 0)?;

        nodes
            .windows(2)
            .map(|pair| {
                self.graph
                    .find_edge(pair[0], pair[1])
                    .map(|edge| self.graph[edge].clone())
            })
            .collect()
    }

    /// All known statuses, sorted
    pub fn statuses(&self) -> Vec<String> {
        let mut statuses: Vec<String> = self.graph.node_weights().cloned().collect();
        statuses.sort();
        statuses
    }

    /// Statuses reachable from `status` through known transitions, excluding itself
    pub fn reachable_from(&self, status: &str) -> Vec<String> {
        let Some(start) = self.node(status) else {
            return Vec::new();
        };

        let mut dfs = Dfs::new(&self.graph, start);
        let mut reachable = Vec::new();
        while let Some(node) = dfs.next(&self.graph) {
            if node != start {
                reachable.push(self.graph[node].clone());
            }
        }
        reachable.sort();
        reachable
    }

    pub fn contains(&self, status: &str) -> bool {
        self.node(status).is_some()
    }
}

/// Convenience for building transitions in tests and fakes
pub fn transition(id: &str, name: &str, to: &str) -> Transition {
    Transition {
        id: id.to_string(),
        name: name.to_string(),
        to: Status::named(to),
    }
}
