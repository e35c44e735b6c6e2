//! Traceability graph from projects down to executions

use crate::audit::EntityKind;
use crate::error::{CoreError, CoreResult};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// One entity in the traceability graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TraceNode {
    pub kind: EntityKind,
    pub id: String,
}

impl TraceNode {
    pub fn new(kind: EntityKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

impl fmt::Display for TraceNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}

/// Directed graph with an edge from every entity to each entity that
/// references it
#[derive(Debug, Default)]
pub struct TraceGraph {
    graph: DiGraph<TraceNode, ()>,
    node_map: HashMap<TraceNode, NodeIndex>,
}

impl TraceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity, returning the existing index if already present
    pub fn add_node(&mut self, node: TraceNode) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(&node) {
            idx
        } else {
            let idx = self.graph.add_node(node.clone());
            self.node_map.insert(node, idx);
            idx
        }
    }

    /// Add a parent -> child link
    pub fn add_link(&mut self, parent: TraceNode, child: TraceNode) {
        let parent_idx = self.add_node(parent);
        let child_idx = self.add_node(child);
        self.graph.update_edge(parent_idx, child_idx, ());
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn contains(&self, node: &TraceNode) -> bool {
        self.node_map.contains_key(node)
    }

    /// Validate the graph has no cycles
    pub fn validate(&self) -> CoreResult<()> {
        match toposort(&self.graph, None) {
            Ok(_) => Ok(()),
            Err(cycle) => Err(CoreError::validation(
                "traceability graph",
                format!("cycle through {}", self.graph[cycle.node_id()]),
            )),
        }
    }

    /// Direct children of a node, sorted
    pub fn children(&self, node: &TraceNode) -> Vec<&TraceNode> {
        self.neighbors(node, Direction::Outgoing)
    }

    /// Direct parents of a node, sorted
    pub fn parents(&self, node: &TraceNode) -> Vec<&TraceNode> {
        self.neighbors(node, Direction::Incoming)
    }

    fn neighbors(&self, node: &TraceNode, direction: Direction) -> Vec<&TraceNode> {
        let Some(&idx) = self.node_map.get(node) else {
            return Vec::new();
        };
        let mut out: Vec<&TraceNode> = self
            .graph
            .edges_directed(idx, direction)
            .map(|e| match direction {
                Direction::Outgoing => &self.graph[e.target()],
                Direction::Incoming => &self.graph[e.source()],
            })
            .collect();
        out.sort();
        out.dedup();
        out
    }

    /// Depth-first listing of everything below `root` as `(depth, node)`.
    ///
    /// A node reachable along several paths (a script planned in several
    /// executions, for example) is listed under each parent, but its own
    /// children are expanded only once.
    pub fn tree(&self, root: &TraceNode) -> Vec<(usize, &TraceNode)> {
        let mut out = Vec::new();
        let mut expanded = HashSet::new();
        if let Some(&idx) = self.node_map.get(root) {
            self.walk(idx, 0, &mut expanded, &mut out);
        }
        out
    }

    fn walk<'a>(
        &'a self,
        idx: NodeIndex,
        depth: usize,
        expanded: &mut HashSet<NodeIndex>,
        out: &mut Vec<(usize, &'a TraceNode)>,
    ) {
        let node = &self.graph[idx];
        out.push((depth, node));
        if !expanded.insert(idx) {
            return;
        }
        for child in self.children(node) {
            if let Some(&child_idx) = self.node_map.get(child) {
                self.walk(child_idx, depth + 1, expanded, out);
            }
        }
    }
}
