use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};

use crate::language::Language;
use crate::types::{EdgeKind, NodeKind};

/// Node in the dependency graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub name: String,
    pub kind: NodeKind,
    pub language: Option<Language>,
    /// File the node was scanned from; absent for external nodes.
    pub path: Option<String>,
    pub sloc: usize,
    pub methods: usize,
}

impl GraphNode {
    /// A dependency target outside the scanned sources.
    pub fn external(statement: &str) -> Self {
        Self {
            id: statement.to_string(),
            name: statement.to_string(),
            kind: NodeKind::External,
            language: None,
            path: None,
            sloc: 0,
            methods: 0,
        }
    }
}

/// Edge in the dependency graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Dependency statement as written in the source.
    pub statement: String,
    pub kind: EdgeKind,
}

/// Mutable graph used while merging scan results.
///
/// Stores at most one edge per ordered node pair and never a self-loop.
pub struct GraphBuilder {
    graph: DiGraph<GraphNode, GraphEdge>,
    index: HashMap<String, NodeIndex>,
    duplicate_statements: usize,
    self_references: usize,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            index: HashMap::new(),
            duplicate_statements: 0,
            self_references: 0,
        }
    }

    /// Add a node. An id that already exists keeps its first node.
    pub fn add_node(&mut self, node: GraphNode) -> NodeIndex {
        if let Some(&idx) = self.index.get(&node.id) {
            return idx;
        }
        let id = node.id.clone();
        let idx = self.graph.add_node(node);
        self.index.insert(id, idx);
        idx
    }

    /// Ensure an external node for an unresolved statement exists.
    pub fn ensure_external(&mut self, statement: &str) -> NodeIndex {
        if let Some(&idx) = self.index.get(statement) {
            return idx;
        }
        self.add_node(GraphNode::external(statement))
    }

    /// Add an edge between two existing node ids.
    ///
    /// Returns false, without storing anything, for unknown ids, self-loops
    /// and pairs that already have an edge.
    pub fn add_dependency(&mut self, from: &str, to: &str, edge: GraphEdge) -> bool {
        let (Some(&from_idx), Some(&to_idx)) = (self.index.get(from), self.index.get(to)) else {
            return false;
        };
        if from_idx == to_idx {
            self.self_references += 1;
            return false;
        }
        if self.graph.find_edge(from_idx, to_idx).is_some() {
            self.duplicate_statements += 1;
            return false;
        }
        self.graph.add_edge(from_idx, to_idx, edge);
        true
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Finish the merge. Nodes are reordered by id so the frozen graph does
    /// not depend on merge order.
    pub fn freeze(self) -> FrozenGraph {
        let mut order: Vec<NodeIndex> = self.graph.node_indices().collect();
        order.sort_by(|&a, &b| self.graph[a].id.cmp(&self.graph[b].id));

        let mut remap = HashMap::with_capacity(order.len());
        let mut graph = DiGraph::with_capacity(self.graph.node_count(), self.graph.edge_count());
        for old in &order {
            let new = graph.add_node(self.graph[*old].clone());
            remap.insert(*old, new);
        }

        let mut edges: Vec<(NodeIndex, NodeIndex, GraphEdge)> = self
            .graph
            .edge_references()
            .map(|e| (remap[&e.source()], remap[&e.target()], e.weight().clone()))
            .collect();
        edges.sort_by_key(|(s, t, _)| (*s, *t));
        for (s, t, edge) in edges {
            graph.add_edge(s, t, edge);
        }

        let index = graph
            .node_indices()
            .map(|idx| (graph[idx].id.clone(), idx))
            .collect();
        FrozenGraph {
            graph,
            index,
            duplicate_statements: self.duplicate_statements,
            self_references: self.self_references,
        }
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only dependency graph. Node indices follow ascending id order.
#[derive(Debug, Clone)]
pub struct FrozenGraph {
    graph: DiGraph<GraphNode, GraphEdge>,
    index: HashMap<String, NodeIndex>,
    duplicate_statements: usize,
    self_references: usize,
}

impl FrozenGraph {
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// All nodes, sorted by id.
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.graph.node_weights()
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.index.get(id).map(|&idx| &self.graph[idx])
    }

    /// Iterate over all edges with their source and target nodes.
    pub fn edges_with_nodes(&self) -> Vec<(&GraphNode, &GraphNode, &GraphEdge)> {
        self.graph
            .edge_references()
            .map(|e| {
                let src = &self.graph[e.source()];
                let tgt = &self.graph[e.target()];
                (src, tgt, e.weight())
            })
            .collect()
    }

    /// Edges as (source position, target position) pairs.
    pub fn edge_positions(&self) -> Vec<(usize, usize)> {
        self.graph
            .edge_references()
            .map(|e| (e.source().index(), e.target().index()))
            .collect()
    }

    pub fn fan_in(&self, id: &str) -> usize {
        self.index.get(id).map_or(0, |&idx| {
            self.graph.edges_directed(idx, Direction::Incoming).count()
        })
    }

    pub fn fan_out(&self, id: &str) -> usize {
        self.index.get(id).map_or(0, |&idx| {
            self.graph.edges_directed(idx, Direction::Outgoing).count()
        })
    }

    /// Statements that named an already-connected target.
    pub fn duplicate_statements(&self) -> usize {
        self.duplicate_statements
    }

    /// Statements that resolved to their own node.
    pub fn self_references(&self) -> usize {
        self.self_references
    }
}
