//! Core graph data structure.
//!
//! The ResourceGraph wraps petgraph and adds an id index for fast lookups.
//! It's what the assembler produces and what layout consumes.

use crate::edge::GraphEdge;
use crate::node::GraphNode;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Unique identifier for a node in the graph.
pub type NodeId = NodeIndex;

/// The visible resource graph for one mode and expansion state.
///
/// Nodes and edges keep insertion order, which layout uses to break ties.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceGraph {
    /// The underlying petgraph graph.
    pub(crate) graph: DiGraph<GraphNode, GraphEdge>,

    /// Maps resource ids to graph node indexes.
    id_index: HashMap<String, NodeId>,
}

impl Default for ResourceGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceGraph {
    /// Creates a new empty graph.
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            id_index: HashMap::new(),
        }
    }

    /// Adds a node. A node whose id is already present is ignored and the
    /// existing index returned.
    pub fn add_node(&mut self, node: GraphNode) -> NodeId {
        if let Some(&index) = self.id_index.get(&node.id) {
            return index;
        }
        let id = node.id.clone();
        let index = self.graph.add_node(node);
        self.id_index.insert(id, index);
        index
    }

    /// Adds an edge between two nodes by id.
    ///
    /// Returns false, adding nothing, when either endpoint is missing.
    pub fn add_edge(&mut self, edge: GraphEdge) -> bool {
        match (self.get_index(&edge.source), self.get_index(&edge.target)) {
            (Some(from), Some(to)) => {
                self.graph.add_edge(from, to, edge);
                true
            }
            _ => false,
        }
    }

    /// Gets a node by its resource id.
    pub fn get_by_id(&self, id: &str) -> Option<&GraphNode> {
        let index = self.id_index.get(id)?;
        self.graph.node_weight(*index)
    }

    /// Gets the node index for a resource id.
    pub fn get_index(&self, id: &str) -> Option<NodeId> {
        self.id_index.get(id).copied()
    }

    /// Returns true if a node with this id is present.
    pub fn contains(&self, id: &str) -> bool {
        self.id_index.contains_key(id)
    }

    /// Edges arriving at a node.
    pub fn incoming(&self, id: &str) -> Vec<&GraphEdge> {
        self.edges_directed(id, Direction::Incoming)
    }

    /// Edges leaving a node.
    pub fn outgoing(&self, id: &str) -> Vec<&GraphEdge> {
        self.edges_directed(id, Direction::Outgoing)
    }

    fn edges_directed(&self, id: &str, direction: Direction) -> Vec<&GraphEdge> {
        let Some(index) = self.get_index(id) else {
            return Vec::new();
        };
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(index, direction)
            .map(|edge_ref| (edge_ref.id(), edge_ref.weight()))
            .collect();
        // petgraph walks adjacency lists newest first
        edges.sort_by_key(|(edge_id, _)| *edge_id);
        edges.into_iter().map(|(_, edge)| edge).collect()
    }

    /// Returns the number of nodes.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Returns true when the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Iterates over all nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.graph.node_weights()
    }

    /// Iterates over all edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = &GraphEdge> {
        self.graph.edge_weights()
    }

    /// Splits the graph into node and edge lists.
    pub fn into_parts(self) -> (Vec<GraphNode>, Vec<GraphEdge>) {
        let (nodes, edges) = self.graph.into_nodes_edges();
        (
            nodes.into_iter().map(|n| n.weight).collect(),
            edges.into_iter().map(|e| e.weight).collect(),
        )
    }
}

/// Graph statistics for summaries.
#[derive(Debug, Serialize, Deserialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    /// Nodes with no incoming edge.
    pub roots: usize,
}

impl ResourceGraph {
    /// Returns graph statistics.
    pub fn stats(&self) -> GraphStats {
        let roots = self
            .graph
            .node_indices()
            .filter(|&idx| {
                self.graph
                    .neighbors_directed(idx, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .count();

        GraphStats {
            node_count: self.node_count(),
            edge_count: self.edge_count(),
            roots,
        }
    }
}
