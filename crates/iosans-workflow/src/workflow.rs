use serde::{Deserialize, Serialize};

use crate::edge::Edge;
use crate::graph::Graph;
use crate::node::Node;

/// A workflow: nodes plus the edges that connect them.
///
/// Order of `nodes` and `edges` follows the source document so round-trips
/// are stable. Acyclicity is required for execution to terminate but is not
/// enforced structurally here; `Graph::topo_order` reports cycles.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Workflow {
  pub nodes: Vec<Node>,
  pub edges: Vec<Edge>,
}

impl Workflow {
  /// Create a workflow from parts.
  pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
    Self { nodes, edges }
  }

  /// Build the graph structure for traversal.
  pub fn graph(&self) -> Graph {
    Graph::new(self)
  }

  /// Get a node by ID.
  pub fn get_node(&self, node_id: &str) -> Option<&Node> {
    self.nodes.iter().find(|n| n.id == node_id)
  }

  /// Get an edge by ID.
  pub fn get_edge(&self, edge_id: &str) -> Option<&Edge> {
    self.edges.iter().find(|e| e.id == edge_id)
  }

  /// All node IDs in document order.
  pub fn node_ids(&self) -> Vec<String> {
    self.nodes.iter().map(|n| n.id.clone()).collect()
  }
}
