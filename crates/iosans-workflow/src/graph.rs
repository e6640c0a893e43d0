use std::collections::{HashMap, HashSet, VecDeque};

use crate::edge::Edge;
use crate::error::WorkflowError;
use crate::workflow::Workflow;

/// Graph structure for traversal and analysis, built once per run.
///
/// Keeps both id-level adjacency and the full incoming/outgoing edge records;
/// the latter are needed for handle-aware filtering (conditional routing and
/// agent resource edges).
#[derive(Debug, Clone)]
pub struct Graph {
  /// node_id -> upstream node_ids (deduplicated, insertion order).
  incoming: HashMap<String, Vec<String>>,
  /// node_id -> downstream node_ids (deduplicated, insertion order).
  outgoing: HashMap<String, Vec<String>>,
  /// node_id -> full incoming edge records.
  incoming_edges: HashMap<String, Vec<Edge>>,
  /// node_id -> full outgoing edge records.
  outgoing_edges: HashMap<String, Vec<Edge>>,
  /// Nodes with no incoming edges, in document order.
  start_nodes: Vec<String>,
}

impl Graph {
  /// Build a graph from a workflow snapshot.
  pub fn new(workflow: &Workflow) -> Self {
    let mut incoming: HashMap<String, Vec<String>> = HashMap::new();
    let mut outgoing: HashMap<String, Vec<String>> = HashMap::new();
    let mut incoming_edges: HashMap<String, Vec<Edge>> = HashMap::new();
    let mut outgoing_edges: HashMap<String, Vec<Edge>> = HashMap::new();

    for node in &workflow.nodes {
      incoming.entry(node.id.clone()).or_default();
      outgoing.entry(node.id.clone()).or_default();
      incoming_edges.entry(node.id.clone()).or_default();
      outgoing_edges.entry(node.id.clone()).or_default();
    }

    for edge in &workflow.edges {
      let down = outgoing.entry(edge.source.clone()).or_default();
      if !down.contains(&edge.target) {
        down.push(edge.target.clone());
      }
      let up = incoming.entry(edge.target.clone()).or_default();
      if !up.contains(&edge.source) {
        up.push(edge.source.clone());
      }
      outgoing_edges
        .entry(edge.source.clone())
        .or_default()
        .push(edge.clone());
      incoming_edges
        .entry(edge.target.clone())
        .or_default()
        .push(edge.clone());
    }

    let start_nodes: Vec<String> = workflow
      .nodes
      .iter()
      .filter(|n| incoming.get(&n.id).is_none_or(|v| v.is_empty()))
      .map(|n| n.id.clone())
      .collect();

    Self {
      incoming,
      outgoing,
      incoming_edges,
      outgoing_edges,
      start_nodes,
    }
  }

  /// Nodes with no incoming edges, in document order.
  pub fn start_nodes(&self) -> &[String] {
    &self.start_nodes
  }

  /// Upstream node ids for a node.
  pub fn upstream(&self, node_id: &str) -> &[String] {
    self
      .incoming
      .get(node_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Downstream node ids for a node.
  pub fn downstream(&self, node_id: &str) -> &[String] {
    self
      .outgoing
      .get(node_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Full incoming edge records for a node.
  pub fn incoming_edges(&self, node_id: &str) -> &[Edge] {
    self
      .incoming_edges
      .get(node_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Full outgoing edge records for a node.
  pub fn outgoing_edges(&self, node_id: &str) -> &[Edge] {
    self
      .outgoing_edges
      .get(node_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Whether a node has more than one upstream source.
  pub fn is_join_point(&self, node_id: &str) -> bool {
    self.upstream(node_id).len() > 1
  }

  /// Topological order over all nodes.
  ///
  /// Kahn's algorithm; fails with `CycleDetected` if any node is unreachable
  /// because of a cycle.
  pub fn topo_order(&self) -> Result<Vec<String>, WorkflowError> {
    let mut in_degree: HashMap<&str, usize> = self
      .incoming
      .iter()
      .map(|(id, ups)| (id.as_str(), ups.len()))
      .collect();

    let mut queue: VecDeque<&str> = self.start_nodes.iter().map(|s| s.as_str()).collect();
    let mut sorted = Vec::with_capacity(self.incoming.len());

    while let Some(node_id) = queue.pop_front() {
      sorted.push(node_id.to_owned());

      for next in self.downstream(node_id) {
        if let Some(deg) = in_degree.get_mut(next.as_str()) {
          *deg -= 1;
          if *deg == 0 {
            queue.push_back(next);
          }
        }
      }
    }

    if sorted.len() != self.incoming.len() {
      return Err(WorkflowError::CycleDetected);
    }

    Ok(sorted)
  }

  /// Whether the graph contains a cycle.
  pub fn has_cycle(&self) -> bool {
    self.topo_order().is_err()
  }

  /// All node ids known to the graph.
  pub fn node_ids(&self) -> HashSet<String> {
    self.incoming.keys().cloned().collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::node::{Node, NodeKind};

  fn workflow(nodes: &[&str], edges: &[(&str, &str)]) -> Workflow {
    Workflow {
      nodes: nodes
        .iter()
        .map(|id| Node::new(*id, NodeKind::Transform))
        .collect(),
      edges: edges
        .iter()
        .enumerate()
        .map(|(i, (s, t))| Edge::new(format!("e{}", i), *s, *t))
        .collect(),
    }
  }

  #[test]
  fn test_start_nodes_and_adjacency() {
    let wf = workflow(&["a", "b", "c"], &[("a", "b"), ("b", "c")]);
    let graph = wf.graph();

    assert_eq!(graph.start_nodes(), &["a".to_string()]);
    assert_eq!(graph.downstream("a"), &["b".to_string()]);
    assert_eq!(graph.upstream("c"), &["b".to_string()]);
    assert_eq!(graph.incoming_edges("b").len(), 1);
    assert_eq!(graph.outgoing_edges("b").len(), 1);
  }

  #[test]
  fn test_join_point_detection() {
    let wf = workflow(&["a", "b", "m"], &[("a", "m"), ("b", "m")]);
    let graph = wf.graph();
    assert!(graph.is_join_point("m"));
    assert!(!graph.is_join_point("a"));
  }

  #[test]
  fn test_topo_order_linear() {
    let wf = workflow(&["a", "b", "c"], &[("a", "b"), ("b", "c")]);
    let order = wf.graph().topo_order().unwrap();
    assert_eq!(order, vec!["a", "b", "c"]);
  }

  #[test]
  fn test_cycle_detected() {
    let wf = workflow(&["a", "b"], &[("a", "b"), ("b", "a")]);
    assert!(wf.graph().has_cycle());
    assert!(matches!(
      wf.graph().topo_order(),
      Err(WorkflowError::CycleDetected)
    ));
  }

  #[test]
  fn test_parallel_edges_dedup_adjacency() {
    let mut wf = workflow(&["a", "b"], &[("a", "b")]);
    wf.edges
      .push(Edge::new("e9", "a", "b").from_handle("a-true"));
    let graph = wf.graph();
    // Two edge records, one adjacency entry.
    assert_eq!(graph.outgoing_edges("a").len(), 2);
    assert_eq!(graph.downstream("a"), &["b".to_string()]);
  }
}
