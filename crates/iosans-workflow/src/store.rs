use std::collections::HashSet;
use std::sync::RwLock;

use serde_json::{Map, Value};

use crate::edge::Edge;
use crate::error::WorkflowError;
use crate::node::Node;
use crate::workflow::Workflow;

/// In-memory workflow store with uniqueness invariants.
///
/// Invariants enforced on every mutation:
/// - node ids are unique
/// - edges reference existing nodes
/// - no self-loops
/// - the `(source, sourceHandle, target, targetHandle)` quadruple is unique
///
/// Public operations are linearizable; executors receive snapshots and never
/// mutate the store mid-run.
#[derive(Debug, Default)]
pub struct WorkflowStore {
  inner: RwLock<Workflow>,
}

impl WorkflowStore {
  /// Create an empty store.
  pub fn new() -> Self {
    Self::default()
  }

  /// Snapshot the current workflow.
  pub fn snapshot(&self) -> Workflow {
    self.inner.read().expect("workflow store poisoned").clone()
  }

  /// Add a node. Fails on duplicate id.
  pub fn add_node(&self, node: Node) -> Result<(), WorkflowError> {
    let mut wf = self.inner.write().expect("workflow store poisoned");
    if wf.nodes.iter().any(|n| n.id == node.id) {
      return Err(WorkflowError::DuplicateNode(node.id));
    }
    wf.nodes.push(node);
    Ok(())
  }

  /// Replace a node's configuration map.
  pub fn update_node_data(
    &self,
    node_id: &str,
    data: Map<String, Value>,
  ) -> Result<(), WorkflowError> {
    let mut wf = self.inner.write().expect("workflow store poisoned");
    let node = wf
      .nodes
      .iter_mut()
      .find(|n| n.id == node_id)
      .ok_or_else(|| WorkflowError::NodeNotFound(node_id.to_string()))?;
    node.data = data;
    Ok(())
  }

  /// Remove a node and every edge touching it.
  pub fn remove_node(&self, node_id: &str) -> Result<(), WorkflowError> {
    let mut wf = self.inner.write().expect("workflow store poisoned");
    let before = wf.nodes.len();
    wf.nodes.retain(|n| n.id != node_id);
    if wf.nodes.len() == before {
      return Err(WorkflowError::NodeNotFound(node_id.to_string()));
    }
    wf.edges
      .retain(|e| e.source != node_id && e.target != node_id);
    Ok(())
  }

  /// Add an edge, enforcing referential integrity and quadruple uniqueness.
  pub fn add_edge(&self, edge: Edge) -> Result<(), WorkflowError> {
    let mut wf = self.inner.write().expect("workflow store poisoned");
    validate_edge(&wf, &edge)?;
    wf.edges.push(edge);
    Ok(())
  }

  /// Remove an edge by id.
  pub fn remove_edge(&self, edge_id: &str) -> Result<(), WorkflowError> {
    let mut wf = self.inner.write().expect("workflow store poisoned");
    let before = wf.edges.len();
    wf.edges.retain(|e| e.id != edge_id);
    if wf.edges.len() == before {
      return Err(WorkflowError::InvalidDocument(format!(
        "edge not found: {}",
        edge_id
      )));
    }
    Ok(())
  }

  /// Atomically replace all nodes. Edges referencing removed nodes are kept
  /// only if still valid; dangling edges are dropped.
  pub fn set_nodes(&self, nodes: Vec<Node>) -> Result<(), WorkflowError> {
    let mut seen = HashSet::new();
    for node in &nodes {
      if !seen.insert(node.id.as_str()) {
        return Err(WorkflowError::DuplicateNode(node.id.clone()));
      }
    }
    let mut wf = self.inner.write().expect("workflow store poisoned");
    let ids: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
    wf.edges
      .retain(|e| ids.contains(e.source.as_str()) && ids.contains(e.target.as_str()));
    wf.nodes = nodes;
    Ok(())
  }

  /// Atomically replace all edges.
  pub fn set_edges(&self, edges: Vec<Edge>) -> Result<(), WorkflowError> {
    let mut wf = self.inner.write().expect("workflow store poisoned");
    let mut staged = Workflow {
      nodes: wf.nodes.clone(),
      edges: Vec::new(),
    };
    for edge in &edges {
      validate_edge(&staged, edge)?;
      staged.edges.push(edge.clone());
    }
    wf.edges = edges;
    Ok(())
  }

  /// Atomically replace the whole workflow.
  pub fn load_workflow(&self, workflow: Workflow) -> Result<(), WorkflowError> {
    validate_structure(&workflow)?;
    let mut wf = self.inner.write().expect("workflow store poisoned");
    *wf = workflow;
    Ok(())
  }

  /// Drop all nodes and edges.
  pub fn clear(&self) {
    let mut wf = self.inner.write().expect("workflow store poisoned");
    *wf = Workflow::default();
  }

  /// Edges whose target is `node_id`.
  pub fn incoming_edges(&self, node_id: &str) -> Vec<Edge> {
    let wf = self.inner.read().expect("workflow store poisoned");
    wf.edges
      .iter()
      .filter(|e| e.target == node_id)
      .cloned()
      .collect()
  }

  /// Edges whose source is `node_id`.
  pub fn outgoing_edges(&self, node_id: &str) -> Vec<Edge> {
    let wf = self.inner.read().expect("workflow store poisoned");
    wf.edges
      .iter()
      .filter(|e| e.source == node_id)
      .cloned()
      .collect()
  }

  /// Nodes with an edge into `node_id`.
  pub fn upstream_nodes(&self, node_id: &str) -> Vec<Node> {
    let wf = self.inner.read().expect("workflow store poisoned");
    let sources: Vec<&str> = wf
      .edges
      .iter()
      .filter(|e| e.target == node_id)
      .map(|e| e.source.as_str())
      .collect();
    wf.nodes
      .iter()
      .filter(|n| sources.contains(&n.id.as_str()))
      .cloned()
      .collect()
  }

  /// Nodes with an edge out of `node_id`.
  pub fn downstream_nodes(&self, node_id: &str) -> Vec<Node> {
    let wf = self.inner.read().expect("workflow store poisoned");
    let targets: Vec<&str> = wf
      .edges
      .iter()
      .filter(|e| e.source == node_id)
      .map(|e| e.target.as_str())
      .collect();
    wf.nodes
      .iter()
      .filter(|n| targets.contains(&n.id.as_str()))
      .cloned()
      .collect()
  }
}

/// Check an edge against the current workflow contents.
fn validate_edge(wf: &Workflow, edge: &Edge) -> Result<(), WorkflowError> {
  if edge.source == edge.target {
    return Err(WorkflowError::SelfLoop(edge.source.clone()));
  }
  for node_id in [&edge.source, &edge.target] {
    if !wf.nodes.iter().any(|n| &n.id == node_id) {
      return Err(WorkflowError::UnknownNodeReference {
        edge_id: edge.id.clone(),
        node_id: node_id.clone(),
      });
    }
  }
  if wf.edges.iter().any(|e| e.quad_key() == edge.quad_key()) {
    return Err(WorkflowError::DuplicateEdge(edge.id.clone()));
  }
  Ok(())
}

/// Structural validation used by `load_workflow`.
fn validate_structure(workflow: &Workflow) -> Result<(), WorkflowError> {
  let mut seen = HashSet::new();
  for node in &workflow.nodes {
    if !seen.insert(node.id.as_str()) {
      return Err(WorkflowError::DuplicateNode(node.id.clone()));
    }
  }

  let mut staged = Workflow {
    nodes: workflow.nodes.clone(),
    edges: Vec::new(),
  };
  for edge in &workflow.edges {
    validate_edge(&staged, edge)?;
    staged.edges.push(edge.clone());
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::node::NodeKind;

  fn node(id: &str) -> Node {
    Node::new(id, NodeKind::Transform)
  }

  #[test]
  fn test_duplicate_node_rejected() {
    let store = WorkflowStore::new();
    store.add_node(node("a")).unwrap();
    assert!(matches!(
      store.add_node(node("a")),
      Err(WorkflowError::DuplicateNode(_))
    ));
  }

  #[test]
  fn test_self_loop_rejected() {
    let store = WorkflowStore::new();
    store.add_node(node("a")).unwrap();
    assert!(matches!(
      store.add_edge(Edge::new("e1", "a", "a")),
      Err(WorkflowError::SelfLoop(_))
    ));
  }

  #[test]
  fn test_dangling_edge_rejected() {
    let store = WorkflowStore::new();
    store.add_node(node("a")).unwrap();
    assert!(matches!(
      store.add_edge(Edge::new("e1", "a", "missing")),
      Err(WorkflowError::UnknownNodeReference { .. })
    ));
  }

  #[test]
  fn test_duplicate_quadruple_rejected() {
    let store = WorkflowStore::new();
    store.add_node(node("a")).unwrap();
    store.add_node(node("b")).unwrap();
    store.add_edge(Edge::new("e1", "a", "b")).unwrap();
    assert!(matches!(
      store.add_edge(Edge::new("e2", "a", "b")),
      Err(WorkflowError::DuplicateEdge(_))
    ));
    // Different source handle is a different quadruple.
    store
      .add_edge(Edge::new("e3", "a", "b").from_handle("a-true"))
      .unwrap();
  }

  #[test]
  fn test_remove_node_cascades_edges() {
    let store = WorkflowStore::new();
    store.add_node(node("a")).unwrap();
    store.add_node(node("b")).unwrap();
    store.add_edge(Edge::new("e1", "a", "b")).unwrap();
    store.remove_node("b").unwrap();
    assert!(store.outgoing_edges("a").is_empty());
  }

  #[test]
  fn test_set_nodes_drops_dangling_edges() {
    let store = WorkflowStore::new();
    store.add_node(node("a")).unwrap();
    store.add_node(node("b")).unwrap();
    store.add_edge(Edge::new("e1", "a", "b")).unwrap();
    store.set_nodes(vec![node("a")]).unwrap();
    let wf = store.snapshot();
    assert_eq!(wf.nodes.len(), 1);
    assert!(wf.edges.is_empty());
  }

  #[test]
  fn test_selectors() {
    let store = WorkflowStore::new();
    store.add_node(node("a")).unwrap();
    store.add_node(node("b")).unwrap();
    store.add_node(node("c")).unwrap();
    store.add_edge(Edge::new("e1", "a", "b")).unwrap();
    store.add_edge(Edge::new("e2", "b", "c")).unwrap();

    assert_eq!(store.upstream_nodes("b")[0].id, "a");
    assert_eq!(store.downstream_nodes("b")[0].id, "c");
    assert_eq!(store.incoming_edges("c").len(), 1);
    assert_eq!(store.outgoing_edges("a").len(), 1);
  }
}
