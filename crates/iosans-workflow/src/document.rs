//! Workflow document import/export.
//!
//! The canonical on-disk form is a UTF-8 JSON document:
//!
//! ```json
//! { "nodes": [ {"id", "type", "position": {"x","y"}, "data": {...}} ],
//!   "edges": [ {"id", "source", "target", "sourceHandle?", "targetHandle?"} ] }
//! ```
//!
//! Unknown keys on nodes and edges survive a round-trip. Import validates
//! node-id uniqueness and edge reference integrity and rejects on violation;
//! `validate_workflow` reports the full violation list for tooling.

use std::collections::HashSet;

use crate::error::WorkflowError;
use crate::workflow::Workflow;

/// Storage key for the persisted canonical document.
pub const PERSIST_KEY: &str = "iosans-workflow";

/// A single validation finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
  DuplicateNodeId(String),
  DuplicateEdge(String),
  SelfLoop(String),
  UnknownNodeReference { edge_id: String, node_id: String },
  EmptyWorkflow,
  Cycle,
}

impl std::fmt::Display for Violation {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Violation::DuplicateNodeId(id) => write!(f, "duplicate node id: {}", id),
      Violation::DuplicateEdge(id) => write!(f, "duplicate edge: {}", id),
      Violation::SelfLoop(id) => write!(f, "self-loop on node: {}", id),
      Violation::UnknownNodeReference { edge_id, node_id } => {
        write!(f, "edge '{}' references unknown node: {}", edge_id, node_id)
      }
      Violation::EmptyWorkflow => write!(f, "workflow has no nodes"),
      Violation::Cycle => write!(f, "workflow contains a cycle"),
    }
  }
}

/// Collect every structural violation in a workflow.
pub fn validate_workflow(workflow: &Workflow) -> Vec<Violation> {
  let mut violations = Vec::new();

  if workflow.nodes.is_empty() {
    violations.push(Violation::EmptyWorkflow);
  }

  let mut seen_nodes = HashSet::new();
  for node in &workflow.nodes {
    if !seen_nodes.insert(node.id.as_str()) {
      violations.push(Violation::DuplicateNodeId(node.id.clone()));
    }
  }

  let node_ids: HashSet<&str> = workflow.nodes.iter().map(|n| n.id.as_str()).collect();
  let mut seen_quads = HashSet::new();
  for edge in &workflow.edges {
    if edge.source == edge.target {
      violations.push(Violation::SelfLoop(edge.source.clone()));
    }
    for node_id in [&edge.source, &edge.target] {
      if !node_ids.contains(node_id.as_str()) {
        violations.push(Violation::UnknownNodeReference {
          edge_id: edge.id.clone(),
          node_id: node_id.clone(),
        });
      }
    }
    let quad = (
      edge.source.clone(),
      edge.source_handle.clone(),
      edge.target.clone(),
      edge.target_handle.clone(),
    );
    if !seen_quads.insert(quad) {
      violations.push(Violation::DuplicateEdge(edge.id.clone()));
    }
  }

  if !workflow.nodes.is_empty() && workflow.graph().has_cycle() {
    violations.push(Violation::Cycle);
  }

  violations
}

/// Parse and validate a workflow document.
pub fn import_workflow(json: &str) -> Result<Workflow, WorkflowError> {
  let workflow: Workflow = serde_json::from_str(json)
    .map_err(|e| WorkflowError::InvalidDocument(format!("parse failure: {}", e)))?;

  // Cycles are an execution-time property; import only enforces the
  // structural invariants.
  for violation in validate_workflow(&workflow) {
    match violation {
      Violation::Cycle | Violation::EmptyWorkflow => continue,
      Violation::DuplicateNodeId(id) => return Err(WorkflowError::DuplicateNode(id)),
      Violation::DuplicateEdge(id) => return Err(WorkflowError::DuplicateEdge(id)),
      Violation::SelfLoop(id) => return Err(WorkflowError::SelfLoop(id)),
      Violation::UnknownNodeReference { edge_id, node_id } => {
        return Err(WorkflowError::UnknownNodeReference { edge_id, node_id });
      }
    }
  }

  Ok(workflow)
}

/// Serialize a workflow to the canonical pretty-printed document.
pub fn export_workflow(workflow: &Workflow) -> Result<String, WorkflowError> {
  serde_json::to_string_pretty(workflow)
    .map_err(|e| WorkflowError::InvalidDocument(format!("serialize failure: {}", e)))
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_import_round_trip_preserves_unknown_keys() {
    let doc = json!({
      "nodes": [
        { "id": "t", "type": "manualTrigger", "data": {},
          "position": { "x": 0.0, "y": 0.0 }, "selected": true }
      ],
      "edges": []
    })
    .to_string();

    let wf = import_workflow(&doc).unwrap();
    let out = export_workflow(&wf).unwrap();
    let back: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(back["nodes"][0]["selected"], json!(true));
    assert_eq!(back["nodes"][0]["type"], json!("manualTrigger"));
  }

  #[test]
  fn test_import_rejects_dangling_edge() {
    let doc = json!({
      "nodes": [{ "id": "a", "type": "start", "data": {} }],
      "edges": [{ "id": "e1", "source": "a", "target": "ghost" }]
    })
    .to_string();

    assert!(matches!(
      import_workflow(&doc),
      Err(WorkflowError::UnknownNodeReference { .. })
    ));
  }

  #[test]
  fn test_import_rejects_duplicate_node_id() {
    let doc = json!({
      "nodes": [
        { "id": "a", "type": "start", "data": {} },
        { "id": "a", "type": "end", "data": {} }
      ],
      "edges": []
    })
    .to_string();

    assert!(matches!(
      import_workflow(&doc),
      Err(WorkflowError::DuplicateNode(_))
    ));
  }

  #[test]
  fn test_validate_reports_all_violations() {
    let doc: Workflow = serde_json::from_value(json!({
      "nodes": [
        { "id": "a", "type": "start", "data": {} },
        { "id": "a", "type": "end", "data": {} }
      ],
      "edges": [
        { "id": "e1", "source": "a", "target": "a" },
        { "id": "e2", "source": "a", "target": "ghost" }
      ]
    }))
    .unwrap();

    let violations = validate_workflow(&doc);
    assert!(violations.contains(&Violation::DuplicateNodeId("a".into())));
    assert!(violations.iter().any(|v| matches!(v, Violation::SelfLoop(_))));
    assert!(
      violations
        .iter()
        .any(|v| matches!(v, Violation::UnknownNodeReference { .. }))
    );
  }

  #[test]
  fn test_persist_key() {
    assert_eq!(PERSIST_KEY, "iosans-workflow");
  }
}
