//! Handle naming conventions shared by executors and the engine.
//!
//! Routing executors emit the handle names built here as `activeHandles`
//! metadata; the engine compares them against edge source handles. Agent tool
//! discovery uses [`is_resource_handle`] to tell dataflow edges from
//! resource-slot edges.

/// Source handle for a matched switch case.
pub fn case_handle(node_id: &str, case: &str) -> String {
  format!("{}-case-{}", node_id, case)
}

/// Source handle for the true branch of an ifElse node.
pub fn true_handle(node_id: &str) -> String {
  format!("{}-true", node_id)
}

/// Source handle for the false branch of an ifElse node.
pub fn false_handle(node_id: &str) -> String {
  format!("{}-false", node_id)
}

/// Whether a target handle marks a resource slot (tool/model/memory) rather
/// than a dataflow port.
pub fn is_resource_handle(handle: &str) -> bool {
  handle.contains("resource")
}
