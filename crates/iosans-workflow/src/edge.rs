use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A directed edge between two nodes.
///
/// `source_handle` / `target_handle` name the port on each endpoint. Routing
/// nodes (switch / ifElse) gate outgoing edges by source handle; agent nodes
/// discover tools through edges whose target handle marks a resource slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
  pub id: String,
  pub source: String,
  pub target: String,
  #[serde(
    rename = "sourceHandle",
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub source_handle: Option<String>,
  #[serde(
    rename = "targetHandle",
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub target_handle: Option<String>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

impl Edge {
  /// Create a plain edge with no handles.
  pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      source: source.into(),
      target: target.into(),
      source_handle: None,
      target_handle: None,
      extra: Map::new(),
    }
  }

  /// Set the source handle.
  pub fn from_handle(mut self, handle: impl Into<String>) -> Self {
    self.source_handle = Some(handle.into());
    self
  }

  /// Set the target handle.
  pub fn to_handle(mut self, handle: impl Into<String>) -> Self {
    self.target_handle = Some(handle.into());
    self
  }

  /// The uniqueness key for this edge within a workflow.
  pub fn quad_key(&self) -> (&str, Option<&str>, &str, Option<&str>) {
    (
      self.source.as_str(),
      self.source_handle.as_deref(),
      self.target.as_str(),
      self.target_handle.as_deref(),
    )
  }
}
