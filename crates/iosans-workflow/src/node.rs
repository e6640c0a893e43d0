use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The closed set of node types the engine knows how to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
  ManualTrigger,
  ScheduleTrigger,
  AiAgent,
  Llm,
  CodeExecutor,
  HttpRequest,
  IfElse,
  Switch,
  Merge,
  Delay,
  Transform,
  Python,
  TextToSpeech,
  ImageGeneration,
  Output,
  Start,
  End,
}

impl NodeKind {
  /// The wire tag for this kind (matches the serde representation).
  pub fn as_str(&self) -> &'static str {
    match self {
      NodeKind::ManualTrigger => "manualTrigger",
      NodeKind::ScheduleTrigger => "scheduleTrigger",
      NodeKind::AiAgent => "aiAgent",
      NodeKind::Llm => "llm",
      NodeKind::CodeExecutor => "codeExecutor",
      NodeKind::HttpRequest => "httpRequest",
      NodeKind::IfElse => "ifElse",
      NodeKind::Switch => "switch",
      NodeKind::Merge => "merge",
      NodeKind::Delay => "delay",
      NodeKind::Transform => "transform",
      NodeKind::Python => "python",
      NodeKind::TextToSpeech => "textToSpeech",
      NodeKind::ImageGeneration => "imageGeneration",
      NodeKind::Output => "output",
      NodeKind::Start => "start",
      NodeKind::End => "end",
    }
  }

  /// Whether this kind starts a run without upstream inputs.
  pub fn is_trigger(&self) -> bool {
    matches!(
      self,
      NodeKind::ManualTrigger | NodeKind::ScheduleTrigger | NodeKind::Start
    )
  }

  /// Whether this kind terminates a run (no outgoing edges fire).
  pub fn is_terminal(&self) -> bool {
    matches!(self, NodeKind::Output | NodeKind::End)
  }
}

impl std::fmt::Display for NodeKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Editor position. Carried through import/export, ignored by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
  pub x: f64,
  pub y: f64,
}

/// A single workflow node.
///
/// `id` is immutable identity; `data` is the type-specific configuration map.
/// Keys the engine does not recognize are preserved for round-tripping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
  pub id: String,
  #[serde(rename = "type")]
  pub kind: NodeKind,
  #[serde(default)]
  pub data: Map<String, Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub position: Option<Position>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

impl Node {
  /// Create a node with empty configuration.
  pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
    Self {
      id: id.into(),
      kind,
      data: Map::new(),
      position: None,
      extra: Map::new(),
    }
  }

  /// Create a node with the given configuration map.
  pub fn with_data(id: impl Into<String>, kind: NodeKind, data: Map<String, Value>) -> Self {
    Self {
      id: id.into(),
      kind,
      data,
      position: None,
      extra: Map::new(),
    }
  }

  /// Fetch a configuration value by key.
  pub fn config(&self, key: &str) -> Option<&Value> {
    self.data.get(key)
  }

  /// Fetch a configuration string by key.
  pub fn config_str(&self, key: &str) -> Option<&str> {
    self.data.get(key).and_then(|v| v.as_str())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_kind_round_trip_tags() {
    for (kind, tag) in [
      (NodeKind::ManualTrigger, "manualTrigger"),
      (NodeKind::ScheduleTrigger, "scheduleTrigger"),
      (NodeKind::AiAgent, "aiAgent"),
      (NodeKind::CodeExecutor, "codeExecutor"),
      (NodeKind::IfElse, "ifElse"),
      (NodeKind::TextToSpeech, "textToSpeech"),
      (NodeKind::End, "end"),
    ] {
      assert_eq!(serde_json::to_value(kind).unwrap(), json!(tag));
      assert_eq!(kind.as_str(), tag);
    }
  }

  #[test]
  fn test_node_preserves_unknown_keys() {
    let raw = json!({
      "id": "n1",
      "type": "llm",
      "data": { "modelId": "m" },
      "position": { "x": 10.0, "y": 20.0 },
      "style": { "color": "red" }
    });

    let node: Node = serde_json::from_value(raw.clone()).unwrap();
    assert_eq!(node.id, "n1");
    assert_eq!(node.kind, NodeKind::Llm);
    assert!(node.extra.contains_key("style"));

    let back = serde_json::to_value(&node).unwrap();
    assert_eq!(back["style"]["color"], json!("red"));
  }
}
