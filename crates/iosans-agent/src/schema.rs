use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use iosans_workflow::NodeKind;

/// JSON-Schema-shaped description advertising a tool to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
  pub name: String,
  pub description: String,
  pub parameters: Value,
}

impl ToolSchema {
  /// The parameter names with their descriptions, for prompt rendering.
  pub fn parameter_list(&self) -> Vec<(String, String)> {
    self
      .parameters
      .get("properties")
      .and_then(|p| p.as_object())
      .map(|props| {
        props
          .iter()
          .map(|(name, spec)| {
            let description = spec
              .get("description")
              .and_then(|d| d.as_str())
              .unwrap_or_default()
              .to_string();
            (name.clone(), description)
          })
          .collect()
      })
      .unwrap_or_default()
  }
}

fn object_schema(properties: &[(&str, &str)], required: &[&str]) -> Value {
  let props: Map<String, Value> = properties
    .iter()
    .map(|(name, description)| {
      (
        (*name).to_string(),
        json!({"type": "string", "description": description}),
      )
    })
    .collect();
  json!({
    "type": "object",
    "properties": props,
    "required": required,
  })
}

/// Synthesize the tool schema for a node kind.
///
/// These mirror what each executor actually reads from its invocation
/// payload; the model only needs the keys it can usefully set.
pub fn schema_for(kind: NodeKind, name: &str) -> ToolSchema {
  let (description, parameters) = match kind {
    NodeKind::ImageGeneration => (
      "Generate an image from a text prompt",
      object_schema(
        &[
          ("prompt", "what to draw"),
          ("style", "optional rendering style"),
        ],
        &["prompt"],
      ),
    ),
    NodeKind::Python => (
      "Run the node's Python script with the given inputs",
      object_schema(&[("inputs", "input values for the script")], &[]),
    ),
    NodeKind::HttpRequest => (
      "Call the node's configured HTTP endpoint",
      object_schema(
        &[
          ("body", "request body"),
          ("queryParams", "query parameters"),
        ],
        &[],
      ),
    ),
    NodeKind::TextToSpeech => (
      "Synthesize speech from text",
      object_schema(
        &[("text", "text to speak"), ("voice", "optional voice name")],
        &["text"],
      ),
    ),
    NodeKind::Llm => (
      "Ask the language model node a question",
      object_schema(&[("prompt", "the question or instruction")], &["prompt"]),
    ),
    NodeKind::CodeExecutor => (
      "Evaluate the node's code snippet with the given inputs",
      object_schema(&[("inputs", "input values for the snippet")], &[]),
    ),
    _ => (
      "Invoke this workflow node",
      object_schema(&[("input", "input value for the node")], &[]),
    ),
  };

  ToolSchema {
    name: name.to_string(),
    description: description.to_string(),
    parameters,
  }
}
