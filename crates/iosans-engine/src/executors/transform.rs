use async_trait::async_trait;
use minijinja::Environment;
use serde_json::Value;

use crate::context::ExecutionContext;
use crate::error::EngineError;
use crate::executor::{ExecutionOutcome, NodeExecutor};

/// transform.
///
/// `transformType` selects the operation: `json-parse`, `json-stringify`,
/// `extract` (returns `inputs[key]`), or `template` (`{{ name }}`
/// substitution over the input keys). Unknown types pass inputs through.
pub struct TransformExecutor;

#[async_trait]
impl NodeExecutor for TransformExecutor {
  async fn execute(&self, ctx: &ExecutionContext) -> Result<ExecutionOutcome, EngineError> {
    let transform_type = ctx.config_str("transformType").unwrap_or_default();

    let output = match transform_type {
      "json-parse" => {
        let text = match &ctx.inputs {
          Value::String(s) => s.clone(),
          other => other.to_string(),
        };
        serde_json::from_str(&text).map_err(|e| EngineError::InvalidInput {
          node_id: ctx.node_id.clone(),
          message: format!("json-parse failed: {}", e),
        })?
      }
      "json-stringify" => Value::String(
        serde_json::to_string(&ctx.inputs).map_err(|e| EngineError::InvalidInput {
          node_id: ctx.node_id.clone(),
          message: format!("json-stringify failed: {}", e),
        })?,
      ),
      "extract" => {
        let key = ctx.config_str("key").unwrap_or_default();
        ctx.inputs.get(key).cloned().unwrap_or(Value::Null)
      }
      "template" => {
        let template = ctx.config_str("template").unwrap_or_default();
        Value::String(render_template(&ctx.node_id, template, &ctx.inputs)?)
      }
      _ => ctx.inputs.clone(),
    };

    Ok(ExecutionOutcome::new(output))
  }
}

/// Render a `{{ name }}` template against the input object.
pub(crate) fn render_template(
  node_id: &str,
  template: &str,
  inputs: &Value,
) -> Result<String, EngineError> {
  let env = Environment::new();
  env
    .render_str(template, minijinja::Value::from_serialize(inputs))
    .map_err(|e| EngineError::InvalidInput {
      node_id: node_id.to_string(),
      message: format!("template render failed: {}", e),
    })
}
