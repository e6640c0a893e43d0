use async_trait::async_trait;
use serde_json::{Value, json};

use crate::context::ExecutionContext;
use crate::error::EngineError;
use crate::executor::{ExecutionOutcome, NodeExecutor};
use crate::services::{ImageOptions, ServiceError};

/// imageGeneration.
///
/// Prompt resolution order: a plain string input, then `inputs.prompt`, then
/// the node's own `prompt` configuration. The generated image is stored as an
/// artifact and returned by reference.
pub struct ImageGenerationExecutor;

#[async_trait]
impl NodeExecutor for ImageGenerationExecutor {
  async fn execute(&self, ctx: &ExecutionContext) -> Result<ExecutionOutcome, EngineError> {
    let node_id = ctx.node_id.clone();

    let prompt = resolve_prompt(&ctx.inputs, ctx.config_str("prompt")).ok_or_else(|| {
      EngineError::InvalidInput {
        node_id: node_id.clone(),
        message: "no prompt to generate from".to_string(),
      }
    })?;

    let generator = ctx
      .services
      .image
      .as_ref()
      .ok_or_else(|| EngineError::ServiceUnavailable {
        node_id: node_id.clone(),
        message: "no image generator configured".to_string(),
      })?;

    let options = ImageOptions {
      width: ctx.config_u64("width").map(|w| w as u32),
      height: ctx.config_u64("height").map(|h| h as u32),
      style: ctx.config_str("style").map(str::to_string),
    };

    let image = tokio::select! {
      result = generator.generate(&prompt, &options) => result.map_err(|e| match e {
        ServiceError::Unavailable(message) => EngineError::ServiceUnavailable {
          node_id: node_id.clone(),
          message,
        },
        ServiceError::Failed(message) => EngineError::External {
          node_id: node_id.clone(),
          message,
        },
      })?,
      _ = ctx.cancel.cancelled() => return Err(EngineError::Cancelled),
    };

    let artifact_id = ctx
      .services
      .artifacts
      .save(image, "images", Some("image/png"))
      .await
      .map_err(|e| EngineError::Storage {
        node_id: node_id.clone(),
        message: e.to_string(),
      })?;

    Ok(ExecutionOutcome::new(json!({
      "artifactId": artifact_id,
      "type": "image/png",
    })))
  }
}

/// Pick the prompt: string input, `inputs.prompt`, node config.
fn resolve_prompt(inputs: &Value, config_prompt: Option<&str>) -> Option<String> {
  if let Value::String(s) = inputs {
    if !s.is_empty() {
      return Some(s.clone());
    }
  }
  if let Some(s) = inputs.get("prompt").and_then(|v| v.as_str()) {
    if !s.is_empty() {
      return Some(s.to_string());
    }
  }
  config_prompt
    .filter(|s| !s.is_empty())
    .map(str::to_string)
}
