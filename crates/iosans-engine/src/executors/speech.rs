use async_trait::async_trait;
use serde_json::{Value, json};

use crate::context::ExecutionContext;
use crate::error::EngineError;
use crate::executor::{ExecutionOutcome, NodeExecutor};
use crate::services::{ServiceError, SpeechOptions};

/// textToSpeech.
///
/// Text resolution order: a plain string input, then `inputs.text`, then the
/// node's own `text` configuration. The synthesized audio is stored as an
/// artifact and returned by reference.
pub struct TextToSpeechExecutor;

#[async_trait]
impl NodeExecutor for TextToSpeechExecutor {
  async fn execute(&self, ctx: &ExecutionContext) -> Result<ExecutionOutcome, EngineError> {
    let node_id = ctx.node_id.clone();

    let text = resolve_text(&ctx.inputs, ctx.config_str("text")).ok_or_else(|| {
      EngineError::InvalidInput {
        node_id: node_id.clone(),
        message: "no input text to synthesize".to_string(),
      }
    })?;

    let synthesizer =
      ctx
        .services
        .speech
        .as_ref()
        .ok_or_else(|| EngineError::ServiceUnavailable {
          node_id: node_id.clone(),
          message: "no speech synthesizer configured".to_string(),
        })?;

    let options = SpeechOptions {
      voice: ctx.config_str("voice").map(str::to_string),
      rate: ctx.config_f64("rate"),
      pitch: ctx.config_f64("pitch"),
    };

    let audio = tokio::select! {
      result = synthesizer.synthesize(&text, &options) => result.map_err(|e| match e {
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
      .save(audio, "audio", Some("audio/wav"))
      .await
      .map_err(|e| EngineError::Storage {
        node_id: node_id.clone(),
        message: e.to_string(),
      })?;

    Ok(ExecutionOutcome::new(json!({
      "artifactId": artifact_id,
      "type": "audio/wav",
    })))
  }
}

/// Pick the text to synthesize: string input, `inputs.text`, node config.
fn resolve_text(inputs: &Value, config_text: Option<&str>) -> Option<String> {
  if let Value::String(s) = inputs {
    if !s.is_empty() {
      return Some(s.clone());
    }
  }
  if let Some(s) = inputs.get("text").and_then(|v| v.as_str()) {
    if !s.is_empty() {
      return Some(s.to_string());
    }
  }
  config_text
    .filter(|s| !s.is_empty())
    .map(str::to_string)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_text_resolution_order() {
    assert_eq!(
      resolve_text(&json!("direct"), Some("config")),
      Some("direct".to_string())
    );
    assert_eq!(
      resolve_text(&json!({"text": "nested"}), Some("config")),
      Some("nested".to_string())
    );
    assert_eq!(
      resolve_text(&json!({"other": 1}), Some("config")),
      Some("config".to_string())
    );
    assert_eq!(resolve_text(&json!({"other": 1}), None), None);
    assert_eq!(resolve_text(&json!(""), None), None);
  }
}
