use async_trait::async_trait;
use bytes::Bytes;
use serde_json::json;

use crate::context::ExecutionContext;
use crate::error::EngineError;
use crate::executor::{ExecutionOutcome, NodeExecutor};
use crate::services::ServiceError;

/// python.
///
/// Runs the configured script through the pluggable interpreter service with
/// `inputs` injected. Object or array results are persisted as a JSON
/// artifact and returned by reference; scalar results return directly.
pub struct PythonExecutor;

#[async_trait]
impl NodeExecutor for PythonExecutor {
  fn validate(&self, ctx: &ExecutionContext) -> Result<(), String> {
    match ctx.config_str("code") {
      Some(code) if !code.trim().is_empty() => Ok(()),
      _ => Err("python node requires a non-empty 'code' script".to_string()),
    }
  }

  async fn execute(&self, ctx: &ExecutionContext) -> Result<ExecutionOutcome, EngineError> {
    let node_id = ctx.node_id.clone();
    let runtime = ctx
      .services
      .python
      .as_ref()
      .ok_or_else(|| EngineError::ServiceUnavailable {
        node_id: node_id.clone(),
        message: "no python runtime configured".to_string(),
      })?;

    let code = ctx.config_str("code").unwrap_or_default();

    let result = tokio::select! {
      result = runtime.run(code, &ctx.inputs) => result.map_err(|e| match e {
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

    if result.is_object() || result.is_array() {
      let bytes = serde_json::to_vec_pretty(&result).map_err(|e| EngineError::External {
        node_id: node_id.clone(),
        message: format!("result serialization failed: {}", e),
      })?;
      let artifact_id = ctx
        .services
        .artifacts
        .save(Bytes::from(bytes), "json", Some("application/json"))
        .await
        .map_err(|e| EngineError::Storage {
          node_id: node_id.clone(),
          message: e.to_string(),
        })?;

      return Ok(ExecutionOutcome::new(json!({
        "artifactId": artifact_id,
        "type": "json",
      })));
    }

    Ok(ExecutionOutcome::new(result))
  }
}
