use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

use crate::context::ExecutionContext;
use crate::error::EngineError;
use crate::executor::{ExecutionOutcome, NodeExecutor};

/// start / manualTrigger / scheduleTrigger.
///
/// Entry nodes take no inputs and emit a trigger marker with the firing time.
pub struct TriggerExecutor;

#[async_trait]
impl NodeExecutor for TriggerExecutor {
  async fn execute(&self, _ctx: &ExecutionContext) -> Result<ExecutionOutcome, EngineError> {
    Ok(ExecutionOutcome::new(json!({
      "triggered": true,
      "timestamp": Utc::now().to_rfc3339(),
    })))
  }
}
