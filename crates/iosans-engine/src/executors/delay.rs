use std::time::Duration;

use async_trait::async_trait;

use crate::context::ExecutionContext;
use crate::error::EngineError;
use crate::executor::{ExecutionOutcome, NodeExecutor};

const DEFAULT_DELAY_MS: u64 = 1000;

/// delay.
///
/// Waits `delay` milliseconds (default 1000) and passes inputs through.
/// Cancellation aborts the wait promptly.
pub struct DelayExecutor;

#[async_trait]
impl NodeExecutor for DelayExecutor {
  async fn execute(&self, ctx: &ExecutionContext) -> Result<ExecutionOutcome, EngineError> {
    let millis = ctx.config_u64("delay").unwrap_or(DEFAULT_DELAY_MS);

    tokio::select! {
      _ = tokio::time::sleep(Duration::from_millis(millis)) => {
        Ok(ExecutionOutcome::new(ctx.inputs.clone()))
      }
      _ = ctx.cancel.cancelled() => Err(EngineError::Cancelled),
    }
  }
}
