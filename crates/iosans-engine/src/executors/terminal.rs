use async_trait::async_trait;

use crate::context::ExecutionContext;
use crate::error::EngineError;
use crate::executor::{ExecutionOutcome, NodeExecutor};

/// end / output.
///
/// Terminal nodes pass their inputs through unchanged; the engine never fires
/// their outgoing edges.
pub struct TerminalExecutor;

#[async_trait]
impl NodeExecutor for TerminalExecutor {
  async fn execute(&self, ctx: &ExecutionContext) -> Result<ExecutionOutcome, EngineError> {
    Ok(ExecutionOutcome::new(ctx.inputs.clone()))
  }
}
