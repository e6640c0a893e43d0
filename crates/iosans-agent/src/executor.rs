use async_trait::async_trait;
use serde_json::{Value, json};

use iosans_engine::{
  EngineError, ExecutionContext, ExecutionOutcome, LogLevel, NodeExecutor,
};

use crate::discovery::discover_tools;
use crate::service::{DEFAULT_MAX_ITERATIONS, ToolCallingService};

/// aiAgent.
///
/// Discovers the tools wired to this node's resource slots, runs the ReAct
/// loop against the injected chat model, and dispatches tool calls back into
/// the engine. Hitting the iteration limit degrades to a synthetic answer
/// rather than failing the node.
pub struct AgentExecutor;

#[async_trait]
impl NodeExecutor for AgentExecutor {
  async fn execute(&self, ctx: &ExecutionContext) -> Result<ExecutionOutcome, EngineError> {
    let node_id = ctx.node_id.clone();

    let model = ctx
      .services
      .chat_model
      .as_ref()
      .ok_or_else(|| EngineError::ServiceUnavailable {
        node_id: node_id.clone(),
        message: "no chat model configured".to_string(),
      })?
      .clone();

    let invoker = ctx
      .invoker
      .as_ref()
      .ok_or_else(|| EngineError::ServiceUnavailable {
        node_id: node_id.clone(),
        message: "engine re-entry is not available in this context".to_string(),
      })?
      .clone();

    let tools = discover_tools(&ctx.workflow, &node_id);
    ctx.log(
      LogLevel::Info,
      format!("agent discovered {} tool(s)", tools.len()),
    );

    let max_iterations = ctx
      .config_u64("maxIterations")
      .map(|m| m as usize)
      .unwrap_or(DEFAULT_MAX_ITERATIONS);

    let service = ToolCallingService::new(model, tools)
      .with_max_iterations(max_iterations)
      .with_model_id(ctx.config_str("modelId").map(str::to_string));

    let prompt = user_prompt(&ctx.inputs);

    let run = tokio::select! {
      result = service.run(&prompt, invoker.as_ref()) => {
        result.map_err(|e| EngineError::External {
          node_id: node_id.clone(),
          message: e.to_string(),
        })?
      }
      _ = ctx.cancel.cancelled() => return Err(EngineError::Cancelled),
    };

    if run.hit_iteration_limit {
      ctx.log(
        LogLevel::Error,
        format!("MaxIterations: agent stopped after {} iteration(s)", max_iterations),
      );
    }

    let trace = serde_json::to_value(&run.steps).map_err(|e| EngineError::External {
      node_id: node_id.clone(),
      message: format!("trace serialization failed: {}", e),
    })?;

    Ok(ExecutionOutcome::new(json!({
      "response": run.response,
      "trace": trace,
    })))
  }
}

/// Build the user prompt from the agent's inputs: a plain string passes
/// through, `inputs.prompt` is preferred on objects, anything else is the
/// inputs JSON.
fn user_prompt(inputs: &Value) -> String {
  match inputs {
    Value::String(s) => s.clone(),
    other => other
      .get("prompt")
      .and_then(|p| p.as_str())
      .map(str::to_string)
      .unwrap_or_else(|| other.to_string()),
  }
}
