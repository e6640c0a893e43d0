use async_trait::async_trait;
use serde_json::Value;

use iosans_workflow::case_handle;

use crate::context::ExecutionContext;
use crate::error::EngineError;
use crate::executor::{ExecutionOutcome, NodeExecutor};
use crate::state::LogLevel;

/// switch.
///
/// Reads `switchKey` from configuration, string-coerces `inputs[switchKey]`,
/// and routes to the matching entry of `cases[]` (or `"default"` when
/// present). Inputs pass through; the chosen branch is encoded in
/// `activeHandles` as `<nodeId>-case-<match>`.
pub struct SwitchExecutor;

#[async_trait]
impl NodeExecutor for SwitchExecutor {
  fn validate(&self, ctx: &ExecutionContext) -> Result<(), String> {
    if ctx.config_str("switchKey").is_none() {
      return Err("switch node requires a 'switchKey'".to_string());
    }
    Ok(())
  }

  async fn execute(&self, ctx: &ExecutionContext) -> Result<ExecutionOutcome, EngineError> {
    let key = ctx.config_str("switchKey").unwrap_or_default();
    let value = coerce_to_string(lookup(&ctx.inputs, key));

    let cases: Vec<String> = ctx
      .config("cases")
      .and_then(|v| v.as_array())
      .map(|arr| {
        arr
          .iter()
          .filter_map(|c| c.as_str().map(str::to_string))
          .collect()
      })
      .unwrap_or_default();

    let chosen = if cases.iter().any(|c| *c == value) {
      Some(value.clone())
    } else if cases.iter().any(|c| c == "default") {
      Some("default".to_string())
    } else {
      None
    };

    let outcome = ExecutionOutcome::new(ctx.inputs.clone());
    match chosen {
      Some(case) => {
        ctx.log(
          LogLevel::Info,
          format!("switch matched case '{}' for value '{}'", case, value),
        );
        Ok(outcome.with_active_handles([case_handle(&ctx.node_id, &case)]))
      }
      None => {
        ctx.log(
          LogLevel::Info,
          format!("switch matched no case for value '{}'", value),
        );
        // No route: every downstream branch is skipped.
        Ok(outcome.with_active_handles(Vec::<String>::new()))
      }
    }
  }
}

/// Look a key up in the inputs object; missing keys resolve to null.
fn lookup<'a>(inputs: &'a Value, key: &str) -> &'a Value {
  inputs.get(key).unwrap_or(&Value::Null)
}

/// String coercion matching the routing contract: strings stay bare,
/// everything else uses its JSON rendering.
pub(crate) fn coerce_to_string(value: &Value) -> String {
  match value {
    Value::String(s) => s.clone(),
    Value::Null => "null".to_string(),
    other => other.to_string(),
  }
}
