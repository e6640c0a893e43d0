use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;

use iosans_workflow::{false_handle, true_handle};

use crate::context::ExecutionContext;
use crate::error::EngineError;
use crate::executor::{ExecutionOutcome, NodeExecutor};
use crate::state::LogLevel;

/// ifElse.
///
/// Compares `inputs[field]` against the configured `value` using `operator`
/// and routes to the `<nodeId>-true` or `<nodeId>-false` handle. Evaluation
/// errors (bad regex, non-numeric ordering operands) log a warning and count
/// as `false`; they never fail the node.
pub struct ConditionExecutor;

#[async_trait]
impl NodeExecutor for ConditionExecutor {
  fn validate(&self, ctx: &ExecutionContext) -> Result<(), String> {
    let operator = ctx.config_str("operator").unwrap_or("equals");
    if !matches!(
      operator,
      "equals" | "notEquals" | "contains" | "greaterThan" | "lessThan" | "regex"
    ) {
      return Err(format!("unknown operator '{}'", operator));
    }
    Ok(())
  }

  async fn execute(&self, ctx: &ExecutionContext) -> Result<ExecutionOutcome, EngineError> {
    let field = ctx.config_str("field").unwrap_or_default();
    let operator = ctx.config_str("operator").unwrap_or("equals");
    let expected = ctx.config("value").cloned().unwrap_or(Value::Null);
    let actual = ctx.inputs.get(field).cloned().unwrap_or(Value::Null);

    let result = match evaluate(operator, &actual, &expected) {
      Ok(result) => result,
      Err(reason) => {
        ctx.log(
          LogLevel::Error,
          format!("condition evaluation failed, treating as false: {}", reason),
        );
        false
      }
    };

    ctx.log(
      LogLevel::Info,
      format!("condition '{}' {} -> {}", field, operator, result),
    );

    let handle = if result {
      true_handle(&ctx.node_id)
    } else {
      false_handle(&ctx.node_id)
    };

    Ok(ExecutionOutcome::new(ctx.inputs.clone()).with_active_handles([handle]))
  }
}

/// Evaluate one comparison. Errors describe why the operands could not be
/// compared; the caller degrades them to `false`.
pub(crate) fn evaluate(operator: &str, actual: &Value, expected: &Value) -> Result<bool, String> {
  match operator {
    "equals" => Ok(loose_eq(actual, expected)),
    "notEquals" => Ok(!loose_eq(actual, expected)),
    "contains" => Ok(as_text(actual).contains(&as_text(expected))),
    "greaterThan" => {
      let (a, b) = numeric_pair(actual, expected)?;
      Ok(a > b)
    }
    "lessThan" => {
      let (a, b) = numeric_pair(actual, expected)?;
      Ok(a < b)
    }
    "regex" => {
      let pattern = as_text(expected);
      let re = Regex::new(&pattern).map_err(|e| format!("invalid pattern: {}", e))?;
      Ok(re.is_match(&as_text(actual)))
    }
    other => Err(format!("unknown operator '{}'", other)),
  }
}

/// Equality with string/number coercion: `42 == "42"`.
fn loose_eq(a: &Value, b: &Value) -> bool {
  if a == b {
    return true;
  }
  if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
    return x == y;
  }
  as_text(a) == as_text(b)
}

fn as_text(value: &Value) -> String {
  match value {
    Value::String(s) => s.clone(),
    Value::Null => String::new(),
    other => other.to_string(),
  }
}

fn as_number(value: &Value) -> Option<f64> {
  match value {
    Value::Number(n) => n.as_f64(),
    Value::String(s) => s.trim().parse().ok(),
    Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
    _ => None,
  }
}

fn numeric_pair(a: &Value, b: &Value) -> Result<(f64, f64), String> {
  match (as_number(a), as_number(b)) {
    (Some(x), Some(y)) => Ok((x, y)),
    _ => Err(format!("non-numeric operands: {} vs {}", a, b)),
  }
}
