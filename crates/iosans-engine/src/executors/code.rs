use async_trait::async_trait;
use mlua::{Lua, LuaOptions, LuaSerdeExt, StdLib};
use serde_json::Value;

use crate::context::ExecutionContext;
use crate::error::EngineError;
use crate::executor::{ExecutionOutcome, NodeExecutor};

/// codeExecutor.
///
/// Evaluates a Lua snippet with `inputs` bound as a global. The interpreter
/// is created per call with only the `table`, `string`, and `math` libraries
/// loaded, so no `io`, `os`, `package`, or network surface exists inside the
/// sandbox. The snippet's result is the evaluated value, unless it assigned
/// an explicit `output` global.
pub struct CodeExecutor;

#[async_trait]
impl NodeExecutor for CodeExecutor {
  fn validate(&self, ctx: &ExecutionContext) -> Result<(), String> {
    match ctx.config_str("code") {
      Some(code) if !code.trim().is_empty() => Ok(()),
      _ => Err("code node requires a non-empty 'code' snippet".to_string()),
    }
  }

  async fn execute(&self, ctx: &ExecutionContext) -> Result<ExecutionOutcome, EngineError> {
    let code = ctx.config_str("code").unwrap_or_default();
    let output = eval_sandboxed(&ctx.node_id, code, &ctx.inputs)?;
    Ok(ExecutionOutcome::new(output))
  }
}

/// Evaluate a snippet inside the restricted interpreter.
pub(crate) fn eval_sandboxed(
  node_id: &str,
  code: &str,
  inputs: &Value,
) -> Result<Value, EngineError> {
  let external = |message: String| EngineError::External {
    node_id: node_id.to_string(),
    message,
  };

  let lua = Lua::new_with(
    StdLib::TABLE | StdLib::STRING | StdLib::MATH,
    LuaOptions::default(),
  )
  .map_err(|e| external(format!("sandbox init failed: {}", e)))?;

  let globals = lua.globals();
  let bound = lua
    .to_value(inputs)
    .map_err(|e| external(format!("inputs not representable: {}", e)))?;
  globals
    .set("inputs", bound)
    .map_err(|e| external(format!("inputs binding failed: {}", e)))?;

  let evaluated: mlua::Value = lua
    .load(code)
    .set_name(node_id)
    .eval()
    .map_err(|e| external(format!("evaluation failed: {}", e)))?;

  // An explicit `output` assignment overrides the chunk's return value.
  let explicit: mlua::Value = globals
    .get("output")
    .map_err(|e| external(format!("output read failed: {}", e)))?;
  let chosen = if explicit.is_nil() { evaluated } else { explicit };

  lua
    .from_value(chosen)
    .map_err(|e| external(format!("result not representable: {}", e)))
}
