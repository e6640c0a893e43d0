use async_trait::async_trait;
use serde_json::{Value, json};

use iosans_llm::{ChatMessage, ChatRequest, LlmError};

use crate::context::ExecutionContext;
use crate::error::EngineError;
use crate::executor::{ExecutionOutcome, NodeExecutor};
use crate::state::LogLevel;

/// llm.
///
/// One chat completion against the injected model. Inputs may be a message
/// list, a plain string, or an object carrying `messages` / `prompt`;
/// anything else is serialized into a single user message.
pub struct LlmExecutor;

#[async_trait]
impl NodeExecutor for LlmExecutor {
  async fn execute(&self, ctx: &ExecutionContext) -> Result<ExecutionOutcome, EngineError> {
    let node_id = ctx.node_id.clone();
    let model = ctx
      .services
      .chat_model
      .as_ref()
      .ok_or_else(|| EngineError::ServiceUnavailable {
        node_id: node_id.clone(),
        message: "no chat model configured".to_string(),
      })?;

    let request = ChatRequest {
      messages: messages_from_inputs(&ctx.inputs),
      model_id: ctx.config_str("modelId").map(str::to_string),
      temperature: ctx.config_f64("temperature"),
      top_p: ctx.config_f64("top_p"),
      max_tokens: ctx.config_u64("maxTokens").map(|t| t as u32),
      stream: ctx
        .config("stream")
        .and_then(|v| v.as_bool())
        .unwrap_or(false),
    };

    let response = tokio::select! {
      result = model.chat(request) => result.map_err(|e| match e {
        LlmError::Unavailable(message) => EngineError::ServiceUnavailable {
          node_id: node_id.clone(),
          message,
        },
        LlmError::Request(message) => EngineError::External {
          node_id: node_id.clone(),
          message,
        },
      })?,
      _ = ctx.cancel.cancelled() => return Err(EngineError::Cancelled),
    };

    let usage = json!({
      "promptTokens": response.usage.prompt_tokens,
      "completionTokens": response.usage.completion_tokens,
    });
    ctx.log_data(
      LogLevel::Info,
      format!("chat completion via '{}'", response.model),
      Some(usage.clone()),
    );

    Ok(
      ExecutionOutcome::new(json!({
        "response": response.content,
        "model": response.model,
      }))
      .with_metadata("usage", usage),
    )
  }
}

/// Coerce node inputs into a chat transcript.
pub(crate) fn messages_from_inputs(inputs: &Value) -> Vec<ChatMessage> {
  if let Ok(messages) = serde_json::from_value::<Vec<ChatMessage>>(inputs.clone()) {
    if !messages.is_empty() {
      return messages;
    }
  }
  if let Value::String(text) = inputs {
    return vec![ChatMessage::user(text.clone())];
  }
  if let Some(messages) = inputs.get("messages") {
    if let Ok(messages) = serde_json::from_value::<Vec<ChatMessage>>(messages.clone()) {
      if !messages.is_empty() {
        return messages;
      }
    }
  }
  if let Some(prompt) = inputs.get("prompt").and_then(|v| v.as_str()) {
    return vec![ChatMessage::user(prompt.to_string())];
  }
  vec![ChatMessage::user(inputs.to_string())]
}
