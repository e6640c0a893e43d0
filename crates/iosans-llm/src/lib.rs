//! Iosans LLM
//!
//! Provider-agnostic chat interface. The engine orchestrates graphs and
//! agents; the actual model backend (local runtime, remote API) implements
//! [`ChatModel`] and is injected through the engine's services. The
//! [`ScriptedModel`] test double replays canned replies so agent and llm
//! executor behavior is deterministic under test.

mod message;
mod scripted;

pub use message::{ChatMessage, Role};
pub use scripted::ScriptedModel;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Error type for chat backends.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
  /// The backend is not configured or not reachable.
  #[error("model unavailable: {0}")]
  Unavailable(String),

  /// The backend rejected the request.
  #[error("model request failed: {0}")]
  Request(String),
}

/// A chat completion request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
  pub messages: Vec<ChatMessage>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub model_id: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub temperature: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub top_p: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub max_tokens: Option<u32>,
  #[serde(default)]
  pub stream: bool,
}

impl ChatRequest {
  /// Build a request from messages with default sampling.
  pub fn new(messages: Vec<ChatMessage>) -> Self {
    Self {
      messages,
      ..Default::default()
    }
  }
}

/// Token usage reported by a backend, when available.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
  pub prompt_tokens: u32,
  pub completion_tokens: u32,
}

/// A chat completion response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
  /// Assistant reply text.
  pub content: String,
  /// Identifier of the model that produced the reply.
  pub model: String,
  #[serde(default)]
  pub usage: Usage,
}

/// Chat-based language model backend.
#[async_trait]
pub trait ChatModel: Send + Sync {
  /// Generate a completion for the given request.
  async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, LlmError>;
}
