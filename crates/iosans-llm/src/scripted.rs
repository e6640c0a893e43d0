use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{ChatModel, ChatRequest, ChatResponse, LlmError, Usage};

/// Deterministic chat backend for tests: replays a fixed sequence of replies
/// and records every request it receives.
#[derive(Debug, Default)]
pub struct ScriptedModel {
  replies: Mutex<VecDeque<String>>,
  requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedModel {
  /// Build a model that answers with `replies` in order.
  pub fn new<I, S>(replies: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
      requests: Mutex::new(Vec::new()),
    }
  }

  /// Requests seen so far, in call order.
  pub async fn requests(&self) -> Vec<ChatRequest> {
    self.requests.lock().await.clone()
  }

  /// Number of calls made against the model.
  pub async fn call_count(&self) -> usize {
    self.requests.lock().await.len()
  }
}

#[async_trait]
impl ChatModel for ScriptedModel {
  async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, LlmError> {
    self.requests.lock().await.push(request.clone());

    let reply = self
      .replies
      .lock()
      .await
      .pop_front()
      .ok_or_else(|| LlmError::Request("scripted model ran out of replies".to_string()))?;

    Ok(ChatResponse {
      content: reply,
      model: request
        .model_id
        .unwrap_or_else(|| "scripted".to_string()),
      usage: Usage::default(),
    })
  }
}
