use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{Map, Value};
use url::Url;

use crate::context::ExecutionContext;
use crate::error::EngineError;
use crate::executor::{ExecutionOutcome, NodeExecutor};
use crate::executors::transform::render_template;
use crate::state::LogLevel;

/// httpRequest.
///
/// Issues one HTTP call per execution. The URL supports `{{ var }}`
/// substitution from the inputs, `queryParams` objects are appended to the
/// query string, object bodies are sent as JSON (with the content type set
/// by the client), and bodies are suppressed for GET/HEAD. `body` and
/// `queryParams` arriving in the inputs (an agent tool call) take precedence
/// over the node's static configuration. Non-2xx statuses fail the node with
/// `HTTP <code>: <reason>`.
pub struct HttpRequestExecutor {
  client: reqwest::Client,
}

impl HttpRequestExecutor {
  pub fn new() -> Self {
    Self {
      client: reqwest::Client::new(),
    }
  }
}

impl Default for HttpRequestExecutor {
  fn default() -> Self {
    Self::new()
  }
}

#[async_trait]
impl NodeExecutor for HttpRequestExecutor {
  fn validate(&self, ctx: &ExecutionContext) -> Result<(), String> {
    if ctx.config_str("url").is_none() {
      return Err("http node requires a 'url'".to_string());
    }
    Ok(())
  }

  async fn execute(&self, ctx: &ExecutionContext) -> Result<ExecutionOutcome, EngineError> {
    let node_id = ctx.node_id.clone();
    let invalid = |message: String| EngineError::InvalidInput {
      node_id: node_id.clone(),
      message,
    };

    let method_str = ctx
      .config_str("method")
      .unwrap_or("GET")
      .to_ascii_uppercase();
    let method = Method::from_bytes(method_str.as_bytes())
      .map_err(|_| invalid(format!("unsupported method '{}'", method_str)))?;

    let url_template = ctx.config_str("url").unwrap_or_default();
    let rendered = render_template(&ctx.node_id, url_template, &ctx.inputs)?;
    let mut url =
      Url::parse(&rendered).map_err(|e| invalid(format!("invalid url '{}': {}", rendered, e)))?;

    if let Some(params) = query_params(&ctx.inputs, ctx.config("queryParams")) {
      apply_query_params(&mut url, &params);
    }

    let mut request = self.client.request(method.clone(), url.clone());

    if let Some(headers) = ctx.config("headers").and_then(|v| v.as_object()) {
      for (name, value) in headers {
        if let Some(value) = value.as_str() {
          request = request.header(name, value);
        }
      }
    }

    if !matches!(method, Method::GET | Method::HEAD) {
      match resolve_body(&ctx.node_id, &ctx.inputs, ctx.config("body"))? {
        Some(Value::String(text)) => request = request.body(text),
        Some(body) => request = request.json(&body),
        None => {}
      }
    }

    if let Some(millis) = ctx.config_u64("timeoutMs") {
      request = request.timeout(Duration::from_millis(millis));
    }

    ctx.log(LogLevel::Action, format!("{} {}", method_str, url));

    let response = tokio::select! {
      result = request.send() => result.map_err(|e| {
        if e.is_timeout() {
          EngineError::Timeout { node_id: node_id.clone() }
        } else {
          EngineError::External {
            node_id: node_id.clone(),
            message: format!("request failed: {}", e),
          }
        }
      })?,
      _ = ctx.cancel.cancelled() => return Err(EngineError::Cancelled),
    };

    let status = response.status();
    if !status.is_success() {
      return Err(EngineError::External {
        node_id: node_id.clone(),
        message: format!(
          "HTTP {}: {}",
          status.as_u16(),
          status.canonical_reason().unwrap_or("Unknown")
        ),
      });
    }

    let text = tokio::select! {
      result = response.text() => result.map_err(|e| EngineError::External {
        node_id: node_id.clone(),
        message: format!("body read failed: {}", e),
      })?,
      _ = ctx.cancel.cancelled() => return Err(EngineError::Cancelled),
    };

    let output = serde_json::from_str(&text).unwrap_or(Value::String(text));
    Ok(ExecutionOutcome::new(output))
  }
}

/// The query parameters to send: `inputs.queryParams` (a tool call) wins
/// over the node's static configuration.
fn query_params(inputs: &Value, config: Option<&Value>) -> Option<Map<String, Value>> {
  inputs
    .get("queryParams")
    .and_then(|v| v.as_object())
    .or_else(|| config.and_then(|v| v.as_object()))
    .cloned()
}

/// Append a parameter object to a URL's query string. Non-string values use
/// their JSON rendering.
fn apply_query_params(url: &mut Url, params: &Map<String, Value>) {
  let mut pairs = url.query_pairs_mut();
  for (name, value) in params {
    match value {
      Value::String(s) => pairs.append_pair(name, s),
      other => pairs.append_pair(name, &other.to_string()),
    };
  }
}

/// The request body to send, if any: `inputs.body` (a tool call) wins over
/// the node's static configuration; static string bodies get `{{ var }}`
/// substitution from the inputs.
fn resolve_body(
  node_id: &str,
  inputs: &Value,
  config: Option<&Value>,
) -> Result<Option<Value>, EngineError> {
  if let Some(body) = inputs.get("body") {
    if !body.is_null() {
      return Ok(Some(body.clone()));
    }
  }
  match config {
    Some(Value::String(text)) => Ok(Some(Value::String(render_template(
      node_id, text, inputs,
    )?))),
    Some(Value::Null) | None => Ok(None),
    Some(value) => Ok(Some(value.clone())),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_query_params_prefer_inputs_over_config() {
    let inputs = json!({"queryParams": {"q": "from-inputs"}});
    let config = json!({"q": "from-config"});
    let params = query_params(&inputs, Some(&config)).unwrap();
    assert_eq!(params["q"], json!("from-inputs"));

    let params = query_params(&json!({}), Some(&config)).unwrap();
    assert_eq!(params["q"], json!("from-config"));

    assert!(query_params(&json!({}), None).is_none());
  }

  #[test]
  fn test_apply_query_params_builds_query_string() {
    let mut url = Url::parse("https://api.example.com/search").unwrap();
    let params = json!({"q": "rust", "limit": 5});
    apply_query_params(&mut url, params.as_object().unwrap());

    let query = url.query().unwrap();
    assert!(query.contains("q=rust"));
    assert!(query.contains("limit=5"));
  }

  #[test]
  fn test_resolve_body_prefers_dynamic_inputs() {
    let inputs = json!({"body": {"x": 1}});
    let config = json!({"y": 2});
    let body = resolve_body("h", &inputs, Some(&config)).unwrap();
    assert_eq!(body, Some(json!({"x": 1})));
  }

  #[test]
  fn test_resolve_body_renders_static_string_template() {
    let inputs = json!({"name": "Ada"});
    let config = json!("hello {{ name }}");
    let body = resolve_body("h", &inputs, Some(&config)).unwrap();
    assert_eq!(body, Some(json!("hello Ada")));
  }

  #[test]
  fn test_resolve_body_absent() {
    assert_eq!(resolve_body("h", &json!({}), None).unwrap(), None);
    let body = resolve_body("h", &json!({"body": null}), None).unwrap();
    assert_eq!(body, None);
  }
}
