use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, warn};

use iosans_engine::NodeInvoker;
use iosans_llm::{ChatMessage, ChatModel, ChatRequest, LlmError};

use crate::discovery::Tool;
use crate::react::{parse_action_input, parse_reply};

/// Default bound on think/act/observe iterations.
pub const DEFAULT_MAX_ITERATIONS: usize = 10;

/// Step type in an agent trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceStepType {
  Thought,
  Action,
  Observation,
  Answer,
}

/// One recorded step of the agent loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceStep {
  #[serde(rename = "type")]
  pub step_type: TraceStepType,
  pub content: String,
  #[serde(rename = "toolCall", skip_serializing_if = "Option::is_none")]
  pub tool_call: Option<Value>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub result: Option<Value>,
}

/// Outcome of one agent loop.
#[derive(Debug, Clone)]
pub struct AgentRun {
  pub response: String,
  pub steps: Vec<TraceStep>,
  /// True when the loop was cut off by the iteration bound.
  pub hit_iteration_limit: bool,
}

/// The ReAct loop: prompt assembly, reply parsing, and tool dispatch through
/// the engine's re-entry seam.
pub struct ToolCallingService {
  model: Arc<dyn ChatModel>,
  tools: Vec<Tool>,
  max_iterations: usize,
  model_id: Option<String>,
}

impl ToolCallingService {
  pub fn new(model: Arc<dyn ChatModel>, tools: Vec<Tool>) -> Self {
    Self {
      model,
      tools,
      max_iterations: DEFAULT_MAX_ITERATIONS,
      model_id: None,
    }
  }

  pub fn with_max_iterations(mut self, max: usize) -> Self {
    self.max_iterations = max.max(1);
    self
  }

  pub fn with_model_id(mut self, model_id: Option<String>) -> Self {
    self.model_id = model_id;
    self
  }

  /// The system prompt: one markdown block per tool plus the ReAct protocol.
  pub fn system_prompt(&self) -> String {
    let mut prompt = String::from(
      "You are an assistant that can use tools to complete tasks.\n\n## Available tools\n\n",
    );

    if self.tools.is_empty() {
      prompt.push_str("(none)\n");
    }
    for tool in &self.tools {
      prompt.push_str(&format!("### {}\n{}\n", tool.name, tool.schema.description));
      for (name, description) in tool.schema.parameter_list() {
        prompt.push_str(&format!("- {}: {}\n", name, description));
      }
      prompt.push('\n');
    }

    prompt.push_str(
      "## Protocol\n\n\
       Reason in steps. Each reply must use exactly these line prefixes:\n\
       Thought: your reasoning\n\
       Action: <tool_name>\n\
       Action Input: <json arguments>\n\n\
       After an action you will receive a line starting with `Observation:` \
       containing the tool result. Repeat Thought/Action as needed. When you \
       have the answer, reply with:\n\
       Thought: your reasoning\n\
       Final Answer: <the answer>\n",
    );

    prompt
  }

  /// Run the loop for a user prompt, dispatching actions through `invoker`.
  pub async fn run(&self, user_prompt: &str, invoker: &dyn NodeInvoker) -> Result<AgentRun, LlmError> {
    let system_prompt = self.system_prompt();
    let mut scratchpad = String::new();
    let mut steps: Vec<TraceStep> = Vec::new();
    let mut last_thought = String::new();

    for iteration in 0..self.max_iterations {
      let prompt = if scratchpad.is_empty() {
        user_prompt.to_string()
      } else {
        format!("{}\n\n{}", user_prompt, scratchpad)
      };

      let request = ChatRequest {
        messages: vec![
          ChatMessage::system(system_prompt.clone()),
          ChatMessage::user(prompt),
        ],
        model_id: self.model_id.clone(),
        ..Default::default()
      };

      let reply = self.model.chat(request).await?.content;
      let parsed = parse_reply(&reply);

      if let Some(thought) = &parsed.thought {
        last_thought = thought.clone();
      }

      if let Some(answer) = parsed.final_answer {
        steps.push(TraceStep {
          step_type: TraceStepType::Answer,
          content: answer.clone(),
          tool_call: None,
          result: None,
        });
        info!(iterations = iteration + 1, "agent reached final answer");
        return Ok(AgentRun {
          response: answer,
          steps,
          hit_iteration_limit: false,
        });
      }

      let Some(action) = parsed.action else {
        // Neither an action nor a final answer: take the reply as the
        // answer rather than looping on a malformed transcript.
        warn!("agent reply matched no protocol line, treating as answer");
        steps.push(TraceStep {
          step_type: TraceStepType::Answer,
          content: reply.clone(),
          tool_call: None,
          result: None,
        });
        return Ok(AgentRun {
          response: reply,
          steps,
          hit_iteration_limit: false,
        });
      };

      if let Some(thought) = &parsed.thought {
        steps.push(TraceStep {
          step_type: TraceStepType::Thought,
          content: thought.clone(),
          tool_call: None,
          result: None,
        });
      }

      let input = parse_action_input(parsed.action_input.as_deref());
      steps.push(TraceStep {
        step_type: TraceStepType::Action,
        content: action.clone(),
        tool_call: Some(json!({"tool": action, "input": input})),
        result: None,
      });

      let observation = match self.dispatch(&action, input, invoker).await {
        Ok(result) => {
          let rendered = render_observation(&result);
          steps.push(TraceStep {
            step_type: TraceStepType::Observation,
            content: rendered.clone(),
            tool_call: None,
            result: Some(result),
          });
          rendered
        }
        Err(message) => {
          let rendered = format!("Error: {}", message);
          steps.push(TraceStep {
            step_type: TraceStepType::Observation,
            content: rendered.clone(),
            tool_call: None,
            result: None,
          });
          rendered
        }
      };

      scratchpad.push_str(&reply);
      if !reply.ends_with('\n') {
        scratchpad.push('\n');
      }
      scratchpad.push_str(&format!("Observation: {}\n", observation));
    }

    warn!(max_iterations = self.max_iterations, "agent hit the iteration limit");
    let response = if last_thought.is_empty() {
      "Max iterations reached without a final answer.".to_string()
    } else {
      format!(
        "Max iterations reached without a final answer. Last thought: {}",
        last_thought
      )
    };
    steps.push(TraceStep {
      step_type: TraceStepType::Answer,
      content: response.clone(),
      tool_call: None,
      result: None,
    });

    Ok(AgentRun {
      response,
      steps,
      hit_iteration_limit: true,
    })
  }

  /// Resolve a tool by invocation name (exact first, then the bare type tag)
  /// and execute its node through the engine.
  async fn dispatch(
    &self,
    action: &str,
    input: Value,
    invoker: &dyn NodeInvoker,
  ) -> Result<Value, String> {
    let tool = self
      .tools
      .iter()
      .find(|t| t.name == action)
      .or_else(|| self.tools.iter().find(|t| t.kind.as_str() == action))
      .ok_or_else(|| format!("unknown tool '{}'", action))?;

    invoker
      .execute_node(&tool.node_id, input)
      .await
      .map_err(|e| e.to_string())
  }
}

/// Serialize a tool result for the transcript. Artifact references get the
/// compact human form; everything else is JSON-stringified, string results
/// included.
fn render_observation(result: &Value) -> String {
  if let Some(artifact_id) = result.get("artifactId").and_then(|v| v.as_str()) {
    let mime = result
      .get("type")
      .and_then(|v| v.as_str())
      .unwrap_or("unknown");
    return format!("Success. Artifact created: {} (type: {})", artifact_id, mime);
  }
  result.to_string()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::schema::schema_for;
  use iosans_workflow::NodeKind;

  fn tool(kind: NodeKind, node_id: &str) -> Tool {
    let name = crate::discovery::tool_name(kind, node_id);
    Tool {
      schema: schema_for(kind, &name),
      name,
      node_id: node_id.to_string(),
      kind,
    }
  }

  #[test]
  fn test_system_prompt_lists_tools_and_protocol() {
    let service = ToolCallingService::new(
      Arc::new(iosans_llm::ScriptedModel::new(Vec::<String>::new())),
      vec![tool(NodeKind::Python, "p-1")],
    );
    let prompt = service.system_prompt();
    assert!(prompt.contains("### python_p_1"));
    assert!(prompt.contains("Action Input:"));
    assert!(prompt.contains("Final Answer:"));
  }

  #[test]
  fn test_render_observation_artifact_form() {
    let result = json!({"artifactId": "abc-123", "type": "image/png"});
    assert_eq!(
      render_observation(&result),
      "Success. Artifact created: abc-123 (type: image/png)"
    );
    assert_eq!(render_observation(&json!({"x": 1})), "{\"x\":1}");
    // String results stay JSON-stringified, not bare.
    assert_eq!(render_observation(&json!("plain")), "\"plain\"");
  }
}
