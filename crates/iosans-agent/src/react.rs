//! Parsing for the ReAct wire format.
//!
//! Replies are line-oriented with exact, case-sensitive prefixes:
//! `Thought:`, `Action:`, `Action Input:`, `Final Answer:`. `Action Input`
//! is strict JSON when possible; raw text is wrapped as `{"input": <raw>}`.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Value, json};

/// The structured content of one model reply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedReply {
  pub thought: Option<String>,
  pub action: Option<String>,
  pub action_input: Option<String>,
  pub final_answer: Option<String>,
}

fn patterns() -> &'static [Regex; 4] {
  static PATTERNS: OnceLock<[Regex; 4]> = OnceLock::new();
  PATTERNS.get_or_init(|| {
    [
      Regex::new(r"(?m)^Action:\s*(.+)$").expect("action pattern"),
      Regex::new(r"(?m)^Action Input:\s*(.+)$").expect("action input pattern"),
      Regex::new(r"(?m)^Final Answer:\s*([\s\S]+)$").expect("final answer pattern"),
      Regex::new(r"(?m)^Thought:\s*([\s\S]+?)(?:\n(?:Action|Final Answer)|\z)")
        .expect("thought pattern"),
    ]
  })
}

/// Parse a model reply into its ReAct parts.
pub fn parse_reply(reply: &str) -> ParsedReply {
  let [action_re, input_re, final_re, thought_re] = patterns();

  let capture = |re: &Regex| {
    re.captures(reply)
      .and_then(|c| c.get(1))
      .map(|m| m.as_str().trim().to_string())
  };

  ParsedReply {
    thought: capture(thought_re),
    action: capture(action_re),
    action_input: capture(input_re),
    final_answer: capture(final_re),
  }
}

/// Interpret an `Action Input` payload: strict JSON preferred, raw text
/// wrapped as `{"input": <raw>}`.
pub fn parse_action_input(raw: Option<&str>) -> Value {
  match raw {
    None => json!({}),
    Some(raw) => serde_json::from_str(raw).unwrap_or_else(|_| json!({ "input": raw })),
  }
}
