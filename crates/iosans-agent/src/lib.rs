//! Iosans Agent
//!
//! The aiAgent executor and its ReAct tool-calling loop. An agent node treats
//! the nodes wired to its resource slots as callable tools: each tool gets a
//! synthesized JSON-Schema description, the loop prompts the chat model with
//! the ReAct protocol (`Thought:` / `Action:` / `Action Input:` /
//! `Observation:` / `Final Answer:`), and actions dispatch back into the
//! engine through its re-entry seam without touching the run's status map.

mod discovery;
mod executor;
mod react;
mod schema;
mod service;

pub use discovery::{Tool, discover_tools, tool_name};
pub use executor::AgentExecutor;
pub use react::{ParsedReply, parse_reply};
pub use schema::{ToolSchema, schema_for};
pub use service::{AgentRun, ToolCallingService, TraceStep, TraceStepType};
