//! Execution context handed to node executors.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use iosans_workflow::Workflow;

use crate::error::EngineError;
use crate::events::{ExecutionEvent, ExecutionNotifier};
use crate::services::Services;
use crate::state::{ExecutionState, LogLevel};

/// Imperative re-entry into the engine, used by the agent executor to invoke
/// tool nodes mid-run.
///
/// Implementations execute a node against the current run's services and
/// cancellation without touching the run's status map; tool invocations only
/// appear in the run log (`level=action`).
#[async_trait]
pub trait NodeInvoker: Send + Sync {
  async fn execute_node(&self, node_id: &str, inputs: Value) -> Result<Value, EngineError>;
}

/// Everything an executor sees while running one node.
#[derive(Clone)]
pub struct ExecutionContext {
  /// Id of the node being executed.
  pub node_id: String,
  /// The node's configuration map, immutable for the duration of the run.
  pub node_data: Map<String, Value>,
  /// Gathered upstream data: a single upstream's output unwrapped, or an
  /// object keyed by source node id when several upstreams completed.
  pub inputs: Value,
  /// The raw `(source_id, output)` pairs behind `inputs`, in edge order.
  /// Merge strategies need the source attribution that unwrapping drops.
  pub input_sources: Vec<(String, Value)>,
  /// Snapshot of the workflow this run executes.
  pub workflow: Arc<Workflow>,
  /// Injected services.
  pub services: Arc<Services>,
  /// Cancellation for this run (inherited by re-entrant tool calls).
  pub cancel: CancellationToken,
  /// Engine re-entry for tool dispatch; present for agent-capable runs.
  pub invoker: Option<Arc<dyn NodeInvoker>>,

  pub(crate) run_id: String,
  pub(crate) state: Arc<ExecutionState>,
  pub(crate) notifier: Arc<dyn ExecutionNotifier>,
}

impl ExecutionContext {
  /// Append to the run log and notify observers.
  pub fn log(&self, level: LogLevel, message: impl Into<String>) {
    self.log_data(level, message, None);
  }

  /// Append to the run log with an attached data payload.
  pub fn log_data(&self, level: LogLevel, message: impl Into<String>, data: Option<Value>) {
    let entry = self.state.add_log(Some(&self.node_id), level, message, data);
    self.notifier.notify(ExecutionEvent::LogAppended {
      run_id: self.run_id.clone(),
      entry,
    });
  }

  /// Report executor-internal progress to observers.
  pub fn set_progress(&self, status: impl Into<String>, pct: f32) {
    self.notifier.notify(ExecutionEvent::NodeProgress {
      run_id: self.run_id.clone(),
      node_id: self.node_id.clone(),
      status: status.into(),
      pct,
    });
  }

  /// Fetch a configuration value.
  pub fn config(&self, key: &str) -> Option<&Value> {
    self.node_data.get(key)
  }

  /// Fetch a configuration string.
  pub fn config_str(&self, key: &str) -> Option<&str> {
    self.node_data.get(key).and_then(|v| v.as_str())
  }

  /// Fetch a configuration number.
  pub fn config_f64(&self, key: &str) -> Option<f64> {
    self.node_data.get(key).and_then(|v| v.as_f64())
  }

  /// Fetch a configuration integer.
  pub fn config_u64(&self, key: &str) -> Option<u64> {
    self.node_data.get(key).and_then(|v| v.as_u64())
  }
}

impl std::fmt::Debug for ExecutionContext {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ExecutionContext")
      .field("node_id", &self.node_id)
      .field("run_id", &self.run_id)
      .field("inputs", &self.inputs)
      .finish()
  }
}
