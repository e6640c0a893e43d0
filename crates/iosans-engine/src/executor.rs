//! The executor contract and the type-tag registry.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use iosans_workflow::NodeKind;

use crate::context::ExecutionContext;
use crate::error::EngineError;

/// Metadata key carrying the set of source handles a routing executor chose.
pub const ACTIVE_HANDLES: &str = "activeHandles";

/// Result of a successful node execution: the output value plus free-form
/// metadata. Routing executors put the chosen branch handles under
/// [`ACTIVE_HANDLES`]; the engine gates outgoing edges on them.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutcome {
  pub output: Value,
  pub metadata: Map<String, Value>,
}

impl ExecutionOutcome {
  /// An outcome with no metadata.
  pub fn new(output: Value) -> Self {
    Self {
      output,
      metadata: Map::new(),
    }
  }

  /// Attach the active source handles for conditional routing.
  pub fn with_active_handles<I, S>(mut self, handles: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let handles: Vec<Value> = handles.into_iter().map(|h| Value::String(h.into())).collect();
    self.metadata.insert(ACTIVE_HANDLES.to_string(), Value::Array(handles));
    self
  }

  /// Attach an arbitrary metadata entry.
  pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
    self.metadata.insert(key.into(), value);
    self
  }

  /// The active handles, if this outcome restricted routing.
  pub fn active_handles(&self) -> Option<Vec<String>> {
    self.metadata.get(ACTIVE_HANDLES).and_then(|v| {
      v.as_array().map(|arr| {
        arr
          .iter()
          .filter_map(|h| h.as_str().map(str::to_string))
          .collect()
      })
    })
  }
}

/// Per-type node logic.
///
/// `validate` runs before `execute` and must be cheap; a validation failure
/// marks the node `error` without executing it. `execute` may suspend at I/O
/// and must observe `ctx.cancel` at every suspension point.
#[async_trait]
pub trait NodeExecutor: Send + Sync {
  /// Cheap pre-flight checks (required configuration present, etc.).
  fn validate(&self, _ctx: &ExecutionContext) -> Result<(), String> {
    Ok(())
  }

  /// Execute the node.
  async fn execute(&self, ctx: &ExecutionContext) -> Result<ExecutionOutcome, EngineError>;
}

/// Maps node type tags to executor implementations.
#[derive(Default)]
pub struct ExecutorRegistry {
  executors: HashMap<NodeKind, Arc<dyn NodeExecutor>>,
}

impl ExecutorRegistry {
  /// An empty registry.
  pub fn new() -> Self {
    Self::default()
  }

  /// A registry with every built-in executor registered.
  ///
  /// The aiAgent executor lives in its own crate and is registered by the
  /// embedder on top of this set.
  pub fn with_builtins() -> Self {
    let mut registry = Self::new();
    crate::executors::register_builtins(&mut registry);
    registry
  }

  /// Register (or replace) the executor for a node kind.
  pub fn register(&mut self, kind: NodeKind, executor: Arc<dyn NodeExecutor>) {
    self.executors.insert(kind, executor);
  }

  /// Look up the executor for a node kind.
  pub fn get(&self, kind: NodeKind) -> Option<Arc<dyn NodeExecutor>> {
    self.executors.get(&kind).cloned()
  }

  /// The kinds this registry can execute.
  pub fn kinds(&self) -> Vec<NodeKind> {
    self.executors.keys().copied().collect()
  }
}

impl std::fmt::Debug for ExecutorRegistry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ExecutorRegistry")
      .field("kinds", &self.kinds())
      .finish()
  }
}
