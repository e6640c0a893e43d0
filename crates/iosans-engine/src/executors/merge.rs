use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::context::ExecutionContext;
use crate::error::EngineError;
use crate::executor::{ExecutionOutcome, NodeExecutor};

/// How a merge node combines its completed upstream branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeStrategy {
  /// Object keyed by source node id.
  #[default]
  Object,
  /// The branch values in edge order.
  Array,
  /// Branch values flattened one level (arrays are spliced in).
  Concat,
  /// Whichever branch completed first.
  First,
}

impl MergeStrategy {
  /// Parse the `mergeStrategy` configuration value; unknown tags fall back
  /// to `Object`.
  pub fn from_config(value: Option<&str>) -> Self {
    match value {
      Some("array") => MergeStrategy::Array,
      Some("concat") => MergeStrategy::Concat,
      Some("first") => MergeStrategy::First,
      _ => MergeStrategy::Object,
    }
  }

  /// Whether this strategy waits for every upstream branch.
  pub fn waits_for_all(&self) -> bool {
    !matches!(self, MergeStrategy::First)
  }
}

/// merge.
///
/// Scheduling (wait-all vs first-arrival) is the engine's job; by the time
/// this executor runs, `input_sources` holds every branch it should combine.
pub struct MergeExecutor;

#[async_trait]
impl NodeExecutor for MergeExecutor {
  async fn execute(&self, ctx: &ExecutionContext) -> Result<ExecutionOutcome, EngineError> {
    let strategy = MergeStrategy::from_config(ctx.config_str("mergeStrategy"));
    Ok(ExecutionOutcome::new(combine(strategy, &ctx.input_sources)))
  }
}

/// Combine `(source_id, value)` pairs per strategy.
pub fn combine(strategy: MergeStrategy, sources: &[(String, Value)]) -> Value {
  match strategy {
    MergeStrategy::Object => {
      let map: Map<String, Value> = sources
        .iter()
        .map(|(id, value)| (id.clone(), value.clone()))
        .collect();
      Value::Object(map)
    }
    MergeStrategy::Array => {
      Value::Array(sources.iter().map(|(_, value)| value.clone()).collect())
    }
    MergeStrategy::Concat => {
      let mut flattened = Vec::new();
      for (_, value) in sources {
        match value {
          Value::Array(items) => flattened.extend(items.iter().cloned()),
          other => flattened.push(other.clone()),
        }
      }
      Value::Array(flattened)
    }
    MergeStrategy::First => sources
      .first()
      .map(|(_, value)| value.clone())
      .unwrap_or(Value::Null),
  }
}
