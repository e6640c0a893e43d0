use thiserror::Error;

/// Error taxonomy for node execution and run orchestration.
///
/// Node-scoped variants carry the failing node's id so the run log and UI
/// surfaces can attribute the failure.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
  #[error("invalid input for node '{node_id}': {message}")]
  InvalidInput { node_id: String, message: String },

  #[error("no executor registered for node '{node_id}' of type '{kind}'")]
  UnknownType { node_id: String, kind: String },

  #[error("validation failed for node '{node_id}': {message}")]
  ValidationFailed { node_id: String, message: String },

  #[error("Execution aborted")]
  Cancelled,

  #[error("node '{node_id}' timed out")]
  Timeout { node_id: String },

  #[error("service unavailable for node '{node_id}': {message}")]
  ServiceUnavailable { node_id: String, message: String },

  #[error("node '{node_id}' failed: {message}")]
  External { node_id: String, message: String },

  #[error("storage failure for node '{node_id}': {message}")]
  Storage { node_id: String, message: String },

  #[error("agent '{node_id}' hit the iteration limit")]
  MaxIterations { node_id: String },

  #[error("workflow contains a cycle")]
  CycleDetected,

  #[error("workflow has no entry nodes")]
  NoEntry,
}

impl EngineError {
  /// The taxonomy tag, as shown in user-facing failure surfaces.
  pub fn kind(&self) -> &'static str {
    match self {
      EngineError::InvalidInput { .. } => "InvalidInput",
      EngineError::UnknownType { .. } => "UnknownType",
      EngineError::ValidationFailed { .. } => "ValidationFailed",
      EngineError::Cancelled => "Cancelled",
      EngineError::Timeout { .. } => "Timeout",
      EngineError::ServiceUnavailable { .. } => "ServiceUnavailable",
      EngineError::External { .. } => "ExternalError",
      EngineError::Storage { .. } => "StorageFailure",
      EngineError::MaxIterations { .. } => "MaxIterations",
      EngineError::CycleDetected => "CycleDetected",
      EngineError::NoEntry => "NoEntry",
    }
  }

  /// The node this error is attributed to, if any.
  pub fn node_id(&self) -> Option<&str> {
    match self {
      EngineError::InvalidInput { node_id, .. }
      | EngineError::UnknownType { node_id, .. }
      | EngineError::ValidationFailed { node_id, .. }
      | EngineError::Timeout { node_id }
      | EngineError::ServiceUnavailable { node_id, .. }
      | EngineError::External { node_id, .. }
      | EngineError::Storage { node_id, .. }
      | EngineError::MaxIterations { node_id } => Some(node_id),
      _ => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_cancelled_message_is_exact() {
    assert_eq!(EngineError::Cancelled.to_string(), "Execution aborted");
  }

  #[test]
  fn test_kind_tags() {
    let err = EngineError::Storage {
      node_id: "n".into(),
      message: "disk".into(),
    };
    assert_eq!(err.kind(), "StorageFailure");
    assert_eq!(err.node_id(), Some("n"));
    assert_eq!(EngineError::NoEntry.node_id(), None);
  }
}
