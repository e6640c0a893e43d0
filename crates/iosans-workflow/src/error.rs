use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
  #[error("node not found: {0}")]
  NodeNotFound(String),

  #[error("duplicate node id: {0}")]
  DuplicateNode(String),

  #[error("duplicate edge: {0}")]
  DuplicateEdge(String),

  #[error("self-loop rejected on node: {0}")]
  SelfLoop(String),

  #[error("edge '{edge_id}' references unknown node: {node_id}")]
  UnknownNodeReference { edge_id: String, node_id: String },

  #[error("workflow contains a cycle")]
  CycleDetected,

  #[error("workflow has no nodes")]
  EmptyWorkflow,

  #[error("invalid workflow document: {0}")]
  InvalidDocument(String),
}
