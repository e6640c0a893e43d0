//! Iosans Engine
//!
//! The workflow execution core: per-run state, the executor contract and
//! registry, the built-in executors, and the engine that walks the graph
//! with parallel fan-out, merge synchronization, conditional routing,
//! cooperative pause, and prompt cancellation.
//!
//! The engine is re-entrant: [`ExecutionEngine::execute_node`] (and the
//! [`NodeInvoker`] seam handed to executors) runs a single node against the
//! current run's services without touching the run's status map, which is
//! how agent tool calls execute mid-traversal.

mod context;
mod engine;
mod error;
mod events;
mod executor;
pub mod executors;
mod services;
mod state;

pub use context::{ExecutionContext, NodeInvoker};
pub use engine::{ExecutionEngine, RunResult};
pub use error::EngineError;
pub use events::{ChannelNotifier, ExecutionEvent, ExecutionNotifier, NoopNotifier};
pub use executor::{ACTIVE_HANDLES, ExecutionOutcome, ExecutorRegistry, NodeExecutor};
pub use services::{
  ImageGenerator, ImageOptions, PythonRuntime, ServiceError, Services, SpeechOptions,
  SpeechSynthesizer,
};
pub use state::{
  EdgeSnapshot, ExecutionState, LogEntry, LogLevel, NodeResult, NodeStatus,
};
