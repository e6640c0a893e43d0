//! Execution events and notifiers for observability.
//!
//! Events are emitted during a run so consumers can observe progress, stream
//! to UIs, or persist history. Observers never drive the engine.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::state::LogEntry;

/// Events emitted during workflow execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExecutionEvent {
  /// A run has started.
  RunStarted { run_id: String },

  /// A node has started executing.
  NodeStarted { run_id: String, node_id: String },

  /// A node reported progress from inside its executor.
  NodeProgress {
    run_id: String,
    node_id: String,
    status: String,
    pct: f32,
  },

  /// A node has completed successfully.
  NodeCompleted {
    run_id: String,
    node_id: String,
    output: Value,
  },

  /// A node has failed.
  NodeFailed {
    run_id: String,
    node_id: String,
    error: String,
  },

  /// A log entry was appended to the run log.
  LogAppended { run_id: String, entry: LogEntry },

  /// The run finished with every reached node successful.
  RunCompleted { run_id: String },

  /// The run was torn down by a node failure or cancellation.
  RunFailed { run_id: String, error: String },
}

/// Trait for receiving execution events.
pub trait ExecutionNotifier: Send + Sync {
  /// Called for each event in emission order.
  fn notify(&self, event: ExecutionEvent);
}

/// A no-op notifier that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl ExecutionNotifier for NoopNotifier {
  fn notify(&self, _event: ExecutionEvent) {}
}

/// A notifier that forwards events to an unbounded channel.
///
/// Unbounded so a slow consumer cannot stall the engine; volume is a handful
/// of events per node.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  sender: mpsc::UnboundedSender<ExecutionEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<ExecutionEvent>) -> Self {
    Self { sender }
  }
}

impl ExecutionNotifier for ChannelNotifier {
  fn notify(&self, event: ExecutionEvent) {
    // Receiver may already be gone; that is not the engine's problem.
    let _ = self.sender.send(event);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_channel_notifier_forwards_events() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let notifier = ChannelNotifier::new(tx);
    notifier.notify(ExecutionEvent::RunStarted {
      run_id: "r1".into(),
    });

    match rx.recv().await {
      Some(ExecutionEvent::RunStarted { run_id }) => assert_eq!(run_id, "r1"),
      other => panic!("unexpected event: {:?}", other),
    }
  }

  #[test]
  fn test_channel_notifier_survives_dropped_receiver() {
    let (tx, rx) = mpsc::unbounded_channel();
    drop(rx);
    let notifier = ChannelNotifier::new(tx);
    notifier.notify(ExecutionEvent::RunCompleted {
      run_id: "r1".into(),
    });
  }
}
