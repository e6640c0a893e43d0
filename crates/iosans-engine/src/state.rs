//! Per-run execution state.
//!
//! `ExecutionState` is the shared mutable record of a single run: node
//! statuses with timing, edge snapshots, the append-only run log, and the
//! pause/running flags. Public operations are linearizable; observers read
//! snapshots or subscribe through the engine's notifier and never drive
//! execution.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle status of a node within a run.
///
/// Status advances monotonically: once `Success` or `Error`, later writes for
/// the same run are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
  Pending,
  Running,
  Success,
  Error,
}

/// Status, timing, and output for one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeResult {
  pub status: NodeStatus,
  pub start_time: Option<DateTime<Utc>>,
  pub end_time: Option<DateTime<Utc>>,
  pub output: Option<Value>,
  pub error: Option<String>,
}

impl NodeResult {
  fn pending() -> Self {
    Self {
      status: NodeStatus::Pending,
      start_time: None,
      end_time: None,
      output: None,
      error: None,
    }
  }

  fn is_terminal(&self) -> bool {
    matches!(self.status, NodeStatus::Success | NodeStatus::Error)
  }
}

/// The value an edge carried when its source node completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeSnapshot {
  pub data: Value,
  pub timestamp: DateTime<Utc>,
}

/// Severity of a run log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
  Info,
  Action,
  Success,
  Error,
}

/// One entry in the append-only run log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
  pub node_id: Option<String>,
  pub timestamp: DateTime<Utc>,
  pub level: LogLevel,
  pub message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub data: Option<Value>,
}

#[derive(Debug, Default)]
struct Inner {
  nodes: HashMap<String, NodeResult>,
  edge_snapshots: HashMap<String, EdgeSnapshot>,
  log: Vec<LogEntry>,
  run_start: Option<DateTime<Utc>>,
  run_end: Option<DateTime<Utc>>,
}

/// Shared mutable state for a single run.
#[derive(Debug, Default)]
pub struct ExecutionState {
  inner: Mutex<Inner>,
  running: AtomicBool,
  paused: AtomicBool,
}

impl ExecutionState {
  pub fn new() -> Self {
    Self::default()
  }

  /// Begin a run: mark every node pending, stamp `run_start`, and drop any
  /// state left over from a previous run.
  pub fn start_run<I, S>(&self, node_ids: I)
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let mut inner = self.inner.lock().expect("execution state poisoned");
    inner.nodes = node_ids
      .into_iter()
      .map(|id| (id.into(), NodeResult::pending()))
      .collect();
    inner.edge_snapshots.clear();
    inner.log.clear();
    inner.run_start = Some(Utc::now());
    inner.run_end = None;
    self.running.store(true, Ordering::SeqCst);
    self.paused.store(false, Ordering::SeqCst);
  }

  /// Finish the run: stamp `run_end` and clear the running flag.
  pub fn end_run(&self) {
    let mut inner = self.inner.lock().expect("execution state poisoned");
    inner.run_end = Some(Utc::now());
    self.running.store(false, Ordering::SeqCst);
  }

  /// Mark a node running. Ignored if the node is already terminal.
  pub fn set_running(&self, node_id: &str) {
    let mut inner = self.inner.lock().expect("execution state poisoned");
    let entry = inner
      .nodes
      .entry(node_id.to_string())
      .or_insert_with(NodeResult::pending);
    if entry.is_terminal() {
      return;
    }
    entry.status = NodeStatus::Running;
    entry.start_time = Some(Utc::now());
  }

  /// Mark a node successful with its output. Ignored if already terminal.
  pub fn set_success(&self, node_id: &str, output: Value) {
    let mut inner = self.inner.lock().expect("execution state poisoned");
    let entry = inner
      .nodes
      .entry(node_id.to_string())
      .or_insert_with(NodeResult::pending);
    if entry.is_terminal() {
      return;
    }
    entry.status = NodeStatus::Success;
    entry.end_time = Some(Utc::now());
    entry.output = Some(output);
  }

  /// Mark a node failed with an error message. Ignored if already terminal.
  pub fn set_error(&self, node_id: &str, error: impl Into<String>) {
    let mut inner = self.inner.lock().expect("execution state poisoned");
    let entry = inner
      .nodes
      .entry(node_id.to_string())
      .or_insert_with(NodeResult::pending);
    if entry.is_terminal() {
      return;
    }
    entry.status = NodeStatus::Error;
    entry.end_time = Some(Utc::now());
    entry.error = Some(error.into());
  }

  /// Snapshot one node's result.
  pub fn result(&self, node_id: &str) -> Option<NodeResult> {
    let inner = self.inner.lock().expect("execution state poisoned");
    inner.nodes.get(node_id).cloned()
  }

  /// Snapshot every node result.
  pub fn results(&self) -> HashMap<String, NodeResult> {
    let inner = self.inner.lock().expect("execution state poisoned");
    inner.nodes.clone()
  }

  /// Record the value an edge carried. First write per run wins.
  pub fn set_edge_snapshot(&self, edge_id: &str, data: Value) {
    let mut inner = self.inner.lock().expect("execution state poisoned");
    inner
      .edge_snapshots
      .entry(edge_id.to_string())
      .or_insert_with(|| EdgeSnapshot {
        data,
        timestamp: Utc::now(),
      });
  }

  /// Snapshot one edge's carried value.
  pub fn edge_snapshot(&self, edge_id: &str) -> Option<EdgeSnapshot> {
    let inner = self.inner.lock().expect("execution state poisoned");
    inner.edge_snapshots.get(edge_id).cloned()
  }

  /// Append a log entry.
  pub fn add_log(
    &self,
    node_id: Option<&str>,
    level: LogLevel,
    message: impl Into<String>,
    data: Option<Value>,
  ) -> LogEntry {
    let entry = LogEntry {
      node_id: node_id.map(str::to_string),
      timestamp: Utc::now(),
      level,
      message: message.into(),
      data,
    };
    let mut inner = self.inner.lock().expect("execution state poisoned");
    inner.log.push(entry.clone());
    entry
  }

  /// Snapshot the run log.
  pub fn logs(&self) -> Vec<LogEntry> {
    let inner = self.inner.lock().expect("execution state poisoned");
    inner.log.clone()
  }

  pub fn pause(&self) {
    self.paused.store(true, Ordering::SeqCst);
  }

  pub fn resume(&self) {
    self.paused.store(false, Ordering::SeqCst);
  }

  pub fn is_paused(&self) -> bool {
    self.paused.load(Ordering::SeqCst)
  }

  pub fn is_running(&self) -> bool {
    self.running.load(Ordering::SeqCst)
  }

  pub fn run_start(&self) -> Option<DateTime<Utc>> {
    self.inner.lock().expect("execution state poisoned").run_start
  }

  pub fn run_end(&self) -> Option<DateTime<Utc>> {
    self.inner.lock().expect("execution state poisoned").run_end
  }

  /// Drop all per-run data without starting a new run.
  pub fn clear_results(&self) {
    let mut inner = self.inner.lock().expect("execution state poisoned");
    inner.nodes.clear();
    inner.edge_snapshots.clear();
    inner.log.clear();
    inner.run_start = None;
    inner.run_end = None;
    self.running.store(false, Ordering::SeqCst);
    self.paused.store(false, Ordering::SeqCst);
  }
}
