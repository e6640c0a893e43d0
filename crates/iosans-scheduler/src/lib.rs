//! Iosans Scheduler
//!
//! A background loop that fires schedule triggers on cron expressions. The
//! loop ticks every couple of seconds and processes each absolute minute at
//! most once across the whole scheduler: the first enabled `scheduleTrigger`
//! whose expression matches the minute initiates a run, and the
//! last-processed-minute watermark advances unconditionally so nothing fires
//! twice within the same minute. Scheduling is best-effort and
//! minute-granular; a stalled process simply skips minutes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use iosans_workflow::{NodeKind, Workflow, WorkflowStore};

/// Default tick interval.
pub const DEFAULT_TICK: Duration = Duration::from_secs(2);

/// Receives the trigger node chosen for a minute and initiates the run.
///
/// Injected so the scheduler is testable without an engine; the embedder
/// typically snapshots the workflow and calls `ExecutionEngine::run`.
#[async_trait]
pub trait TriggerSink: Send + Sync {
  async fn trigger(&self, node_id: String);
}

/// The cron scheduler.
pub struct Scheduler<S: TriggerSink> {
  store: Arc<WorkflowStore>,
  sink: S,
  tick: Duration,
}

impl<S: TriggerSink> Scheduler<S> {
  pub fn new(store: Arc<WorkflowStore>, sink: S) -> Self {
    Self {
      store,
      sink,
      tick: DEFAULT_TICK,
    }
  }

  pub fn with_tick(mut self, tick: Duration) -> Self {
    self.tick = tick;
    self
  }

  /// Run the tick loop until cancelled.
  #[instrument(name = "scheduler_run", skip_all)]
  pub async fn run(&self, cancel: CancellationToken) {
    let mut last_minute: i64 = 0;
    info!("scheduler started");

    loop {
      tokio::select! {
        _ = tokio::time::sleep(self.tick) => {}
        _ = cancel.cancelled() => break,
      }

      let now = Local::now();
      let minute = now.timestamp() / 60;
      if minute <= last_minute {
        continue;
      }

      let workflow = self.store.snapshot();
      if let Some(node_id) = matching_trigger(&workflow, &now) {
        info!(node_id = %node_id, minute, "schedule trigger fired");
        self.sink.trigger(node_id).await;
      } else {
        debug!(minute, "no schedule trigger matched");
      }

      // Advance even when nothing fired; the minute is spent either way.
      last_minute = minute;
    }

    info!("scheduler stopped");
  }
}

/// The first enabled schedule trigger whose expression matches `now`.
pub fn matching_trigger(workflow: &Workflow, now: &DateTime<Local>) -> Option<String> {
  workflow
    .nodes
    .iter()
    .filter(|node| node.kind == NodeKind::ScheduleTrigger)
    .filter(|node| {
      node
        .config("enabled")
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
    })
    .find(|node| {
      node
        .config_str("cronExpression")
        .is_some_and(|expr| iosans_cron::matches(expr, now))
    })
    .map(|node| node.id.clone())
}

#[cfg(test)]
mod tests {
  use super::*;
  use iosans_workflow::Node;
  use serde_json::{Map, json};
  use std::sync::Mutex;

  fn trigger_node(id: &str, expr: &str, enabled: bool) -> Node {
    let mut data = Map::new();
    data.insert("cronExpression".to_string(), json!(expr));
    data.insert("enabled".to_string(), json!(enabled));
    Node::with_data(id, NodeKind::ScheduleTrigger, data)
  }

  #[test]
  fn test_first_enabled_match_wins() {
    let workflow = Workflow::new(
      vec![
        trigger_node("disabled", "* * * * *", false),
        trigger_node("a", "* * * * *", true),
        trigger_node("b", "* * * * *", true),
      ],
      vec![],
    );
    let now = Local::now();
    assert_eq!(matching_trigger(&workflow, &now), Some("a".to_string()));
  }

  #[test]
  fn test_no_match_without_expression() {
    let mut data = Map::new();
    data.insert("enabled".to_string(), json!(true));
    let workflow = Workflow::new(
      vec![Node::with_data("t", NodeKind::ScheduleTrigger, data)],
      vec![],
    );
    assert_eq!(matching_trigger(&workflow, &Local::now()), None);
  }

  struct Recorder(Mutex<Vec<String>>);

  #[async_trait]
  impl TriggerSink for Arc<Recorder> {
    async fn trigger(&self, node_id: String) {
      self.0.lock().unwrap().push(node_id);
    }
  }

  #[tokio::test]
  async fn test_loop_fires_at_most_once_per_minute() {
    let store = Arc::new(WorkflowStore::new());
    store.add_node(trigger_node("t", "* * * * *", true)).unwrap();

    let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
    let scheduler =
      Scheduler::new(store, recorder.clone()).with_tick(Duration::from_millis(10));

    let cancel = CancellationToken::new();
    let handle = {
      let cancel = cancel.clone();
      tokio::spawn(async move { scheduler.run(cancel).await })
    };

    tokio::time::sleep(Duration::from_millis(120)).await;
    cancel.cancel();
    handle.await.unwrap();

    // Several ticks land in the same minute; only the first processes it.
    // (A second fire is possible only if the wall clock crosses a minute
    // boundary inside the test window.)
    let fired = recorder.0.lock().unwrap().len();
    assert!((1..=2).contains(&fired), "fired {} times", fired);
  }
}
