//! Integration tests for ExecutionEngine::run.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value, json};
use tokio_util::sync::CancellationToken;

use iosans_artifact::MemoryStore;
use iosans_engine::{
  EngineError, ExecutionEngine, ExecutionState, ExecutorRegistry, NodeStatus, Services,
};
use iosans_workflow::{Edge, Node, NodeKind, Workflow};

fn engine() -> ExecutionEngine {
  ExecutionEngine::new(
    ExecutorRegistry::with_builtins(),
    Services::new(Arc::new(MemoryStore::new())),
  )
}

fn node(id: &str, kind: NodeKind, data: Value) -> Node {
  let data: Map<String, Value> = data
    .as_object()
    .cloned()
    .unwrap_or_default();
  Node::with_data(id, kind, data)
}

fn code(id: &str, snippet: &str) -> Node {
  node(id, NodeKind::CodeExecutor, json!({"code": snippet}))
}

async fn run(
  workflow: Workflow,
) -> (
  Result<iosans_engine::RunResult, EngineError>,
  Arc<ExecutionState>,
) {
  let state = Arc::new(ExecutionState::new());
  let result = engine()
    .run(workflow, state.clone(), CancellationToken::new())
    .await;
  (result, state)
}

#[tokio::test]
async fn test_linear_flow() {
  // manualTrigger -> codeExecutor -> output
  let workflow = Workflow::new(
    vec![
      node("T", NodeKind::ManualTrigger, json!({})),
      code("C", "return inputs.timestamp and 'ok' or 'no'"),
      node("O", NodeKind::Output, json!({})),
    ],
    vec![Edge::new("e1", "T", "C"), Edge::new("e2", "C", "O")],
  );

  let (result, state) = run(workflow).await;
  result.expect("run should succeed");

  let trigger = state.result("T").unwrap();
  assert_eq!(trigger.status, NodeStatus::Success);
  let output = trigger.output.unwrap();
  assert_eq!(output["triggered"], json!(true));
  assert!(output["timestamp"].is_string());

  assert_eq!(state.result("C").unwrap().output, Some(json!("ok")));
  assert_eq!(state.result("O").unwrap().output, Some(json!("ok")));
  assert_eq!(state.result("O").unwrap().status, NodeStatus::Success);
}

#[tokio::test]
async fn test_if_else_branching_skips_false_branch() {
  // T -> preload -> ifElse -> [true -> A, false -> B]
  let workflow = Workflow::new(
    vec![
      node("T", NodeKind::ManualTrigger, json!({})),
      code("P", "return { value = 42 }"),
      node(
        "I",
        NodeKind::IfElse,
        json!({"field": "value", "operator": "greaterThan", "value": 10}),
      ),
      node("A", NodeKind::Transform, json!({})),
      node("B", NodeKind::Transform, json!({})),
    ],
    vec![
      Edge::new("e1", "T", "P"),
      Edge::new("e2", "P", "I"),
      Edge::new("e3", "I", "A").from_handle("I-true"),
      Edge::new("e4", "I", "B").from_handle("I-false"),
    ],
  );

  let (result, state) = run(workflow).await;
  result.expect("run should succeed");

  assert_eq!(state.result("A").unwrap().status, NodeStatus::Success);
  // The false branch is never scheduled.
  assert_eq!(state.result("B").unwrap().status, NodeStatus::Pending);
}

#[tokio::test]
async fn test_merge_waits_for_all_branches() {
  // Two branches of different latency joining at an object merge.
  let workflow = Workflow::new(
    vec![
      node("T", NodeKind::ManualTrigger, json!({})),
      node("dX", NodeKind::Delay, json!({"delay": 100})),
      node("dY", NodeKind::Delay, json!({"delay": 250})),
      code("X", "return { a = 1 }"),
      code("Y", "return { b = 2 }"),
      node("M", NodeKind::Merge, json!({"mergeStrategy": "object"})),
      node("O", NodeKind::Output, json!({})),
    ],
    vec![
      Edge::new("e1", "T", "dX"),
      Edge::new("e2", "T", "dY"),
      Edge::new("e3", "dX", "X"),
      Edge::new("e4", "dY", "Y"),
      Edge::new("e5", "X", "M"),
      Edge::new("e6", "Y", "M"),
      Edge::new("e7", "M", "O"),
    ],
  );

  let (result, state) = run(workflow).await;
  result.expect("run should succeed");

  let merged = state.result("M").unwrap();
  assert_eq!(merged.status, NodeStatus::Success);
  assert_eq!(
    merged.output,
    Some(json!({"X": {"a": 1}, "Y": {"b": 2}}))
  );
  assert_eq!(state.result("O").unwrap().output, Some(json!({"X": {"a": 1}, "Y": {"b": 2}})));
}

#[tokio::test]
async fn test_merge_first_fires_once_with_earliest_branch() {
  let workflow = Workflow::new(
    vec![
      node("T", NodeKind::ManualTrigger, json!({})),
      code("X", "return 'fast'"),
      node("dY", NodeKind::Delay, json!({"delay": 200})),
      code("Y", "return 'slow'"),
      node("M", NodeKind::Merge, json!({"mergeStrategy": "first"})),
    ],
    vec![
      Edge::new("e1", "T", "X"),
      Edge::new("e2", "T", "dY"),
      Edge::new("e3", "dY", "Y"),
      Edge::new("e4", "X", "M"),
      Edge::new("e5", "Y", "M"),
    ],
  );

  let (result, state) = run(workflow).await;
  result.expect("run should succeed");

  assert_eq!(state.result("M").unwrap().output, Some(json!("fast")));
  // The slow branch still completed, but did not re-fire the merge.
  assert_eq!(state.result("Y").unwrap().status, NodeStatus::Success);
}

#[tokio::test]
async fn test_cancellation_aborts_delay_promptly() {
  // T -> delay(5000) -> O, aborted at ~100ms.
  let workflow = Workflow::new(
    vec![
      node("T", NodeKind::ManualTrigger, json!({})),
      node("D", NodeKind::Delay, json!({"delay": 5000})),
      node("O", NodeKind::Output, json!({})),
    ],
    vec![Edge::new("e1", "T", "D"), Edge::new("e2", "D", "O")],
  );

  let state = Arc::new(ExecutionState::new());
  let cancel = CancellationToken::new();
  {
    let cancel = cancel.clone();
    tokio::spawn(async move {
      tokio::time::sleep(Duration::from_millis(100)).await;
      cancel.cancel();
    });
  }

  let result = engine().run(workflow, state.clone(), cancel).await;
  assert!(matches!(result, Err(EngineError::Cancelled)));

  let delayed = state.result("D").unwrap();
  assert_eq!(delayed.status, NodeStatus::Error);
  assert_eq!(delayed.error.as_deref(), Some("Execution aborted"));
  assert_eq!(state.result("O").unwrap().status, NodeStatus::Pending);
  assert!(!state.is_running());

  let elapsed = state.run_end().unwrap() - state.run_start().unwrap();
  assert!(elapsed < chrono::Duration::milliseconds(500), "run took {}", elapsed);
}

#[tokio::test]
async fn test_switch_routes_matching_case() {
  let workflow = Workflow::new(
    vec![
      node("T", NodeKind::ManualTrigger, json!({})),
      code("P", "return { level = 'high' }"),
      node(
        "S",
        NodeKind::Switch,
        json!({"switchKey": "level", "cases": ["low", "high", "default"]}),
      ),
      node("H", NodeKind::Transform, json!({})),
      node("L", NodeKind::Transform, json!({})),
      node("D", NodeKind::Transform, json!({})),
    ],
    vec![
      Edge::new("e1", "T", "P"),
      Edge::new("e2", "P", "S"),
      Edge::new("e3", "S", "H").from_handle("S-case-high"),
      Edge::new("e4", "S", "L").from_handle("S-case-low"),
      Edge::new("e5", "S", "D").from_handle("S-case-default"),
    ],
  );

  let (result, state) = run(workflow).await;
  result.expect("run should succeed");

  assert_eq!(state.result("H").unwrap().status, NodeStatus::Success);
  assert_eq!(state.result("L").unwrap().status, NodeStatus::Pending);
  assert_eq!(state.result("D").unwrap().status, NodeStatus::Pending);
}

#[tokio::test]
async fn test_node_failure_fails_run_fast() {
  let workflow = Workflow::new(
    vec![
      node("T", NodeKind::ManualTrigger, json!({})),
      code("C", "error('boom')"),
      node("O", NodeKind::Output, json!({})),
    ],
    vec![Edge::new("e1", "T", "C"), Edge::new("e2", "C", "O")],
  );

  let (result, state) = run(workflow).await;
  assert!(matches!(result, Err(EngineError::External { .. })));

  assert_eq!(state.result("C").unwrap().status, NodeStatus::Error);
  assert_eq!(state.result("O").unwrap().status, NodeStatus::Pending);
  assert!(state.run_end().is_some());
}

#[tokio::test]
async fn test_validation_failure_marks_node_without_executing() {
  // Switch without a switchKey fails validation.
  let workflow = Workflow::new(
    vec![
      node("T", NodeKind::ManualTrigger, json!({})),
      node("S", NodeKind::Switch, json!({})),
    ],
    vec![Edge::new("e1", "T", "S")],
  );

  let (result, state) = run(workflow).await;
  assert!(matches!(result, Err(EngineError::ValidationFailed { .. })));
  let failed = state.result("S").unwrap();
  assert_eq!(failed.status, NodeStatus::Error);
  assert!(failed.error.unwrap().contains("switchKey"));
}

#[tokio::test]
async fn test_unknown_executor_type() {
  // No agent executor is registered in the built-in set.
  let workflow = Workflow::new(
    vec![node("A", NodeKind::AiAgent, json!({}))],
    vec![],
  );

  let (result, state) = run(workflow).await;
  assert!(matches!(result, Err(EngineError::UnknownType { .. })));
  assert_eq!(state.result("A").unwrap().status, NodeStatus::Error);
}

#[tokio::test]
async fn test_empty_workflow_is_no_entry() {
  let (result, _) = run(Workflow::default()).await;
  assert!(matches!(result, Err(EngineError::NoEntry)));
}

#[tokio::test]
async fn test_fully_cyclic_workflow_is_detected() {
  let workflow = Workflow::new(
    vec![
      node("A", NodeKind::Transform, json!({})),
      node("B", NodeKind::Transform, json!({})),
    ],
    vec![Edge::new("e1", "A", "B"), Edge::new("e2", "B", "A")],
  );
  let (result, _) = run(workflow).await;
  assert!(matches!(result, Err(EngineError::CycleDetected)));
}

#[tokio::test]
async fn test_execute_node_reentry_leaves_status_untouched() {
  let workflow = Arc::new(Workflow::new(
    vec![code("C", "return inputs.x * 3")],
    vec![],
  ));
  let state = Arc::new(ExecutionState::new());
  state.start_run(["C"]);

  let output = engine()
    .execute_node(
      &workflow,
      &state,
      &CancellationToken::new(),
      "C",
      json!({"x": 2}),
    )
    .await
    .unwrap();

  assert_eq!(output, json!(6));
  assert_eq!(state.result("C").unwrap().status, NodeStatus::Pending);
  assert!(
    state
      .logs()
      .iter()
      .any(|entry| entry.level == iosans_engine::LogLevel::Action)
  );
}

#[tokio::test]
async fn test_input_gathering_unwraps_single_and_maps_many() {
  // C1 has one upstream (unwrapped), C2 has two (mapped by source id).
  let workflow = Workflow::new(
    vec![
      node("T", NodeKind::ManualTrigger, json!({})),
      code("A", "return 'from-a'"),
      code("B", "return 'from-b'"),
      code("C1", "return inputs"),
      code("C2", "return inputs"),
    ],
    vec![
      Edge::new("e1", "T", "A"),
      Edge::new("e2", "T", "B"),
      Edge::new("e3", "A", "C1"),
      Edge::new("e4", "A", "C2"),
      Edge::new("e5", "B", "C2"),
    ],
  );

  let (result, state) = run(workflow).await;
  result.expect("run should succeed");

  assert_eq!(state.result("C1").unwrap().output, Some(json!("from-a")));
  assert_eq!(
    state.result("C2").unwrap().output,
    Some(json!({"A": "from-a", "B": "from-b"}))
  );
}

#[tokio::test]
async fn test_edge_snapshots_written_for_every_outgoing_edge() {
  let workflow = Workflow::new(
    vec![
      node("T", NodeKind::ManualTrigger, json!({})),
      code("A", "return 'x'"),
      node("O1", NodeKind::Output, json!({})),
      node("O2", NodeKind::Output, json!({})),
    ],
    vec![
      Edge::new("e1", "T", "A"),
      Edge::new("e2", "A", "O1"),
      Edge::new("e3", "A", "O2"),
    ],
  );

  let (result, state) = run(workflow).await;
  result.expect("run should succeed");

  assert_eq!(state.edge_snapshot("e2").unwrap().data, json!("x"));
  assert_eq!(state.edge_snapshot("e3").unwrap().data, json!("x"));
  assert!(state.edge_snapshot("e1").is_some());
}

#[tokio::test]
async fn test_pause_holds_nodes_at_boundaries() {
  // T -> D(100ms) -> C. Pausing while D is in flight must hold C at its
  // boundary; pause never interrupts an executor body.
  let workflow = Workflow::new(
    vec![
      node("T", NodeKind::ManualTrigger, json!({})),
      node("D", NodeKind::Delay, json!({"delay": 100})),
      code("C", "return 'done'"),
    ],
    vec![Edge::new("e1", "T", "D"), Edge::new("e2", "D", "C")],
  );

  let state = Arc::new(ExecutionState::new());
  let cancel = CancellationToken::new();
  let eng = engine();

  let run_handle = {
    let state = state.clone();
    tokio::spawn(async move { eng.run(workflow, state, cancel).await })
  };

  tokio::time::sleep(Duration::from_millis(30)).await;
  state.pause();

  // Well past D's completion: C must not have produced output yet.
  tokio::time::sleep(Duration::from_millis(300)).await;
  assert!(state.is_running(), "paused run should not have finished");
  assert!(state.result("C").unwrap().output.is_none());

  state.resume();
  let result = run_handle.await.unwrap();
  result.expect("run should complete after resume");
  assert_eq!(state.result("C").unwrap().status, NodeStatus::Success);
}

#[tokio::test]
async fn test_timing_invariant_holds_across_run() {
  let workflow = Workflow::new(
    vec![
      node("T", NodeKind::ManualTrigger, json!({})),
      node("D", NodeKind::Delay, json!({"delay": 30})),
      node("O", NodeKind::Output, json!({})),
    ],
    vec![Edge::new("e1", "T", "D"), Edge::new("e2", "D", "O")],
  );

  let (result, state) = run(workflow).await;
  result.expect("run should succeed");

  let run_start = state.run_start().unwrap();
  let run_end = state.run_end().unwrap();
  for id in ["T", "D", "O"] {
    let node = state.result(id).unwrap();
    let start = node.start_time.unwrap();
    let end = node.end_time.unwrap();
    assert!(run_start <= start, "{}", id);
    assert!(start <= end, "{}", id);
    assert!(end <= run_end, "{}", id);
  }
}
