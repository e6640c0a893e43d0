//! Workflow execution engine.
//!
//! The engine walks the graph level by level: every node whose dependencies
//! are satisfied runs concurrently, completions schedule their downstream
//! nodes (filtered by conditional routing), merge nodes wait per their
//! strategy, and a single cancellation token tears the whole run down.
//!
//! Tool nodes (nodes whose only outgoing edges are agent resource slots)
//! are excluded from dataflow scheduling; they execute solely through
//! [`ExecutionEngine::execute_node`] re-entry.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use iosans_workflow::{Edge, Graph, NodeKind, Workflow, is_resource_handle};

use crate::context::{ExecutionContext, NodeInvoker};
use crate::error::EngineError;
use crate::events::{ExecutionEvent, ExecutionNotifier, NoopNotifier};
use crate::executor::{ExecutionOutcome, ExecutorRegistry};
use crate::executors::MergeStrategy;
use crate::services::Services;
use crate::state::{ExecutionState, LogLevel, NodeResult, NodeStatus};

/// Interval for the cooperative pause check at node boundaries.
const PAUSE_POLL: Duration = Duration::from_millis(50);

/// Result of a complete run: the id plus a snapshot of every node result.
#[derive(Debug)]
pub struct RunResult {
  pub run_id: String,
  pub node_results: HashMap<String, NodeResult>,
}

/// The workflow execution engine.
pub struct ExecutionEngine {
  registry: Arc<ExecutorRegistry>,
  services: Arc<Services>,
  notifier: Arc<dyn ExecutionNotifier>,
}

impl ExecutionEngine {
  /// Create an engine that discards events.
  pub fn new(registry: ExecutorRegistry, services: Services) -> Self {
    Self::with_notifier(registry, services, NoopNotifier)
  }

  /// Create an engine with a custom notifier.
  pub fn with_notifier(
    registry: ExecutorRegistry,
    services: Services,
    notifier: impl ExecutionNotifier + 'static,
  ) -> Self {
    Self {
      registry: Arc::new(registry),
      services: Arc::new(services),
      notifier: Arc::new(notifier),
    }
  }

  /// Execute a workflow to completion.
  ///
  /// `state` is the shared run record observers read from; `cancel` aborts
  /// the run from outside. Fails fast on the first node error.
  #[instrument(name = "engine_run", skip_all, fields(nodes = workflow.nodes.len()))]
  pub async fn run(
    &self,
    workflow: Workflow,
    state: Arc<ExecutionState>,
    cancel: CancellationToken,
  ) -> Result<RunResult, EngineError> {
    let workflow = Arc::new(workflow);
    let run_id = uuid::Uuid::new_v4().to_string();

    if workflow.nodes.is_empty() {
      return Err(EngineError::NoEntry);
    }

    let graph = workflow.graph();
    let entry: Vec<String> = graph
      .start_nodes()
      .iter()
      .filter(|id| !is_tool_only(&graph, id.as_str()))
      .cloned()
      .collect();
    if entry.is_empty() {
      // No entry nodes on a non-empty graph means every node sits on a
      // cycle (or behind one).
      return Err(if graph.has_cycle() {
        EngineError::CycleDetected
      } else {
        EngineError::NoEntry
      });
    }

    state.start_run(workflow.node_ids());
    state.add_log(None, LogLevel::Info, "run started", None);
    self.notifier.notify(ExecutionEvent::RunStarted {
      run_id: run_id.clone(),
    });
    info!(run_id = %run_id, "run started");

    let invoker: Arc<dyn NodeInvoker> = Arc::new(EngineInvoker {
      registry: self.registry.clone(),
      services: self.services.clone(),
      workflow: workflow.clone(),
      run_id: run_id.clone(),
      state: state.clone(),
      notifier: self.notifier.clone(),
      cancel: cancel.clone(),
    });

    let outcome = self
      .run_levels(&workflow, &graph, &run_id, &state, &cancel, &invoker, entry)
      .await;

    // Anything still marked running was in flight when the run tore down.
    if cancel.is_cancelled() {
      for (node_id, result) in state.results() {
        if result.status == NodeStatus::Running {
          state.set_error(&node_id, EngineError::Cancelled.to_string());
        }
      }
    }

    state.end_run();

    match outcome {
      Ok(()) => {
        state.add_log(None, LogLevel::Success, "run completed", None);
        self.notifier.notify(ExecutionEvent::RunCompleted {
          run_id: run_id.clone(),
        });
        info!(run_id = %run_id, "run completed");
        Ok(RunResult {
          run_id,
          node_results: state.results(),
        })
      }
      Err(e) => {
        state.add_log(None, LogLevel::Error, e.to_string(), None);
        self.notifier.notify(ExecutionEvent::RunFailed {
          run_id: run_id.clone(),
          error: e.to_string(),
        });
        error!(run_id = %run_id, error = %e, "run failed");
        Err(e)
      }
    }
  }

  /// The level loop. Returns the first node error, or `Ok` when no more
  /// nodes are eligible.
  #[allow(clippy::too_many_arguments)]
  async fn run_levels(
    &self,
    workflow: &Arc<Workflow>,
    graph: &Graph,
    run_id: &str,
    state: &Arc<ExecutionState>,
    cancel: &CancellationToken,
    invoker: &Arc<dyn NodeInvoker>,
    entry: Vec<String>,
  ) -> Result<(), EngineError> {
    let mut fired: HashSet<String> = HashSet::new();
    let mut level = entry;

    while !level.is_empty() {
      if cancel.is_cancelled() {
        return Err(EngineError::Cancelled);
      }

      let mut handles = Vec::with_capacity(level.len());
      for node_id in &level {
        fired.insert(node_id.clone());

        let node = match workflow.get_node(node_id) {
          Some(node) => node.clone(),
          None => {
            return Err(EngineError::InvalidInput {
              node_id: node_id.clone(),
              message: "node disappeared from workflow snapshot".to_string(),
            });
          }
        };

        let (inputs, input_sources) = gather_inputs(graph, state, node_id);
        let ctx = ExecutionContext {
          node_id: node_id.clone(),
          node_data: node.data.clone(),
          inputs,
          input_sources,
          workflow: workflow.clone(),
          services: self.services.clone(),
          cancel: cancel.clone(),
          invoker: Some(invoker.clone()),
          run_id: run_id.to_string(),
          state: state.clone(),
          notifier: self.notifier.clone(),
        };

        state.set_running(node_id);
        state.add_log(Some(node_id), LogLevel::Info, "node started", None);
        self.notifier.notify(ExecutionEvent::NodeStarted {
          run_id: run_id.to_string(),
          node_id: node_id.clone(),
        });

        let registry = self.registry.clone();
        let kind = node.kind;
        let id = node_id.clone();
        handles.push(tokio::spawn(async move {
          let result = run_node(&registry, kind, ctx).await;
          (id, result)
        }));
      }

      let joined = futures::future::join_all(handles).await;

      let mut next: Vec<String> = Vec::new();
      let mut first_error: Option<EngineError> = None;

      for joined_result in joined {
        let (node_id, result) = joined_result.map_err(|e| EngineError::External {
          node_id: "engine".to_string(),
          message: format!("task join error: {}", e),
        })?;

        match result {
          Ok(outcome) => {
            self.complete_node(workflow, graph, run_id, state, &node_id, &outcome);
            if first_error.is_none() {
              schedule_downstream(workflow, graph, state, &fired, &node_id, &outcome, &mut next);
            }
          }
          Err(e) => {
            let message = e.to_string();
            state.set_error(&node_id, message.clone());
            state.add_log(Some(&node_id), LogLevel::Error, message.clone(), None);
            self.notifier.notify(ExecutionEvent::NodeFailed {
              run_id: run_id.to_string(),
              node_id: node_id.clone(),
              error: message,
            });
            warn!(node_id = %node_id, error = %e, "node failed");
            if first_error.is_none() {
              first_error = Some(e);
            }
          }
        }
      }

      if let Some(e) = first_error {
        return Err(e);
      }

      level = next;
    }

    Ok(())
  }

  /// Record a success: status, edge snapshots, log, event.
  fn complete_node(
    &self,
    workflow: &Arc<Workflow>,
    graph: &Graph,
    run_id: &str,
    state: &Arc<ExecutionState>,
    node_id: &str,
    outcome: &ExecutionOutcome,
  ) {
    state.set_success(node_id, outcome.output.clone());
    for edge in graph.outgoing_edges(node_id) {
      state.set_edge_snapshot(&edge.id, outcome.output.clone());
    }
    state.add_log(Some(node_id), LogLevel::Success, "node completed", None);
    self.notifier.notify(ExecutionEvent::NodeCompleted {
      run_id: run_id.to_string(),
      node_id: node_id.to_string(),
      output: outcome.output.clone(),
    });

    if let Some(node) = workflow.get_node(node_id) {
      info!(node_id = %node_id, kind = %node.kind, "node completed");
    }
  }

  /// Execute a single node imperatively against the current run.
  ///
  /// Used by agent tool dispatch and the single-node CLI path. Does not touch
  /// the run's status map; the invocation appears only in the run log.
  pub async fn execute_node(
    &self,
    workflow: &Arc<Workflow>,
    state: &Arc<ExecutionState>,
    cancel: &CancellationToken,
    node_id: &str,
    inputs: Value,
  ) -> Result<Value, EngineError> {
    let invoker = EngineInvoker {
      registry: self.registry.clone(),
      services: self.services.clone(),
      workflow: workflow.clone(),
      run_id: String::new(),
      state: state.clone(),
      notifier: self.notifier.clone(),
      cancel: cancel.clone(),
    };
    invoker.execute_node(node_id, inputs).await
  }
}

/// Pause gate, validation, and execution for one node.
async fn run_node(
  registry: &ExecutorRegistry,
  kind: NodeKind,
  ctx: ExecutionContext,
) -> Result<ExecutionOutcome, EngineError> {
  let executor = registry.get(kind).ok_or_else(|| EngineError::UnknownType {
    node_id: ctx.node_id.clone(),
    kind: kind.to_string(),
  })?;

  // Cooperative pause: hold the node at its boundary until resumed.
  loop {
    if ctx.cancel.is_cancelled() {
      return Err(EngineError::Cancelled);
    }
    if !ctx.state.is_paused() {
      break;
    }
    tokio::select! {
      _ = tokio::time::sleep(PAUSE_POLL) => {}
      _ = ctx.cancel.cancelled() => return Err(EngineError::Cancelled),
    }
  }

  if let Err(message) = executor.validate(&ctx) {
    return Err(EngineError::ValidationFailed {
      node_id: ctx.node_id.clone(),
      message,
    });
  }

  tokio::select! {
    result = executor.execute(&ctx) => result,
    _ = ctx.cancel.cancelled() => Err(EngineError::Cancelled),
  }
}

/// Whether an edge feeds an agent resource slot instead of dataflow.
fn is_resource_edge(edge: &Edge) -> bool {
  edge
    .target_handle
    .as_deref()
    .is_some_and(is_resource_handle)
}

/// Whether a node exists only to serve as an agent tool.
fn is_tool_only(graph: &Graph, node_id: &str) -> bool {
  let outgoing = graph.outgoing_edges(node_id);
  !outgoing.is_empty() && outgoing.iter().all(is_resource_edge)
}

/// Gather upstream data for a node per the input-gathering rule: one
/// completed upstream unwraps to its bare output, otherwise the
/// `{source_id: output}` mapping is passed as-is.
fn gather_inputs(
  graph: &Graph,
  state: &ExecutionState,
  node_id: &str,
) -> (Value, Vec<(String, Value)>) {
  let mut pairs: Vec<(String, Value)> = Vec::new();
  let mut seen: HashSet<&str> = HashSet::new();

  for edge in graph.incoming_edges(node_id) {
    if is_resource_edge(edge) || !seen.insert(edge.source.as_str()) {
      continue;
    }
    if let Some(result) = state.result(&edge.source) {
      if result.status == NodeStatus::Success {
        pairs.push((edge.source.clone(), result.output.unwrap_or(Value::Null)));
      }
    }
  }

  let inputs = if pairs.len() == 1 {
    pairs[0].1.clone()
  } else {
    let map: Map<String, Value> = pairs
      .iter()
      .map(|(id, value)| (id.clone(), value.clone()))
      .collect();
    Value::Object(map)
  };

  (inputs, pairs)
}

/// Queue the downstream nodes of a completed node, honoring conditional
/// routing, resource-edge suppression, merge readiness, and once-per-run
/// firing.
fn schedule_downstream(
  workflow: &Workflow,
  graph: &Graph,
  state: &ExecutionState,
  fired: &HashSet<String>,
  node_id: &str,
  outcome: &ExecutionOutcome,
  next: &mut Vec<String>,
) {
  let terminal = workflow
    .get_node(node_id)
    .is_some_and(|n| n.kind.is_terminal());
  if terminal {
    return;
  }

  let active = outcome.active_handles();

  for edge in graph.outgoing_edges(node_id) {
    if is_resource_edge(edge) {
      continue;
    }
    if let Some(active) = &active {
      match &edge.source_handle {
        Some(handle) if active.contains(handle) => {}
        _ => continue,
      }
    }

    let target = &edge.target;
    if fired.contains(target) || next.contains(target) {
      continue;
    }
    if is_ready(workflow, graph, state, target) {
      next.push(target.clone());
    }
  }
}

/// Readiness check for a scheduling candidate. Non-merge nodes are ready as
/// soon as one upstream succeeded; merge nodes wait per their strategy:
/// wait-all strategies need every distinct upstream source successful,
/// `first` fires on the first arrival. Upstream errors never satisfy
/// readiness.
fn is_ready(workflow: &Workflow, graph: &Graph, state: &ExecutionState, node_id: &str) -> bool {
  let node = match workflow.get_node(node_id) {
    Some(node) => node,
    None => return false,
  };
  if node.kind != NodeKind::Merge {
    return true;
  }

  let strategy = MergeStrategy::from_config(node.config_str("mergeStrategy"));
  let mut sources: Vec<&str> = Vec::new();
  for edge in graph.incoming_edges(node_id) {
    if !is_resource_edge(edge) && !sources.contains(&edge.source.as_str()) {
      sources.push(&edge.source);
    }
  }

  let succeeded = |source: &str| {
    state
      .result(source)
      .is_some_and(|r| r.status == NodeStatus::Success)
  };

  if strategy.waits_for_all() {
    sources.iter().all(|s| succeeded(s))
  } else {
    sources.iter().any(|s| succeeded(s))
  }
}

#[derive(Clone)]
struct EngineInvoker {
  registry: Arc<ExecutorRegistry>,
  services: Arc<Services>,
  workflow: Arc<Workflow>,
  run_id: String,
  state: Arc<ExecutionState>,
  notifier: Arc<dyn ExecutionNotifier>,
  cancel: CancellationToken,
}

#[async_trait]
impl NodeInvoker for EngineInvoker {
  async fn execute_node(&self, node_id: &str, inputs: Value) -> Result<Value, EngineError> {
    let node = self
      .workflow
      .get_node(node_id)
      .ok_or_else(|| EngineError::InvalidInput {
        node_id: node_id.to_string(),
        message: "node not found in workflow snapshot".to_string(),
      })?
      .clone();

    let executor = self
      .registry
      .get(node.kind)
      .ok_or_else(|| EngineError::UnknownType {
        node_id: node_id.to_string(),
        kind: node.kind.to_string(),
      })?;

    self.state.add_log(
      Some(node_id),
      LogLevel::Action,
      format!("invoking node '{}' imperatively", node_id),
      Some(inputs.clone()),
    );

    let ctx = ExecutionContext {
      node_id: node_id.to_string(),
      node_data: node.data.clone(),
      inputs,
      input_sources: Vec::new(),
      workflow: self.workflow.clone(),
      services: self.services.clone(),
      cancel: self.cancel.clone(),
      invoker: Some(Arc::new(self.clone())),
      run_id: self.run_id.clone(),
      state: self.state.clone(),
      notifier: self.notifier.clone(),
    };

    if let Err(message) = executor.validate(&ctx) {
      return Err(EngineError::ValidationFailed {
        node_id: node_id.to_string(),
        message,
      });
    }

    let outcome = tokio::select! {
      result = executor.execute(&ctx) => result?,
      _ = self.cancel.cancelled() => return Err(EngineError::Cancelled),
    };

    Ok(outcome.output)
  }
}
