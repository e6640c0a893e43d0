use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use iosans_agent::AgentExecutor;
use iosans_artifact::MemoryStore;
use iosans_engine::{
  EngineError, ExecutionEngine, ExecutionState, ExecutorRegistry, Services,
};
use iosans_scheduler::{Scheduler, TriggerSink};
use iosans_workflow::{
  NodeKind, PERSIST_KEY, Workflow, WorkflowStore, export_workflow, import_workflow,
  validate_workflow,
};

const EXIT_OK: u8 = 0;
const EXIT_VALIDATION: u8 = 1;
const EXIT_RUNTIME: u8 = 2;
const EXIT_CANCELLED: u8 = 130;

/// Iosans - a workflow engine with agent tool-calling
#[derive(Parser)]
#[command(name = "iosans")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.iosans)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Execute a workflow once
  Run {
    /// Path to the workflow file (JSON)
    workflow_file: PathBuf,
  },

  /// Validate a workflow file and report every violation
  Validate {
    /// Path to the workflow file (JSON)
    workflow_file: PathBuf,
  },

  /// Print the persisted workflow document to stdout
  Export,

  /// Validate a workflow file and persist it as the current document
  Import {
    /// Path to the workflow file (JSON)
    workflow_file: PathBuf,
  },

  /// Watch a workflow's schedule triggers and run on cron matches
  Schedule {
    /// Path to the workflow file (JSON)
    workflow_file: PathBuf,
  },
}

fn main() -> ExitCode {
  tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  let data_dir = cli.data_dir.unwrap_or_else(|| {
    dirs::home_dir()
      .expect("could not determine home directory")
      .join(".iosans")
  });

  let code = match dispatch(cli.command, data_dir) {
    Ok(code) => code,
    Err(e) => {
      eprintln!("error: {:#}", e);
      EXIT_RUNTIME
    }
  };

  ExitCode::from(code)
}

fn dispatch(command: Option<Commands>, data_dir: PathBuf) -> Result<u8> {
  match command {
    Some(Commands::Run { workflow_file }) => block_on(run_workflow(workflow_file)),
    Some(Commands::Validate { workflow_file }) => validate_file(workflow_file),
    Some(Commands::Export) => export_persisted(data_dir),
    Some(Commands::Import { workflow_file }) => import_file(workflow_file, data_dir),
    Some(Commands::Schedule { workflow_file }) => block_on(schedule_workflow(workflow_file)),
    None => {
      println!("iosans - use --help to see available commands");
      Ok(EXIT_OK)
    }
  }
}

fn block_on<F: std::future::Future<Output = Result<u8>>>(future: F) -> Result<u8> {
  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(future)
}

fn load_workflow_file(path: &PathBuf) -> Result<Workflow> {
  let content = std::fs::read_to_string(path)
    .with_context(|| format!("failed to read workflow file: {}", path.display()))?;
  import_workflow(&content)
    .with_context(|| format!("failed to load workflow file: {}", path.display()))
}

/// Engine wired with every built-in executor plus the agent, backed by an
/// in-memory artifact store. Model-backed services are left unconfigured;
/// their nodes fail with ServiceUnavailable until an embedder provides them.
fn build_engine() -> ExecutionEngine {
  let mut registry = ExecutorRegistry::with_builtins();
  registry.register(NodeKind::AiAgent, Arc::new(AgentExecutor));
  let services = Services::new(Arc::new(MemoryStore::new()));
  ExecutionEngine::new(registry, services)
}

async fn run_workflow(workflow_file: PathBuf) -> Result<u8> {
  let workflow = load_workflow_file(&workflow_file)?;

  let engine = build_engine();
  let state = Arc::new(ExecutionState::new());
  let cancel = CancellationToken::new();

  {
    let cancel = cancel.clone();
    tokio::spawn(async move {
      if tokio::signal::ctrl_c().await.is_ok() {
        eprintln!("aborting run...");
        cancel.cancel();
      }
    });
  }

  match engine.run(workflow, state.clone(), cancel).await {
    Ok(result) => {
      let summary = serde_json::json!({
        "runId": result.run_id,
        "nodes": result.node_results,
      });
      println!("{}", serde_json::to_string_pretty(&summary)?);
      Ok(EXIT_OK)
    }
    Err(EngineError::Cancelled) => {
      eprintln!("run cancelled");
      Ok(EXIT_CANCELLED)
    }
    Err(e) => {
      eprintln!("[{}] Failed: {}", e.kind(), e);
      Ok(EXIT_RUNTIME)
    }
  }
}

fn validate_file(workflow_file: PathBuf) -> Result<u8> {
  let content = std::fs::read_to_string(&workflow_file)
    .with_context(|| format!("failed to read workflow file: {}", workflow_file.display()))?;

  let workflow: Workflow = match serde_json::from_str(&content) {
    Ok(workflow) => workflow,
    Err(e) => {
      eprintln!("invalid document: {}", e);
      return Ok(EXIT_VALIDATION);
    }
  };

  let mut violations: Vec<String> = validate_workflow(&workflow)
    .into_iter()
    .map(|v| v.to_string())
    .collect();

  // Schedule triggers also need parseable cron expressions.
  for node in &workflow.nodes {
    if node.kind == NodeKind::ScheduleTrigger {
      if let Some(expr) = node.config_str("cronExpression") {
        if let Err(e) = iosans_cron::validate(expr) {
          violations.push(format!("node '{}': {}", node.id, e));
        }
      }
    }
  }

  if violations.is_empty() {
    println!(
      "ok: {} nodes, {} edges",
      workflow.nodes.len(),
      workflow.edges.len()
    );
    Ok(EXIT_OK)
  } else {
    for violation in &violations {
      eprintln!("violation: {}", violation);
    }
    Ok(EXIT_VALIDATION)
  }
}

fn persisted_path(data_dir: &std::path::Path) -> PathBuf {
  data_dir.join(format!("{}.json", PERSIST_KEY))
}

fn export_persisted(data_dir: PathBuf) -> Result<u8> {
  let path = persisted_path(&data_dir);
  let content = std::fs::read_to_string(&path)
    .with_context(|| format!("no persisted workflow at {}", path.display()))?;
  let workflow = import_workflow(&content).context("persisted workflow is invalid")?;
  println!("{}", export_workflow(&workflow)?);
  Ok(EXIT_OK)
}

fn import_file(workflow_file: PathBuf, data_dir: PathBuf) -> Result<u8> {
  let workflow = match load_workflow_file(&workflow_file) {
    Ok(workflow) => workflow,
    Err(e) => {
      eprintln!("import rejected: {:#}", e);
      return Ok(EXIT_VALIDATION);
    }
  };

  std::fs::create_dir_all(&data_dir)
    .with_context(|| format!("failed to create data dir: {}", data_dir.display()))?;
  let path = persisted_path(&data_dir);
  std::fs::write(&path, export_workflow(&workflow)?)
    .with_context(|| format!("failed to write {}", path.display()))?;
  eprintln!("imported workflow -> {}", path.display());
  Ok(EXIT_OK)
}

/// Runs engine executions for schedule-trigger fires.
struct EngineSink {
  engine: Arc<ExecutionEngine>,
  store: Arc<WorkflowStore>,
  cancel: CancellationToken,
}

#[async_trait::async_trait]
impl TriggerSink for EngineSink {
  async fn trigger(&self, node_id: String) {
    let workflow = self.store.snapshot();
    let state = Arc::new(ExecutionState::new());
    eprintln!("schedule trigger '{}' fired, starting run", node_id);
    match self
      .engine
      .run(workflow, state, self.cancel.child_token())
      .await
    {
      Ok(result) => eprintln!("run {} completed", result.run_id),
      Err(e) => eprintln!("[{}] Failed: {}", e.kind(), e),
    }
  }
}

async fn schedule_workflow(workflow_file: PathBuf) -> Result<u8> {
  let workflow = load_workflow_file(&workflow_file)?;

  let store = Arc::new(WorkflowStore::new());
  store
    .load_workflow(workflow)
    .context("workflow rejected by store")?;

  let cancel = CancellationToken::new();
  {
    let cancel = cancel.clone();
    tokio::spawn(async move {
      if tokio::signal::ctrl_c().await.is_ok() {
        eprintln!("stopping scheduler...");
        cancel.cancel();
      }
    });
  }

  let sink = EngineSink {
    engine: Arc::new(build_engine()),
    store: store.clone(),
    cancel: cancel.clone(),
  };

  eprintln!("scheduler watching for cron matches (ctrl-c to stop)");
  Scheduler::new(store, sink).run(cancel).await;
  Ok(EXIT_CANCELLED)
}
