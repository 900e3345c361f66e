use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dagcore::{ExecutionEvent, NodeEvent, NodeInstance, ParameterSpec, WorkflowGraph};
use dagruntime::{RuntimeConfig, WorkflowResponse, WorkflowRuntime};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dag")]
#[command(about = "Node graph engine CLI", long_about = None)]
struct Cli {
    /// Show debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a workflow file
    Run {
        /// Path to workflow JSON file
        #[arg(short, long)]
        file: PathBuf,

        /// Runtime settings (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Validate a workflow file
    Validate {
        /// Path to workflow JSON file
        file: PathBuf,
    },

    /// Show the batch order without executing
    Plan {
        /// Path to workflow JSON file
        file: PathBuf,
    },

    /// List available node types
    Nodes,

    /// Describe one node type
    Node {
        /// Node type id, e.g. math.add
        type_id: String,
    },

    /// Create a new example workflow
    Init {
        /// Output file path
        #[arg(short, long, default_value = "workflow.json")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run { file, config } => {
            let response = run_workflow(&file, config.as_deref()).await?;
            if response.status == dagruntime::ResponseStatus::Error {
                std::process::exit(1);
            }
        }

        Commands::Validate { file } => {
            if !validate_workflow(&file)? {
                std::process::exit(1);
            }
        }

        Commands::Plan { file } => {
            if !plan_workflow(&file)? {
                std::process::exit(1);
            }
        }

        Commands::Nodes => {
            list_nodes();
        }

        Commands::Node { type_id } => {
            describe_node(&type_id)?;
        }

        Commands::Init { output } => {
            create_example_workflow(&output)?;
        }
    }

    Ok(())
}

fn load_workflow(file: &Path) -> Result<WorkflowGraph> {
    let workflow_json = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let workflow = serde_json::from_str(&workflow_json)
        .with_context(|| format!("Invalid workflow JSON in {}", file.display()))?;
    Ok(workflow)
}

fn create_runtime(config: RuntimeConfig) -> WorkflowRuntime {
    WorkflowRuntime::with_registry(Arc::new(dagnodes::standard_registry()), config)
}

async fn run_workflow(file: &Path, config: Option<&Path>) -> Result<WorkflowResponse> {
    eprintln!("🚀 Loading workflow from: {}", file.display());

    let workflow = load_workflow(file)?;
    let config = match config {
        Some(path) => RuntimeConfig::load(path)?,
        None => RuntimeConfig::default(),
    };

    eprintln!("   Nodes: {}", workflow.nodes.len());
    eprintln!("   Edges: {}", workflow.edges.len());
    eprintln!();

    let runtime = create_runtime(config);

    // Subscribe to events for real-time output
    let mut events = runtime.subscribe_events();

    let event_task = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                ExecutionEvent::WorkflowStarted { batch_count, .. } => {
                    eprintln!("▶️  Workflow started ({} batches)", batch_count);
                }
                ExecutionEvent::BatchStarted {
                    index,
                    instance_ids,
                    ..
                } => {
                    eprintln!("  📦 Batch {}: {}", index, instance_ids.join(", "));
                }
                ExecutionEvent::NodeStarted {
                    instance_id,
                    type_id,
                    ..
                } => {
                    eprintln!("  ⚡ Starting node: {} ({})", instance_id, type_id);
                }
                ExecutionEvent::NodeCompleted {
                    instance_id,
                    duration_ms,
                    ..
                } => {
                    eprintln!("  ✅ Node {} completed in {}ms", instance_id, duration_ms);
                }
                ExecutionEvent::NodeFailed {
                    instance_id, error, ..
                } => {
                    eprintln!("  ❌ Node {} failed: {}", instance_id, error);
                }
                ExecutionEvent::NodeSkipped {
                    instance_id,
                    caused_by,
                    ..
                } => {
                    eprintln!("  ⏭️  Node {} skipped (upstream {})", instance_id, caused_by);
                }
                ExecutionEvent::NodeEvent {
                    instance_id, event, ..
                } => match event {
                    NodeEvent::Info { message } => {
                        eprintln!("     ℹ️  [{}] {}", instance_id, message);
                    }
                    NodeEvent::Warning { message } => {
                        eprintln!("     ⚠️  [{}] {}", instance_id, message);
                    }
                    NodeEvent::Progress { percent, message } => {
                        if let Some(msg) = message {
                            eprintln!("     📊 [{}] {}% - {}", instance_id, percent, msg);
                        } else {
                            eprintln!("     📊 [{}] {}%", instance_id, percent);
                        }
                    }
                },
                ExecutionEvent::WorkflowCompleted {
                    success,
                    duration_ms,
                    ..
                } => {
                    if success {
                        eprintln!("✨ Workflow completed successfully in {}ms", duration_ms);
                    } else {
                        eprintln!("💥 Workflow finished with failures after {}ms", duration_ms);
                    }
                    break;
                }
            }
        }
    });

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping after the current batch");
            ctrl_c.cancel();
        }
    });

    let response = match runtime.execute_with_cancel(&workflow, cancel).await {
        Ok(run) => {
            // Wait for events to finish printing
            let _ = tokio::time::timeout(std::time::Duration::from_millis(500), event_task).await;
            WorkflowResponse::from_outputs(run.outputs)
        }
        Err(e) => {
            event_task.abort();
            WorkflowResponse::from_error(&e)
        }
    };

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(response)
}

fn validate_workflow(file: &Path) -> Result<bool> {
    println!("🔍 Validating workflow: {}", file.display());

    let workflow = load_workflow(file)?;
    let runtime = create_runtime(RuntimeConfig::default());

    match runtime.plan(&workflow) {
        Ok(schedule) => {
            println!("✅ Workflow is valid:");
            println!("   Nodes: {}", workflow.nodes.len());
            println!("   Edges: {}", workflow.edges.len());
            println!("   Batches: {}", schedule.len());
            Ok(true)
        }
        Err(e) => {
            println!("❌ {}", e);
            for violation in WorkflowResponse::from_error(&e).errors {
                println!("   • {}", violation);
            }
            Ok(false)
        }
    }
}

fn plan_workflow(file: &Path) -> Result<bool> {
    let workflow = load_workflow(file)?;
    let runtime = create_runtime(RuntimeConfig::default());

    match runtime.plan(&workflow) {
        Ok(schedule) => {
            for (index, batch) in schedule.batches().iter().enumerate() {
                println!("Batch {}: {}", index, batch.join(", "));
            }
            Ok(true)
        }
        Err(e) => {
            println!("❌ {}", e);
            Ok(false)
        }
    }
}

fn list_nodes() {
    println!("📦 Available Node Types:");
    println!();

    let registry = dagnodes::standard_registry();

    for node_type in registry.list_node_types() {
        if let Some(descriptor) = registry.get_descriptor(&node_type) {
            println!("  • {} ({})", node_type, descriptor.category);
            println!("    {}", descriptor.description);
        } else {
            println!("  • {}", node_type);
        }
    }
}

fn describe_node(type_id: &str) -> Result<()> {
    let registry = dagnodes::standard_registry();
    let descriptor = registry
        .get_descriptor(type_id)
        .with_context(|| format!("Unknown node type: {}", type_id))?;

    println!("{} ({})", descriptor.name, descriptor.type_id);
    println!("  {}", descriptor.description);
    if !descriptor.tags.is_empty() {
        println!("  Tags: {}", descriptor.tags.join(", "));
    }

    let params = descriptor.categorized_parameters();
    println!();
    println!("Parameters:");
    for param in &params.basic {
        print_parameter(param);
    }
    if params.has_advanced() {
        println!();
        println!("Advanced:");
        for param in &params.advanced {
            print_parameter(param);
        }
    }

    println!();
    println!("Outputs:");
    for output in &descriptor.outputs {
        println!("  {}: {}", output.name, output.kind);
    }

    Ok(())
}

fn print_parameter(param: &ParameterSpec) {
    let default = param
        .default
        .as_ref()
        .map(|d| format!(" = {}", d.to_json()))
        .unwrap_or_default();
    println!("  {}: {}{}", param.name, param.kind, default);
    if !param.description.is_empty() {
        println!("      {}", param.description);
    }
}

fn create_example_workflow(output: &Path) -> Result<()> {
    let mut workflow = WorkflowGraph::new();

    let add = workflow.add_node(
        NodeInstance::new("A", "math.add")
            .with_param("x", 2.0)
            .with_param("y", 3.0),
    );
    let multiply = workflow.add_node(NodeInstance::new("B", "math.multiply").with_param("y", 4.0));

    workflow.connect(add, "out", multiply.clone(), "x");
    workflow.designate_output(multiply);

    let json = serde_json::to_string_pretty(&workflow)?;
    std::fs::write(output, json)?;

    println!("✨ Created example workflow: {}", output.display());
    println!();
    println!("Run it with:");
    println!("  dag run --file {}", output.display());

    Ok(())
}
