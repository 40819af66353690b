//! `workflow-engine` CLI entry-point.
//!
//! Available sub-commands:
//! - `validate` — validate a workflow JSON file's graph (node/port/link
//!   references, cycles) without running it.
//! - `run`      — load a workflow JSON file, fire its manual trigger, and
//!   print the resulting node states and outputs.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use engine::{DependencyAnalyzer, Workflow, WorkflowExecutor};
use nodes::NodeTypeRegistry;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Parser)]
#[command(name = "workflow-engine", about = "DAG-based workflow execution engine", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a workflow definition's graph: node/port references and
    /// acyclicity. Exits non-zero and prints every discovered cycle on
    /// failure.
    Validate {
        /// Path to the workflow export JSON file.
        path: PathBuf,
        /// Accept node types that aren't registered in this build.
        #[arg(long)]
        allow_missing: bool,
    },
    /// Load a workflow, fire its manual trigger, and print the outcome.
    Run {
        /// Path to the workflow export JSON file.
        path: PathBuf,
        /// Name of the trigger node to fire.
        #[arg(long, default_value = "manual-trigger")]
        trigger: String,
        /// Accept node types that aren't registered in this build.
        #[arg(long)]
        allow_missing: bool,
    },
}

fn registry() -> NodeTypeRegistry {
    let mut registry = NodeTypeRegistry::new();
    nodes::builtin::register_builtins(&mut registry);
    registry
}

fn load_workflow(path: &PathBuf, registry: &NodeTypeRegistry, allow_missing: bool) -> anyhow::Result<Workflow> {
    let content = std::fs::read_to_string(path)?;
    let workflow = Workflow::import_json(&content, registry, allow_missing)?;
    Ok(workflow)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let registry = registry();

    match cli.command {
        Command::Validate { path, allow_missing } => {
            let workflow = load_workflow(&path, &registry, allow_missing)?;
            match DependencyAnalyzer::analyze(&workflow) {
                Ok(analysis) => {
                    println!("workflow '{}' is valid", workflow.name);
                    for (i, level) in analysis.levels.iter().enumerate() {
                        println!("  level {i}: {level:?}");
                    }
                }
                Err(err) => {
                    eprintln!("validation failed: {err}");
                    std::process::exit(1);
                }
            }
        }
        Command::Run { path, trigger, allow_missing } => {
            let mut workflow = load_workflow(&path, &registry, allow_missing)?;
            info!(workflow = %workflow.name, %trigger, "firing trigger");

            let registry = Arc::new(registry);
            let executor = WorkflowExecutor::new(registry.clone());
            let report = engine::fire_trigger(
                &executor,
                &registry,
                &mut workflow,
                &trigger,
                nodes::NodeInput::new(),
                CancellationToken::new(),
            )
            .await?;

            println!("workflow '{}' finished as {:?}", workflow.name, report.run_state);
            for name in &report.executed_nodes {
                let node = workflow.get_node(name).expect("executed node must exist");
                println!("  {name}: {:?}", node.state());
                if let Some(output) = node.result_data() {
                    println!("    output: {}", serde_json::to_string(output)?);
                }
                if let Some(error) = node.error_data() {
                    println!("    error: {}", error.message);
                }
            }
        }
    }

    Ok(())
}
