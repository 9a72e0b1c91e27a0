// crates/flowcli/src/main.rs

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use flowcore::{FlowDefinition, RunEvent, StepEvent, StepOutcome, StepSpec};
use flowruntime::{Flow, FlowRuntime, RunResults, RuntimeConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "flow")]
#[command(about = "Dependency-graph step runner", long_about = None)]
struct Cli {
    /// Show debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a flow file
    Run {
        /// Path to flow JSON file
        #[arg(short, long)]
        file: PathBuf,

        /// Print the result table as JSON instead of progress lines
        #[arg(long)]
        json: bool,
    },

    /// Validate a flow file and report steps that can never run
    Validate {
        /// Path to flow JSON file
        file: PathBuf,
    },

    /// Print the steps of a flow file as a table
    Show {
        /// Path to flow JSON file
        file: PathBuf,
    },

    /// Print the dependency graph of a flow file in DOT format
    Graph {
        /// Path to flow JSON file
        file: PathBuf,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List available action types
    Actions,

    /// Create a new example flow
    Init {
        /// Output file path
        #[arg(short, long, default_value = "flow.json")]
        output: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn runtime() -> FlowRuntime {
    FlowRuntime::with_registry(
        Arc::new(flowsteps::standard_registry()),
        RuntimeConfig::default(),
    )
}

fn load(runtime: &FlowRuntime, file: &Path) -> Result<Flow> {
    let flow = runtime
        .load_file(file)
        .with_context(|| format!("failed to load flow from {}", file.display()))?;
    tracing::info!(file = %file.display(), flow = %flow.name(), steps = flow.len(), "Loaded flow");
    Ok(flow)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run { file, json } => run_flow(file, json).await,
        Commands::Validate { file } => validate_flow(file),
        Commands::Show { file } => {
            println!("{}", load(&runtime(), &file)?.visualize());
            Ok(())
        }
        Commands::Graph { file, output } => {
            let dot = load(&runtime(), &file)?.to_graph_description();
            match output {
                Some(path) => {
                    std::fs::write(&path, dot)?;
                    println!("Wrote graph to {}", path.display());
                }
                None => println!("{}", dot),
            }
            Ok(())
        }
        Commands::Actions => {
            list_actions();
            Ok(())
        }
        Commands::Init { output } => create_example_flow(output),
    }
}

async fn run_flow(file: PathBuf, json: bool) -> Result<()> {
    let runtime = runtime();
    let mut flow = load(&runtime, &file)?;

    if !json {
        println!("🚀 Flow: {} ({} steps)", flow.name(), flow.len());
        println!();
    }

    // Subscribe to events for real-time output
    let mut events = runtime.subscribe_events();
    let event_task = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if !json {
                print_event(event);
            }
        }
    });

    let results = flow.run().await;
    tracing::info!(run_id = %results.run_id(), executed = results.len(), "Run returned");

    // Closing the bus ends the listener once it has drained.
    drop(flow);
    drop(runtime);
    event_task.await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results_json(&results))?);
    } else {
        print_summary(&results);
    }

    let failed = results.failed().count();
    if failed > 0 {
        bail!("{} step(s) failed", failed);
    }
    Ok(())
}

fn print_event(event: RunEvent) {
    match event {
        RunEvent::RunStarted { .. } => {
            println!("▶️  Run started");
        }
        RunEvent::StepStarted { step, action_type, .. } => {
            println!("  ⚡ Starting step: {} ({})", step, action_type);
        }
        RunEvent::StepCompleted { step, duration_ms, .. } => {
            println!("  ✅ Step {} completed in {}ms", step, duration_ms);
        }
        RunEvent::StepFailed { step, error, .. } => {
            println!("  ❌ Step {} failed: {}", step, error);
        }
        RunEvent::StepEvent { step, event, .. } => match event {
            StepEvent::Info { message } => {
                println!("     ℹ️  [{}] {}", step, message);
            }
            StepEvent::Warning { message } => {
                println!("     ⚠️  [{}] {}", step, message);
            }
            StepEvent::Progress { percent, message } => match message {
                Some(msg) => println!("     📊 [{}] {}% - {}", step, percent, msg),
                None => println!("     📊 [{}] {}%", step, percent),
            },
            StepEvent::Data { .. } => {}
        },
        RunEvent::RunCompleted { duration_ms, failed, .. } => {
            if failed == 0 {
                println!("✨ Run completed in {}ms", duration_ms);
            } else {
                println!("💥 Run finished with {} failed step(s) after {}ms", failed, duration_ms);
            }
        }
    }
}

fn print_summary(results: &RunResults) {
    println!();
    println!("📊 Execution Summary:");
    println!("   Run ID: {}", results.run_id());
    println!("   Executed: {}/{} steps", results.len(), results.total_steps());
    if !results.skipped().is_empty() {
        println!("   Skipped: {}", results.skipped().join(", "));
    }

    println!();
    println!("📤 Outputs:");
    for (step, outcome) in results.iter() {
        match outcome {
            StepOutcome::Success(value) => println!("   {}: {}", step, value),
            StepOutcome::Failure(err) => println!("   {}: error: {}", step, err),
        }
    }
}

fn results_json(results: &RunResults) -> serde_json::Value {
    let outputs: serde_json::Map<String, serde_json::Value> = results
        .succeeded()
        .map(|(step, value)| (step.to_string(), value.to_json()))
        .collect();
    let failures: serde_json::Map<String, serde_json::Value> = results
        .failed()
        .map(|(step, err)| (step.to_string(), serde_json::Value::String(err.to_string())))
        .collect();

    serde_json::json!({
        "run_id": results.run_id().to_string(),
        "duration_ms": results.duration_ms(),
        "outputs": outputs,
        "failures": failures,
        "skipped": results.skipped(),
    })
}

fn validate_flow(file: PathBuf) -> Result<()> {
    println!("🔍 Validating flow: {}", file.display());

    let definition = FlowDefinition::from_file(&file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let runtime = runtime();

    let mut problems = 0;
    for spec in &definition.steps {
        if !runtime.registry().contains(&spec.action) {
            println!("   ⚠️  step '{}' uses unknown action type '{}'", spec.name, spec.action);
            problems += 1;
        }
    }

    let flow = runtime.load(&definition)?;
    let analysis = flow.analyze();
    for issue in &analysis.issues {
        println!("   ⚠️  {}", issue);
        problems += 1;
    }
    if !analysis.unreachable.is_empty() {
        println!("   ⚠️  never executed: {}", analysis.unreachable.join(", "));
    }

    if problems > 0 {
        bail!("{} problem(s) found in {}", problems, file.display());
    }

    println!("✅ Flow is valid:");
    println!("   Name: {}", flow.name());
    println!("   Steps: {}", flow.len());
    Ok(())
}

fn list_actions() {
    println!("📦 Available Action Types:");
    println!();

    let registry = flowsteps::standard_registry();

    for action_type in registry.list_action_types() {
        if let Some(metadata) = registry.get_metadata(&action_type) {
            println!("  • {} ({})", action_type, metadata.category);
            println!("    {}", metadata.description);
            for key in &metadata.config {
                let marker = if key.required { "required" } else { "optional" };
                println!("      - {} [{}]: {}", key.name, marker, key.description);
            }
        } else {
            println!("  • {}", action_type);
        }
    }
}

fn create_example_flow(output: PathBuf) -> Result<()> {
    let mut definition = FlowDefinition::new("example")
        .with_description("Parses a JSON document and logs the result");

    definition
        .add_step(
            StepSpec::new("raw", "value.const")
                .with_config("value", r#"{"greeting": "hello", "count": 3}"#),
        )
        .add_step(StepSpec::new("parsed", "transform.json_parse").depends_on(["raw"]))
        .add_step(StepSpec::new("wait", "time.delay").with_config("delay_ms", 100i64))
        .add_step(StepSpec::new("report", "debug.log").depends_on(["parsed", "wait"]));

    std::fs::write(&output, definition.to_json_pretty()?)?;

    println!("✨ Created example flow: {}", output.display());
    println!();
    println!("Run it with:");
    println!("  flow run --file {}", output.display());

    Ok(())
}
