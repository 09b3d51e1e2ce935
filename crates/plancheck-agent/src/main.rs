//! Plancheck CLI.
//!
//! Commands:
//! - validate: Validate a schedule file offline (no LLM calls)
//! - extract: Extract metadata from a request
//! - plan: Run one request through extract, generate, validate and repair
//! - batch: Run a scenario file and summarize results per execution mode
//! - summary: Re-print the per-mode summary of a saved results file

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, Local};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use plancheck_agent::batch::run_batch;
use plancheck_agent::extractor::LlmExtractor;
use plancheck_agent::llm_client::{ChatClient, DEFAULT_MODEL};
use plancheck_agent::pipeline::PlanPipeline;
use plancheck_agent::planner::LlmPlanner;
use plancheck_agent::results::{load_scenarios, BatchResults};
use plancheck_kernel::{
    Confidence, EngineConfig, ExecutionMode, GeneratedPlan, Metadata, MetadataExtractor,
    Orchestrator, PlanRequest, ValidationResult, Validator,
};

/// Generate a timestamped output path from the given path.
/// e.g., "results.json" -> "results-20260108-010530.json"
fn timestamped_path(path: &Path) -> PathBuf {
    let timestamp = Local::now().format("%Y%m%d-%H%M%S");
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("results");
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("json");
    let parent = path.parent().unwrap_or(Path::new("."));
    parent.join(format!("{}-{}.{}", stem, timestamp, ext))
}

#[derive(Parser)]
#[command(name = "plancheck")]
#[command(version)]
#[command(about = "Validate and repair LLM-generated daily schedules")]
struct Cli {
    /// Chat completions server root
    #[arg(long, env = "PLANCHECK_LLM_HOST", default_value = "https://api.openai.com")]
    host: String,

    /// Bearer key for the chat completions server
    #[arg(long = "api-key", env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model name
    #[arg(long, env = "PLANCHECK_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Engine config (TOML); built-in defaults when omitted
    #[arg(long, env = "PLANCHECK_CONFIG")]
    config: Option<PathBuf>,

    /// Per-call generator timeout in seconds; overrides the config file
    #[arg(long = "timeout-secs")]
    timeout_secs: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a schedule against metadata without calling a model
    Validate {
        /// JSON file with a `plan` array (plus optional assumptions/questions)
        #[arg(long)]
        plan: PathBuf,

        /// JSON file with detected_constraints, ground_truth_entities, task_keywords
        #[arg(long)]
        metadata: PathBuf,

        /// Current time (RFC 3339 with offset); defaults to now
        #[arg(long)]
        now: Option<DateTime<FixedOffset>>,
    },

    /// Extract metadata from a request
    Extract {
        /// Request text
        #[arg(long)]
        context: String,
    },

    /// Plan a single request
    Plan {
        /// Request text
        #[arg(long)]
        context: String,

        /// Current time (RFC 3339 with offset); defaults to now
        #[arg(long)]
        now: Option<DateTime<FixedOffset>>,

        /// IANA timezone identifier passed to the planner
        #[arg(long, default_value = "UTC")]
        timezone: String,

        /// Execution mode: v1_naive, v2_structured, v3_agentic_repair
        #[arg(long, default_value = "v3_agentic_repair")]
        mode: ExecutionMode,

        /// Also write the response to this file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Run a scenario file
    Batch {
        /// JSON array of scenarios
        #[arg(long, default_value = "scenarios/comparison.json")]
        scenarios: PathBuf,

        /// Current time shared by every scenario; defaults to now
        #[arg(long)]
        now: Option<DateTime<FixedOffset>>,

        /// IANA timezone identifier passed to the planner
        #[arg(long, default_value = "UTC")]
        timezone: String,

        /// Output file for results
        #[arg(long, default_value = "results.json")]
        output: PathBuf,
    },

    /// Summarize a results file written by `batch`
    Summary {
        /// Results JSON file
        #[arg(long)]
        results: PathBuf,
    },
}

/// Offline validation output.
#[derive(Serialize)]
struct ValidationReport {
    confidence: Confidence,
    validation: ValidationResult,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries JSON.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&cli)?;

    match &cli.command {
        Commands::Validate {
            plan,
            metadata,
            now,
        } => {
            let plan: GeneratedPlan = read_json(plan)?;
            let metadata: Metadata = read_json(metadata)?;
            let now = now.unwrap_or_else(|| Local::now().fixed_offset());

            let validator = Validator::new(config);
            let validation = validator.validate(&plan.plan, &metadata, now);
            let report = ValidationReport {
                confidence: validator.confidence(&validation),
                validation,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Commands::Extract { context } => {
            let extractor = LlmExtractor::new(build_client(&cli, &config)?, config.grounding);
            let metadata = extractor
                .extract(context)
                .await
                .context("Metadata extraction failed")?;
            println!("{}", serde_json::to_string_pretty(&metadata)?);
        }

        Commands::Plan {
            context,
            now,
            timezone,
            mode,
            output,
        } => {
            let pipeline = build_pipeline(&cli, config).await?;
            let request = PlanRequest {
                context: context.clone(),
                current_time: now.unwrap_or_else(|| Local::now().fixed_offset()),
                timezone: timezone.clone(),
                mode: *mode,
            };

            let response = pipeline.run(&request).await;
            let json = serde_json::to_string_pretty(&response)?;
            if let Some(path) = output {
                std::fs::write(path, &json)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                info!(path = %path.display(), "Response saved");
            }
            println!("{json}");
        }

        Commands::Batch {
            scenarios,
            now,
            timezone,
            output,
        } => {
            let scenarios = load_scenarios(scenarios)?;
            info!(count = scenarios.len(), "Starting batch");

            let pipeline = build_pipeline(&cli, config).await?;
            let now = now.unwrap_or_else(|| Local::now().fixed_offset());
            let results = run_batch(&pipeline, &scenarios, now, timezone).await;

            let output_path = timestamped_path(output);
            results.save(&output_path)?;

            println!("\n=== Batch Complete ===");
            println!("Results saved to: {}", output_path.display());
            println!("\nSummary:\n{}", results.render_summary());
        }

        Commands::Summary { results } => {
            let results = BatchResults::load(results)
                .with_context(|| format!("Failed to load results {}", results.display()))?;
            println!("Runs: {}", results.results.len());
            println!("\nSummary:\n{}", results.render_summary());
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(secs) = cli.timeout_secs {
        config.repair.generator_timeout_secs = secs;
    }
    Ok(config)
}

fn build_client(cli: &Cli, config: &EngineConfig) -> Result<ChatClient> {
    ChatClient::new(
        &cli.host,
        cli.api_key.clone(),
        cli.model.clone(),
        config.repair.generator_timeout(),
    )
}

async fn build_pipeline(cli: &Cli, config: EngineConfig) -> Result<PlanPipeline> {
    let client = build_client(cli, &config)?;
    if !client.health_check().await? {
        anyhow::bail!("Chat completions server at {} is not reachable", cli.host);
    }
    info!(host = %cli.host, model = %client.model(), "Chat server reachable");

    let extractor = LlmExtractor::new(client.clone(), config.grounding.clone());
    let planner = LlmPlanner::new(client);
    let orchestrator = Orchestrator::new(Arc::new(planner), Validator::new(config));
    Ok(PlanPipeline::new(Arc::new(extractor), orchestrator))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}
