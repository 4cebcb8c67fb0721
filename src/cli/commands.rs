//! CLI command definitions for augflow.
//!
//! This module provides the command-line interface for driving the pipeline,
//! probing stage readiness, and working with dataset files locally.

use crate::augment::{augment_file, MIXING, PUZZLEMIX};
use crate::dataset::{ingest_csv, read_dataset, DatasetContract};
use crate::pipeline::{PipelineConfig, PipelineOrchestrator, RunRecord, RunState, StageHealth};
use crate::tracking::TracingSink;
use clap::Parser;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Default augmentation technique for local augmentation.
const DEFAULT_TECHNIQUE: &str = "basic";

/// Batch ML data pipeline driver.
#[derive(Parser)]
#[command(name = "augflow")]
#[command(about = "Drive a load/augment/train/evaluate ML data pipeline")]
#[command(version)]
#[command(
    long_about = "augflow drives a four-stage batch ML data pipeline (load, augment, train,\nevaluate) against HTTP stage collaborators, with an in-process augmentation\nengine for local runs.\n\nExample usage:\n  augflow run --technique mixing --beta 0.4 --json"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Drive the full load -> augment -> train -> evaluate pipeline.
    Run(RunArgs),

    /// Probe every stage collaborator's health endpoint once.
    Check(CheckArgs),

    /// Convert a CSV file with a `target` column into a dataset file.
    #[command(alias = "ingest")]
    Convert(ConvertArgs),

    /// Augment a dataset file in-process, without the augmenter collaborator.
    #[command(alias = "aug")]
    Augment(AugmentArgs),

    /// Validate a dataset file against the dataset contract.
    Validate(ValidateArgs),
}

/// Arguments for the run command.
///
/// Every option overrides the corresponding environment variable, which in
/// turn overrides the built-in default.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Source file handed to the loader (env: DATA_INPUT_PATH).
    #[arg(short = 'i', long)]
    pub source: Option<String>,

    /// Where the augmenter writes the augmented dataset (env: DATA_OUTPUT_PATH).
    #[arg(short = 'o', long)]
    pub output: Option<String>,

    /// Holdout dataset handed to the evaluator (env: TEST_DATA_PATH).
    #[arg(long)]
    pub holdout: Option<String>,

    /// Augmentation technique name (env: AUG_TECHNIQUE).
    #[arg(short = 't', long)]
    pub technique: Option<String>,

    /// Rotation in degrees for the basic technique (recorded, not applied).
    #[arg(long)]
    pub rotate: Option<i32>,

    /// Horizontal flip for the basic technique (recorded, not applied).
    #[arg(long)]
    pub flip: Option<bool>,

    /// Brightness adjustment for the basic technique.
    #[arg(long)]
    pub brightness: Option<f64>,

    /// Beta distribution parameter for the mixing technique.
    #[arg(long)]
    pub beta: Option<f64>,

    /// Readiness gate timeout in seconds.
    #[arg(long)]
    pub ready_timeout: Option<u64>,

    /// Output the run record as JSON instead of the human report.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Arguments for the check command.
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Output the probe results as JSON.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Arguments for the convert command.
#[derive(Parser, Debug)]
pub struct ConvertArgs {
    /// CSV file to convert. Must carry a `target` column with raw labels in [0, 1].
    #[arg(short = 'i', long)]
    pub input: String,

    /// Dataset file to write.
    #[arg(short = 'o', long)]
    pub output: String,

    /// Output the conversion report as JSON.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Arguments for the augment command.
#[derive(Parser, Debug)]
pub struct AugmentArgs {
    /// Dataset file to augment.
    #[arg(short = 'i', long)]
    pub input: String,

    /// Dataset file to write.
    #[arg(short = 'o', long)]
    pub output: String,

    /// Augmentation technique (basic, mixing, puzzlemix).
    #[arg(short = 't', long, env = "AUG_TECHNIQUE", default_value = DEFAULT_TECHNIQUE)]
    pub technique: String,

    /// Rotation in degrees for the basic technique (recorded, not applied).
    #[arg(long, default_value_t = 0)]
    pub rotate: i32,

    /// Horizontal flip for the basic technique (recorded, not applied).
    #[arg(long)]
    pub flip: bool,

    /// Brightness adjustment for the basic technique.
    #[arg(long, default_value_t = 0.0)]
    pub brightness: f64,

    /// Beta distribution parameter for the mixing technique.
    #[arg(long, default_value_t = 1.0)]
    pub beta: f64,

    /// RNG seed for a reproducible augmentation.
    #[arg(short = 's', long)]
    pub seed: Option<u64>,

    /// Output the augmentation result as JSON.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Arguments for the validate command.
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Dataset file to validate.
    #[arg(short = 'i', long)]
    pub path: String,

    /// Output the validation report as JSON.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Parse CLI arguments and return the Cli struct.
///
/// This allows main.rs to access CLI arguments (like log_level) before running commands.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
///
/// This is a convenience function that parses CLI args and runs the command.
/// For more control over logging initialization, use `parse_cli()` and `run_with_cli()`.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
///
/// This is the main entry point for the augflow CLI.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run(args) => run_run_command(args).await,
        Commands::Check(args) => run_check_command(args).await,
        Commands::Convert(args) => run_convert_command(args).await,
        Commands::Augment(args) => run_augment_command(args).await,
        Commands::Validate(args) => run_validate_command(args).await,
    }
}

// ============================================================================
// Run Command Implementation
// ============================================================================

async fn run_run_command(args: RunArgs) -> anyhow::Result<()> {
    let config = apply_run_overrides(PipelineConfig::from_env()?, &args);

    let orchestrator = PipelineOrchestrator::new(config).with_sink(Arc::new(TracingSink));
    let record = orchestrator.run().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        print_run_report(&record);
    }

    match &record.state {
        RunState::Succeeded => Ok(()),
        RunState::Failed { stage, reason } => Err(anyhow::anyhow!(
            "pipeline run failed at stage '{}': {}",
            stage,
            reason
        )),
        other => Err(anyhow::anyhow!(
            "pipeline run ended in non-terminal state '{}'",
            other
        )),
    }
}

/// Layers CLI options over the environment-derived configuration.
fn apply_run_overrides(mut config: PipelineConfig, args: &RunArgs) -> PipelineConfig {
    if let Some(source) = &args.source {
        config = config.with_source_path(source);
    }
    if let Some(output) = &args.output {
        config = config.with_augmented_path(output);
    }
    if let Some(holdout) = &args.holdout {
        config = config.with_holdout_path(holdout);
    }
    if let Some(technique) = args.technique.as_deref() {
        config = config.with_technique(technique);
    }
    if let Some(rotate) = args.rotate {
        config = config.with_rotation(rotate);
    }
    if let Some(flip) = args.flip {
        config = config.with_flip(flip);
    }
    if let Some(brightness) = args.brightness {
        config = config.with_brightness(brightness);
    }
    if let Some(beta) = args.beta {
        config = config.with_beta(beta);
    }
    if let Some(secs) = args.ready_timeout {
        config = config.with_readiness_timeout(Duration::from_secs(secs));
    }
    config
}

fn print_run_report(record: &RunRecord) {
    println!("\n=== Pipeline Run ===");
    println!("Run id:    {}", record.run_id);
    println!("State:     {}", record.state);
    if let Some(path) = &record.processed_path {
        println!("Processed: {}", path.display());
    }
    if let Some(path) = &record.augmented_path {
        println!("Augmented: {}", path.display());
    }
    if let Some(mix_ratio) = record.mix_ratio {
        println!("Mix ratio: {:.4}", mix_ratio);
    }
    if let Some(model_uri) = &record.model_uri {
        println!("Model:     {}", model_uri);
    }
    if let Some(error) = &record.error {
        println!("Error:     {}", error);
    }
    if !record.metrics.is_empty() {
        println!();
        for (name, value) in &record.metrics {
            println!("{} = {}", name, value);
        }
    }
}

// ============================================================================
// Check Command Implementation
// ============================================================================

#[derive(Debug, Serialize)]
struct CheckOutput {
    status: String,
    stages: Vec<StageHealth>,
}

async fn run_check_command(args: CheckArgs) -> anyhow::Result<()> {
    let config = PipelineConfig::from_env()?;
    let orchestrator = PipelineOrchestrator::new(config);

    let stages = orchestrator.probe().await;
    let all_ready = stages.iter().all(|entry| entry.ready);

    if args.json {
        let status = if all_ready { "ready" } else { "not_ready" };
        let output = CheckOutput {
            status: status.to_string(),
            stages,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("\n=== Stage Readiness ===");
        for entry in &stages {
            let mark = if entry.ready { "ready" } else { "not ready" };
            println!("  {:<10} {}", entry.stage.name(), mark);
        }
    }

    if all_ready {
        Ok(())
    } else {
        Err(anyhow::anyhow!("one or more stages are not ready"))
    }
}

// ============================================================================
// Convert Command Implementation
// ============================================================================

#[derive(Debug, Serialize)]
struct ConvertOutput {
    status: String,
    input: String,
    output: String,
    samples: usize,
    feature_dim: usize,
    classes: Vec<i64>,
}

async fn run_convert_command(args: ConvertArgs) -> anyhow::Result<()> {
    let contract = DatasetContract::default();
    let report = ingest_csv(&args.input, &args.output, &contract).await?;

    if args.json {
        let output = ConvertOutput {
            status: "success".to_string(),
            input: args.input,
            output: args.output,
            samples: report.samples,
            feature_dim: report.feature_dim,
            classes: report.classes,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("\n=== CSV Conversion ===");
        println!("Input:       {}", args.input);
        println!("Output:      {}", args.output);
        println!("Samples:     {}", report.samples);
        println!("Feature dim: {}", report.feature_dim);
        println!("Classes:     {:?}", report.classes);
    }

    Ok(())
}

// ============================================================================
// Augment Command Implementation
// ============================================================================

async fn run_augment_command(args: AugmentArgs) -> anyhow::Result<()> {
    let params = technique_params_from_args(&args);
    info!(
        technique = %args.technique,
        input = %args.input,
        "running local augmentation"
    );

    let result =
        augment_file(&args.input, &args.output, &args.technique, &params, args.seed).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("\n=== Augmentation ===");
        println!("Technique: {}", args.technique);
        if let Some(seed) = args.seed {
            println!("Seed:      {}", seed);
        }
        println!("Mix ratio: {:.4}", result.mix_ratio);
        println!("Samples:   {}", result.output_samples);
        println!("Output:    {}", result.output_path);
    }

    Ok(())
}

/// Builds the params object the technique parser expects from the CLI flags.
fn technique_params_from_args(args: &AugmentArgs) -> serde_json::Value {
    match args.technique.as_str() {
        MIXING | PUZZLEMIX => serde_json::json!({ "beta": args.beta }),
        _ => serde_json::json!({
            "rotate": args.rotate,
            "flip": args.flip,
            "brightness": args.brightness,
        }),
    }
}

// ============================================================================
// Validate Command Implementation
// ============================================================================

#[derive(Debug, Serialize)]
struct ValidateOutput {
    status: String,
    path: String,
    samples: usize,
    feature_dim: usize,
    classes: Vec<i64>,
}

async fn run_validate_command(args: ValidateArgs) -> anyhow::Result<()> {
    let path = Path::new(&args.path);
    let dataset = read_dataset(path).await?;

    let contract = DatasetContract::default();
    contract.validate(&dataset)?;

    let mut classes: Vec<i64> = dataset.labels().to_vec();
    classes.sort_unstable();
    classes.dedup();

    if args.json {
        let output = ValidateOutput {
            status: "valid".to_string(),
            path: args.path,
            samples: dataset.len(),
            feature_dim: dataset.feature_dim(),
            classes,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("\n=== Dataset Validation ===");
        println!("Path:        {}", args.path);
        println!("Status:      valid");
        println!("Samples:     {}", dataset.len());
        println!("Feature dim: {}", dataset.feature_dim());
        println!("Classes:     {:?}", classes);
    }

    Ok(())
}
