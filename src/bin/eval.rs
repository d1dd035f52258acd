//! Evaluation CLI binary for the retrieval and answer pipeline.
//!
//! Usage:
//!   eval sample              # Run on built-in sample test set
//!   eval custom <path>       # Run on custom JSON test set
//!
//! Options:
//!   --max-cases <N>          # Limit number of cases
//!   --top-k <N>              # Number of chunks to retrieve (default: config, 5)
//!   --verbose                # Per-question output
//!   --output <path>          # Report path (default: evaluation_results.json)
//!   --config <path>          # Config file

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use md_rag::config::Config;
use md_rag::context::RagContext;
use md_rag::eval::{DEFAULT_REPORT_PATH, EvaluatorConfig, TestSet, sample_test_set};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "eval")]
#[command(about = "Evaluate retrieval and answer quality", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Maximum number of cases to evaluate
    #[arg(long, global = true)]
    max_cases: Option<usize>,

    /// Number of chunks to retrieve per question
    #[arg(long, global = true)]
    top_k: Option<usize>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Save the report to this JSON file
    #[arg(short, long, global = true, default_value = DEFAULT_REPORT_PATH)]
    output: PathBuf,

    /// Config file (defaults to the per-user config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run on the built-in StayEasy sample test set
    Sample,

    /// Run on a custom JSON test set
    Custom {
        /// Path to test set JSON file
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("md_rag=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            let mut config = Config::load_from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            config.apply_env(|key| std::env::var(key).ok());
            config
        }
        None => Config::load().context("Failed to load configuration")?,
    };
    config.validate_llm().context("Invalid configuration")?;

    println!("LLM API Base: {}", config.llm.api_base);
    println!("LLM Model: {}", config.llm.model);
    println!("Collection: {}", config.corpus.collection);

    let test_set = match &cli.command {
        Commands::Sample => {
            println!("Using sample test set...");
            sample_test_set()
        }
        Commands::Custom { path } => {
            println!("Loading test set from {:?}...", path);
            TestSet::load_json(path)?
        }
    };

    println!("Test set: {} ({} cases)", test_set.name, test_set.len());

    let evaluator_config = EvaluatorConfig {
        top_k: cli.top_k.unwrap_or(config.retrieval.top_k),
        max_cases: cli.max_cases,
        verbose: cli.verbose,
    };

    let ctx = RagContext::from_config(config).context("Invalid configuration")?;
    let report = ctx
        .evaluator(evaluator_config)
        .run(&test_set)
        .await
        .context("Evaluation aborted")?;

    report.print_summary();

    report
        .save(&cli.output)
        .with_context(|| format!("Failed to write {}", cli.output.display()))?;
    println!("Detailed results saved to {:?}", cli.output);

    Ok(())
}
