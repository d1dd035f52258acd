//! md-rag CLI
//!
//! Ingest a folder of markdown documents and ask questions against it.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use md_rag::{
    chunker::MarkdownChunker,
    config::Config,
    context::RagContext,
    document::Document,
    embedding::{self, Embedder},
    generator::INTERACTIVE_TEMPERATURE,
    llm::LlmClient,
    persistence::{load_snapshot, snapshot_exists, snapshot_size},
};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// md-rag - Question answering over a folder of markdown documents
#[derive(Parser)]
#[command(name = "md-rag")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (defaults to the per-user config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chunk, embed and index every markdown file in the corpus folder
    Ingest {
        /// Corpus folder (overrides corpus.data_dir)
        #[arg(short, long)]
        data_dir: Option<PathBuf>,

        /// Soft chunk size in characters (overrides chunking.chunk_size)
        #[arg(long)]
        chunk_size: Option<usize>,
    },

    /// Show how a single markdown file is chunked
    Chunks {
        /// Path to the markdown file
        file: PathBuf,

        /// Soft chunk size in characters
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Output as JSON instead of a listing
        #[arg(long)]
        json: bool,
    },

    /// Answer a question from the indexed documents
    Ask {
        /// The question
        question: String,

        /// Number of chunks to retrieve
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Print the retrieved chunks before the answer
        #[arg(long)]
        show_sources: bool,
    },

    /// Show information about the vector index
    Info,

    /// Test LLM and embedding connections
    Test,
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
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Ingest {
            data_dir,
            chunk_size,
        } => cmd_ingest(config, data_dir, chunk_size).await,
        Commands::Chunks {
            file,
            chunk_size,
            json,
        } => cmd_chunks(&config, file, chunk_size, json),
        Commands::Ask {
            question,
            top_k,
            show_sources,
        } => cmd_ask(config, question, top_k, show_sources).await,
        Commands::Info => cmd_info(&config),
        Commands::Test => cmd_test(config).await,
    }
}

/// Defaults, then the config file, then environment variables.
fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => {
            let mut config = Config::load_from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            config.apply_env(|key| std::env::var(key).ok());
            Ok(config)
        }
        None => Config::load().context("Failed to load configuration"),
    }
}

async fn cmd_ingest(
    mut config: Config,
    data_dir: Option<PathBuf>,
    chunk_size: Option<usize>,
) -> Result<()> {
    if let Some(dir) = data_dir {
        config.corpus.data_dir = dir;
    }
    if let Some(size) = chunk_size {
        config.chunking.chunk_size = size;
    }
    let data_dir = config.corpus.data_dir.clone();

    println!("Ingesting: {}", data_dir.display());
    println!("Embedding model: {}", config.embedding.model);

    let start = Instant::now();
    let ctx = RagContext::from_config(config).context("Invalid configuration")?;
    let report = ctx
        .ingestor()
        .ingest_dir(&data_dir)
        .await
        .context("Ingestion failed")?;

    println!("\nCollection '{}' built:", report.collection);
    println!("  Documents:   {}", report.documents);
    println!("  Chunks:      {}", report.chunks);
    println!("  Build time:  {:.2?}", start.elapsed());

    if !report.failures.is_empty() {
        println!("  Skipped {} files:", report.failures.len());
        for failure in &report.failures {
            println!("    {}: {}", failure.path.display(), failure.reason);
        }
    }

    let index_path = &ctx.config.corpus.index_path;
    if snapshot_exists(index_path) {
        let size = snapshot_size(index_path)?;
        println!("\nIndex saved to: {}", index_path.display());
        println!("  File size: {:.1} KB", size as f64 / 1024.0);
    }

    Ok(())
}

fn cmd_chunks(
    config: &Config,
    file: PathBuf,
    chunk_size: Option<usize>,
    json: bool,
) -> Result<()> {
    let document = Document::from_file(&file).context("Failed to load document")?;
    let chunker = MarkdownChunker::new(chunk_size.unwrap_or(config.chunking.chunk_size));
    let chunks = chunker.chunk(&document);

    if json {
        println!("{}", serde_json::to_string_pretty(&chunks)?);
        return Ok(());
    }

    println!(
        "{}: {} chunks (chunk size {})",
        document.filename,
        chunks.len(),
        chunker.chunk_size()
    );
    println!("{}", "─".repeat(60));
    for chunk in &chunks {
        let heading = if chunk.heading.is_empty() {
            "(no heading)"
        } else {
            chunk.heading.as_str()
        };
        println!("[{}] {} ({} chars)", chunk.chunk_id, heading, chunk.char_count());
        let preview: String = chunk.text.chars().take(200).collect();
        for line in preview.lines().take(3) {
            println!("    {}", line);
        }
        if chunk.char_count() > 200 {
            println!("    ...");
        }
        println!();
    }

    Ok(())
}

async fn cmd_ask(
    config: Config,
    question: String,
    top_k: Option<usize>,
    show_sources: bool,
) -> Result<()> {
    config.validate_llm().context("Invalid configuration")?;
    let top_k = top_k.unwrap_or(config.retrieval.top_k);
    let ctx = RagContext::from_config(config).context("Invalid configuration")?;

    let start = Instant::now();
    let chunks = ctx
        .retriever()
        .retrieve(&question, top_k)
        .await
        .context("Retrieval failed")?;

    if show_sources {
        println!("Sources:");
        println!("{}", "─".repeat(60));
        for (i, chunk) in chunks.iter().enumerate() {
            println!(
                "{:>2}. {} [{}] (distance {:.4})",
                i + 1,
                chunk.chunk.filename,
                chunk.chunk.heading,
                chunk.distance
            );
        }
        println!("{}", "─".repeat(60));
    }

    let answer = ctx
        .generator()
        .with_temperature(INTERACTIVE_TEMPERATURE)
        .generate(&question, &chunks)
        .await
        .context("Answer generation failed")?;

    println!("{}", answer);
    println!("\n({} chunks, {:.2?})", chunks.len(), start.elapsed());

    Ok(())
}

fn cmd_info(config: &Config) -> Result<()> {
    let index_path = &config.corpus.index_path;
    if !snapshot_exists(index_path) {
        anyhow::bail!(
            "Index not found at '{}'. Run 'ingest' command first.",
            index_path.display()
        );
    }

    let snapshot = load_snapshot(index_path).context("Failed to load index")?;
    let size = snapshot_size(index_path)?;

    println!("Vector Index Information");
    println!("{}", "─".repeat(40));
    println!("  Index path:   {}", index_path.display());
    println!("  File size:    {:.1} KB", size as f64 / 1024.0);
    println!("  Collections:  {}", snapshot.collections.len());

    for collection in &snapshot.collections {
        let documents: std::collections::BTreeSet<_> = collection
            .entries
            .iter()
            .map(|e| e.chunk.filename.as_str())
            .collect();
        let marker = if collection.name == config.corpus.collection {
            " (active)"
        } else {
            ""
        };
        println!("\n  {}{}", collection.name, marker);
        println!("    Chunks:     {}", collection.entries.len());
        println!("    Documents:  {}", documents.len());
        println!("    Metric:     {:?}", collection.metric);
        if let Some(dims) = collection.dimensions {
            println!("    Dimensions: {}", dims);
        }
    }

    Ok(())
}

async fn cmd_test(config: Config) -> Result<()> {
    println!("Testing connections...\n");

    println!("Configuration:");
    println!("  API Base:  {}", config.llm.api_base);
    println!("  Model:     {}", config.llm.model);
    println!(
        "  API Key:   {}...",
        config.llm.api_key.chars().take(8).collect::<String>()
    );
    println!("  Embedding: {}", config.embedding.model);
    println!();

    if let Err(e) = config.validate_llm().and_then(|_| config.validate()) {
        println!("Configuration error: {}", e);
        return Ok(());
    }

    let client = LlmClient::new(config.llm.clone());
    println!("Sending test request to {}...", client.model());
    match client.test_connection().await {
        Ok(()) => println!("LLM connection successful!"),
        Err(e) => println!("LLM connection failed: {}", e),
    }

    let embedder = embedding::from_config(&config)?;
    println!("Embedding test sentence with {}...", embedder.model_name());
    match embedder.embed("hello").await {
        Ok(vector) => println!("Embedding successful ({} dimensions)", vector.len()),
        Err(e) => println!("Embedding failed: {}", e),
    }

    Ok(())
}
