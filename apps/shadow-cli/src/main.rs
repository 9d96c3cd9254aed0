use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use shadow_core::config::{Config, Settings};
use shadow_core::loader::FsDocumentLoader;
use shadow_core::traits::DocumentLoader;
use shadow_core::{ChunkClassifier, ClearanceLevel};
use shadow_engine::QueryEngine;

#[derive(Debug, Parser)]
#[command(name = "shadow")]
#[command(about = "Clearance-aware answers from the manual and response framework")]
struct Cli {
    /// Directory holding config.toml and against which data paths resolve.
    #[arg(long, default_value = ".")]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build the index now and print a summary.
    Init,
    /// Answer a query at the given clearance level.
    Query {
        text: String,
        /// Level label or short form: 1-5, low, medium, high, very-high, top-secret.
        #[arg(short, long, default_value = "1")]
        clearance: ClearanceLevel,
        #[arg(long)]
        json: bool,
    },
    /// List the classified chunk set.
    Chunks {
        /// Print full chunks, text included, as JSON.
        #[arg(long)]
        json: bool,
    },
    /// List the parsed framework rules.
    Rules,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = Config::load_from(&cli.config_dir)
        .and_then(|c| c.settings())
        .context("loading configuration")?;
    tracing::debug!(manual = %settings.data.manual_path.display(), framework = %settings.data.framework_path.display(), "settings loaded");

    match cli.command {
        Command::Init => init(settings),
        Command::Query { text, clearance, json } => query(settings, &text, clearance, json),
        Command::Chunks { json } => chunks(&settings, json),
        Command::Rules => rules(&settings),
    }
}

fn init(settings: Settings) -> Result<()> {
    let engine = QueryEngine::builder(settings).build()?;
    let index = engine.initialize(true)?;
    println!("Index built at {} with embedder {}", index.built_at.format("%Y-%m-%d %H:%M:%S UTC"), index.embedder_id);
    println!("Chunks: {}", index.chunks.len());
    for (source, n) in index.chunks_per_source() {
        println!("  {source}: {n}");
    }
    for (level, n) in index.chunks_per_level() {
        println!("  {level}: {n}");
    }
    println!("Rules: {}", index.rules.len());
    Ok(())
}

fn query(settings: Settings, text: &str, clearance: ClearanceLevel, json: bool) -> Result<()> {
    let engine = QueryEngine::builder(settings).build()?;
    let response = engine.process(text, clearance);
    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }
    println!("Status: {}", response.status);
    if !response.body.is_empty() {
        println!("\n{}", response.body);
    }
    println!("\n{}", response.explanation);
    Ok(())
}

fn chunks(settings: &Settings, json: bool) -> Result<()> {
    let documents = FsDocumentLoader::from_settings(&settings.data).load()?;
    let classifier = ChunkClassifier::from_settings(&settings.chunking, &settings.classifier)?;
    let chunks = classifier.classify_all(&documents)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&chunks)?);
        return Ok(());
    }
    for c in &chunks {
        println!("{:<28} {:<20} {:<18} {:>5}  {}", c.id, c.source, c.security_level.label(), c.text.chars().count(), c.section);
    }
    println!("{} chunks", chunks.len());
    Ok(())
}

fn rules(settings: &Settings) -> Result<()> {
    let rules = shadow_rules::parse_file(&settings.data.framework_path)?;
    if rules.is_empty() {
        tracing::warn!(path = %settings.data.framework_path.display(), "no rules parsed from framework");
    }
    for r in &rules {
        let gate = r.min_clearance.map(|c| format!(" [min {c}]")).unwrap_or_default();
        println!("Rule {:>3}: {} '{}' -> {}{gate}", r.number, r.trigger_type, r.trigger_value, r.response_type);
    }
    println!("{} rules", rules.len());
    Ok(())
}
