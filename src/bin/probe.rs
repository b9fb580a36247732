//! Operator probe for the waste advisor.
//!
//! Usage:
//!   cargo run --bin probe -- models
//!   cargo run --bin probe -- ping
//!   cargo run --bin probe -- classify ./banana.jpg
//!   cargo run --bin probe -- table

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use waste_advisor::{
    advice, advisor::WasteAdvisor, clients::GeminiClient, config::Config, presentation, upload,
};

#[derive(Parser)]
#[command(name = "probe")]
#[command(about = "Waste advisor diagnostics", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List models visible to the configured API key
    Models {
        /// Include models that cannot generate content
        #[arg(long)]
        all: bool,
    },
    /// Send a short text prompt through the model chain
    Ping,
    /// Classify a local image and print the advice
    Classify {
        path: PathBuf,
        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print and verify the disposal advice table
    Table,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Models { all } => models(all).await,
        Commands::Ping => ping().await,
        Commands::Classify { path, json } => classify(path, json).await,
        Commands::Table => table(),
    }
}

fn load_client() -> Result<(Config, GeminiClient)> {
    let config = Config::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;
    let client = GeminiClient::from_config(&config)?;
    Ok((config, client))
}

async fn models(all: bool) -> Result<()> {
    let (config, client) = load_client()?;
    let chain = config.model_chain();
    let models = client.list_models().await?;

    println!("{} models visible to this key", models.len());
    for model in models
        .iter()
        .filter(|m| all || m.supports_generate_content())
    {
        let marker = if chain.iter().any(|c| c == model.short_name()) {
            "*"
        } else {
            " "
        };
        println!(
            "{} {:<40} {}",
            marker,
            model.short_name(),
            model.display_name.as_deref().unwrap_or("")
        );
    }

    for wanted in &chain {
        if !models.iter().any(|m| m.short_name() == wanted) {
            println!("⚠️  Configured model {} is not listed", wanted);
        }
    }
    Ok(())
}

async fn ping() -> Result<()> {
    let (_, client) = load_client()?;
    let start = std::time::Instant::now();
    let output = client
        .generate_text("Reply with the single word: ready")
        .await?;
    println!(
        "✅ {} answered in {}ms: {}",
        output.model,
        start.elapsed().as_millis(),
        output.text.trim()
    );
    Ok(())
}

async fn classify(path: PathBuf, json: bool) -> Result<()> {
    let (config, client) = load_client()?;
    let bytes = std::fs::read(&path)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned());
    let image = upload::validate(bytes, file_name, config.upload.max_bytes)?;

    let advisor = WasteAdvisor::new(Arc::new(client));
    let report = advisor.advise(&image).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let d = presentation::summarize(&report);
    println!("{}", d.item_name);
    println!("  Category:      {}", d.category);
    println!("  Biodegradable: {}", d.biodegradable);
    println!("  Moisture:      {}", d.moisture);
    println!("  Confidence:    {}", d.confidence);
    println!();
    println!("{}", d.title);
    println!("  Bin:  {}", d.bin);
    println!("  {}", d.instructions);
    println!("  Tip:  {}", d.tip);
    if let Some(extra) = d.model_advice {
        println!();
        println!("  Model says: {}", extra);
    }
    println!("\n(model {}, request {})", report.model, report.request_id);
    Ok(())
}

fn table() -> Result<()> {
    for entry in advice::entries() {
        println!(
            "{:<8} {:<8} {:<32} {}",
            entry.biodegradable.as_str(),
            entry.moisture.as_str(),
            entry.advice.title,
            entry.advice.bin_category
        );
    }
    advice::verify_table()?;
    println!("✅ {} entries, every combination covered", advice::TABLE_SIZE);
    Ok(())
}
