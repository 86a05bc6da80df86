//! Anise query service
//!
//! Answers game-entity queries from the command line or over HTTP.
//!
//! Usage:
//!   anise-server --config anise.toml query "炎骑士立绘" --output card.png
//!   anise-server --config anise.toml serve --port 8080
//!   anise-server --config anise.toml sync

use std::{path::{Path, PathBuf}, sync::Arc};
use anise_model::Card;
use anise_query::{Anise, load_config};
use anise_server::build_router;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "anise-server")]
#[command(about = "Anise game-entity query service")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "anise.toml")]
    config: PathBuf,

    /// Data root, overriding the configured one
    #[arg(long)]
    root: Option<PathBuf>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Answer one query and print the card
    Query {
        text: String,

        /// Where to write the first image; further images get a numbered suffix
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Serve the HTTP API
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,

        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Download data files from the origin and reload
    Sync,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_target(false)
        .compact()
        .init();

    let mut config = load_config(&args.config)
        .with_context(|| format!("Failed to load config {}", args.config.display()))?;
    if let Some(root) = args.root {
        config.root = root;
    }
    info!(root = %config.root.display(), "Anise starting");
    let anise = Anise::open(config).await.context("Failed to start Anise")?;

    match args.command {
        Command::Query { text, output } => {
            let card = anise.query(&text).await;
            print_card(&card);
            if let Some(output) = output {
                write_images(&card, &output)?;
            }
        }
        Command::Serve { bind, port } => {
            let app = build_router(Arc::new(anise));
            let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}"))
                .await
                .with_context(|| format!("Failed to bind {bind}:{port}"))?;
            info!("HTTP API listening on {}:{}", bind, port);
            axum::serve(listener, app).await.context("HTTP server failed")?;
        }
        Command::Sync => {
            let report = anise.sync_and_reload().await.context("Sync failed")?;
            for outcome in &report.sync.outcomes {
                match &outcome.error {
                    None => println!("  ok      {} -> {}", outcome.label, outcome.path.display()),
                    Some(e) => println!("  failed  {}: {}", outcome.label, e),
                }
            }
            println!(
                "{} entities, {} aliases, {} handlers",
                report.catalog.entities, report.catalog.aliases, report.handlers
            );
        }
    }
    Ok(())
}

fn print_card(card: &Card) {
    println!("[{:?}]", card.status);
    if !card.text.is_empty() {
        println!("{}", card.text);
    }
    for image in &card.images {
        println!("<{} bytes {}>", image.bytes.len(), image.content_type);
    }
}

fn write_images(card: &Card, output: &Path) -> Result<()> {
    if card.images.is_empty() {
        warn!("Card has no image, nothing written to {}", output.display());
        return Ok(());
    }
    for (index, image) in card.images.iter().enumerate() {
        let path = if index == 0 { output.to_path_buf() } else { numbered(output, index) };
        std::fs::write(&path, &image.bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote {}", path.display());
    }
    Ok(())
}

fn numbered(path: &Path, index: usize) -> PathBuf {
    let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}-{index}.{}", ext.to_string_lossy()),
        None => format!("{stem}-{index}"),
    };
    path.with_file_name(name)
}
