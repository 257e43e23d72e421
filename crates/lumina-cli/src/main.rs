//! Lumina CLI: import media and work with its derivatives from the shell.
//!
//! Settings come from the environment (see `LuminaConfig::from_env`).

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use lumina_cli::{content_id, source_file, Lumina};
use lumina_core::{LuminaConfig, Media, Quality};
use lumina_infra::{init_telemetry, shutdown_telemetry, LogFormat};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "lumina", about = "Lumina derivative media tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a file and generate its derivatives
    Import {
        /// Path to the image or video
        file: PathBuf,
        /// Owner recorded on new media
        #[arg(long, default_value = "cli")]
        owner: String,
    },
    /// Write one derivative of a file to disk
    Derivative {
        file: PathBuf,
        /// thumbnail or fullres
        #[arg(long, default_value = "thumbnail")]
        quality: Quality,
        /// 0-based page for multi-page media
        #[arg(long, default_value = "0")]
        page: u32,
        /// Output path
        #[arg(long, short)]
        out: PathBuf,
    },
    /// Transcode a video into a segmented stream and print the playlist
    Stream {
        file: PathBuf,
    },
    /// Rank files by similarity to a text query
    Rank {
        /// Search query
        text: String,
        /// Files to rank
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Minimum score to keep
        #[arg(long, default_value = "0.2")]
        min_score: f32,
    },
}

#[derive(Serialize)]
struct RankedEntry {
    content_id: String,
    score: f32,
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

async fn import(
    lumina: &Lumina,
    file: &std::path::Path,
    owner: &str,
) -> anyhow::Result<Arc<Media>> {
    let id = content_id(file).await?;
    let source = source_file(file)?;
    let media = lumina
        .importer
        .import_file(&id, &source, owner)
        .await
        .with_context(|| format!("Failed to import {}", file.display()))?;
    Ok(media)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = LuminaConfig::from_env().context("Failed to load configuration")?;
    init_telemetry("lumina-cli", LogFormat::from_env())
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;
    config.validate()?;

    let cli = Cli::parse();
    let lumina = Lumina::new(config).await?;

    match cli.command {
        Commands::Import { file, owner } => {
            let media = import(&lumina, &file, &owner).await?;
            print_json(&media.snapshot())?;
        }
        Commands::Derivative {
            file,
            quality,
            page,
            out,
        } => {
            let media = import(&lumina, &file, "cli").await?;
            let bytes = lumina.derivatives.fetch(&media, quality, page).await?;
            tokio::fs::write(&out, &bytes)
                .await
                .with_context(|| format!("Failed to write {}", out.display()))?;
            print_json(&serde_json::json!({
                "content_id": media.content_id(),
                "quality": quality.as_str(),
                "size_bytes": bytes.len(),
                "out": out,
            }))?;
        }
        Commands::Stream { file } => {
            let media = import(&lumina, &file, "cli").await?;
            let source = source_file(&file)?;
            let streamer = lumina.streams.stream_video(&media, &source).await?;
            streamer.encode();

            let mut state = streamer.subscribe();
            state
                .wait_for(|s| s.is_finished())
                .await
                .context("Transcode worker went away")?;
            if let Some(err) = streamer.error() {
                return Err(err.into());
            }

            let list = streamer.get_list_file(&CancellationToken::new()).await?;
            println!("# {}", streamer.stream_dir().display());
            print!("{}", String::from_utf8_lossy(&list.bytes));
        }
        Commands::Rank {
            text,
            files,
            min_score,
        } => {
            let ranker = lumina
                .ranker
                .as_ref()
                .context("Similarity ranking needs HDIR_ENABLED=true")?;

            let mut media = Vec::with_capacity(files.len());
            for file in &files {
                media.push(import(&lumina, file, "cli").await?);
            }

            let ranked = ranker.rank_by_text(&text, &media, min_score).await?;
            let entries: Vec<RankedEntry> = ranked
                .iter()
                .map(|r| RankedEntry {
                    content_id: r.media.content_id().to_string(),
                    score: r.score,
                })
                .collect();
            print_json(&entries)?;
        }
    }

    shutdown_telemetry().await;
    Ok(())
}

