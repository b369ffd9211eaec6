//! QA Agent page importer
//!
//! Fetches a web page, splits its visible text into overlapping chunks and
//! posts them to a running server's `/api/vector/add` endpoint.

use std::process::ExitCode;

use anyhow::Context;
use clap::error::ErrorKind;
use clap::Parser;
use qa_core::{init_logging, LogFormat};
use qa_knowledge::extract::fetch_html_text;
use qa_knowledge::ingest::{build_chunks, VectorApiClient, DEFAULT_API_BASE};
use qa_knowledge::ChunkConfig;

/// Import a web page into the QA Agent vector store
#[derive(Parser, Debug)]
#[command(name = "qa-import")]
#[command(about = "Import a web page into the QA Agent vector store", long_about = None)]
#[command(version)]
struct Cli {
    /// Page to fetch
    url: String,

    /// Base URL of the API server
    #[arg(long, env = "API_BASE", default_value = DEFAULT_API_BASE)]
    api_base: String,

    /// Chunk length in characters
    #[arg(long, default_value_t = ChunkConfig::default().size)]
    chunk_size: usize,

    /// Characters shared by consecutive chunks
    #[arg(long, default_value_t = ChunkConfig::default().overlap)]
    overlap: usize,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, env = "RUST_LOG", default_value = "warn")]
    log_level: String,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env before parsing so API_BASE can come from it
    dotenvy::dotenv().ok();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            let _ = e.print();
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(Some(&cli.log_level), cli.no_color, LogFormat::Pretty) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    match import(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Import failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn import(cli: &Cli) -> anyhow::Result<()> {
    let config = ChunkConfig {
        size: cli.chunk_size,
        overlap: cli.overlap,
    };
    let client = VectorApiClient::new(&cli.api_base)?;

    println!("Fetching {}", cli.url);
    let text = fetch_html_text(&cli.url).await?;
    println!("Fetched chars: {}", text.chars().count());

    let chunks = build_chunks(&cli.url, &text, config);
    println!("Chunks: {}", chunks.len());

    let reply = client
        .add_chunks(chunks)
        .await
        .with_context(|| format!("Failed to store chunks via {}", cli.api_base))?;

    println!("{}", serde_json::to_string_pretty(&reply)?);
    Ok(())
}
