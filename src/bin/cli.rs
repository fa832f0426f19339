//! pdf-ner CLI - document bridge to the NER inference server
//!
//! Usage: pdf-ner [--api-url URL] <COMMAND>
//!
//! `mcp-server` runs the stdio MCP bridge for an assistant runtime; the other
//! commands run a single bridge operation and print its envelope as JSON.

use std::path::PathBuf;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::{Parser, Subcommand};
use pdf_ner::config::BridgeConfig;
use pdf_ner::logging::init_logging;
use pdf_ner::mcp::run_mcp_server;
use pdf_ner::NerBridge;
use serde::Serialize;

#[derive(Parser)]
#[command(name = "pdf-ner", version, about = "PDF and text named entity recognition via the NER API")]
struct Cli {
    /// NER API base URL (default: $NER_API_URL or http://localhost:8000)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start MCP server on stdio
    McpServer,
    /// Extract text from a PDF file and run NER over it
    AnalyzePdf {
        /// Path to the PDF file
        path: PathBuf,
    },
    /// Run NER over the given text
    AnalyzeText {
        /// Text to analyze
        text: String,
    },
    /// Check whether the NER API is reachable
    Status,
}

fn print_json(value: &impl Serialize) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Failed to serialize output: {}", e))?;
    println!("{}", json);
    Ok(())
}

async fn run_cli(cli: Cli) -> Result<bool, String> {
    let config = BridgeConfig::resolve(cli.api_url.as_deref());
    let bridge = NerBridge::from_config(config)
        .map_err(|e| format!("Failed to build HTTP client: {}", e))?;

    match cli.command {
        Commands::McpServer => run_mcp_server(bridge).await.map(|_| true),
        Commands::AnalyzePdf { path } => {
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
            let envelope = bridge.analyze_pdf(&STANDARD.encode(bytes)).await;
            print_json(&envelope)?;
            Ok(envelope.is_success())
        }
        Commands::AnalyzeText { text } => {
            let envelope = bridge.analyze_text(&text).await;
            print_json(&envelope)?;
            Ok(envelope.is_success())
        }
        Commands::Status => {
            let status = bridge.check_status().await;
            print_json(&status)?;
            Ok(status.success)
        }
    }
}

#[tokio::main]
async fn main() {
    init_logging();

    let cli = Cli::parse();

    match run_cli(cli).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            tracing::error!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
