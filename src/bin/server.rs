//! NER inference server — HTTP API over a pretrained token classifier.
//!
//! Loads the model once at startup and serves `POST /ner`.
//!
//! Usage:
//!   NER_MODEL=dslim/bert-base-NER NER_BIND=0.0.0.0:8000 ner-server
//!
//! Or with args:
//!   ner-server --model dslim/bert-base-NER --bind 127.0.0.1:8000

use std::sync::Arc;

use pdf_ner::config::{ServerConfig, ENV_BIND, ENV_MODEL, ENV_REVISION};
use pdf_ner::inference::{router, AppState};
use pdf_ner::logging::init_logging;
use pdf_ner::pipeline::{BertNerPipeline, TokenClassifier};

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("[Server] Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("[Server] Shutting down");
}

#[tokio::main]
async fn main() {
    init_logging();

    // Parse simple args (no clap to keep binary small)
    let args: Vec<String> = std::env::args().collect();
    let mut bind_arg: Option<&str> = None;
    let mut model_arg: Option<&str> = None;
    let mut revision_arg: Option<&str> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--bind" if i + 1 < args.len() => {
                bind_arg = Some(&args[i + 1]);
                i += 2;
            }
            "--model" if i + 1 < args.len() => {
                model_arg = Some(&args[i + 1]);
                i += 2;
            }
            "--revision" if i + 1 < args.len() => {
                revision_arg = Some(&args[i + 1]);
                i += 2;
            }
            "--help" | "-h" => {
                println!("ner-server — Named entity recognition HTTP API");
                println!();
                println!("Usage: ner-server [--bind ADDR:PORT] [--model HF_MODEL_ID] [--revision REV]");
                println!();
                println!("Environment variables:");
                println!("  {}           Bind address (default: 0.0.0.0:8000)", ENV_BIND);
                println!("  {}          Hugging Face model id (default: dslim/bert-base-NER)", ENV_MODEL);
                println!("  {}  Model revision (default: main)", ENV_REVISION);
                println!("  RUST_LOG           Log filter (default: info)");
                std::process::exit(0);
            }
            _ => {
                i += 1;
            }
        }
    }

    let config = ServerConfig::resolve(bind_arg, model_arg, revision_arg);
    tracing::info!("[Server] Model: {} @ {}", config.model_id, config.revision);
    tracing::info!("[Server] Binding to: {}", config.bind);

    let model_id = config.model_id.clone();
    let revision = config.revision.clone();
    let loaded = tokio::task::spawn_blocking(move || BertNerPipeline::load(&model_id, &revision)).await;
    let pipeline = match loaded {
        Ok(Ok(p)) => p,
        Ok(Err(e)) => {
            tracing::error!("[Server] Failed to load model: {}", e);
            std::process::exit(1);
        }
        Err(e) => {
            tracing::error!("[Server] Model loader crashed: {}", e);
            std::process::exit(1);
        }
    };

    // Warm up so the first request doesn't pay for lazy allocations
    match pipeline.classify("warmup") {
        Ok(_) => tracing::info!("[Server] NER model ready"),
        Err(e) => tracing::warn!("[Server] Warning: NER warmup failed: {}", e),
    }

    let app = router(AppState::new(Arc::new(pipeline)));

    let listener = match tokio::net::TcpListener::bind(&config.bind).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("[Server] Failed to bind to {}: {}", config.bind, e);
            std::process::exit(1);
        }
    };

    tracing::info!("[Server] Listening on {}", config.bind);
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("[Server] Server error: {}", e);
        std::process::exit(1);
    }
}
