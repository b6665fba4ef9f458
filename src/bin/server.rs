//! Web server binary entry point.
//!
//! Loads the record store, embedding model and vector index once, then serves
//! the search page until Ctrl-C.
//!
//! ```bash
//! server --data-dir ./data --index-dir ./data --port 8501
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use paper_recommender::{
    config::AppConfig,
    server::{self, ServerConfig},
    startup::Resources,
    SearchEngine,
};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Serve the paper search UI over HTTP
#[derive(Parser, Debug)]
#[command(name = "server", version, about = "Serve the paper recommendation UI")]
struct Args {
    #[command(flatten)]
    config: AppConfig,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to bind
    #[arg(long, default_value_t = 8501)]
    port: u16,
}

fn setup_logging(log_level: &str) {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(&args.config.log_level);

    let config = args.config.clone();
    let resources = tokio::task::spawn_blocking(move || Resources::load(&config))
        .await
        .context("Startup task panicked")?
        .context("Failed to load search resources")?;

    let engine: Arc<dyn SearchEngine> = Arc::new(resources.query_service());
    info!("Serving {} papers", engine.corpus_size());

    let server_config = ServerConfig {
        host: args.host,
        port: args.port,
    };
    server::serve(&server_config, engine)
        .await
        .context("Server stopped with an error")?;

    Ok(())
}
