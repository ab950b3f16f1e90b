//! Chat server binary
//!
//! Run with: cargo run -p medbook-rag --bin medbook-server

use anyhow::Context;
use clap::Parser;
use medbook_rag::{config::RagConfig, server::RagServer};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "medbook-server", about = "Grounded chat over the indexed medical book")]
struct Args {
    /// TOML configuration file
    #[arg(long, env = "MEDBOOK_CONFIG")]
    config: Option<PathBuf>,

    /// Bind host (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Bind port (overrides config)
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "medbook_rag=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    println!(
        r#"
╔═══════════════════════════════════════════════════════════╗
║                    Medbook RAG Controller                 ║
║          Grounded answers from the medical book           ║
╚═══════════════════════════════════════════════════════════╝
"#
    );

    let mut config = RagConfig::load(args.config.as_deref()).context("loading configuration")?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    tracing::info!("Configuration loaded");
    tracing::info!("  - Embedding model: {}", config.embeddings.model);
    tracing::info!("  - Pinecone index: {}", config.pinecone.index_name);
    tracing::info!("  - Top k: {}", config.retrieval.top_k);
    match config.llm.generate_url() {
        Ok(url) => tracing::info!("  - Completion endpoint: {}", url),
        Err(e) => tracing::warn!("  - Completion endpoint: {}", e),
    }

    let server = RagServer::new(config).await?;

    println!("\nServer starting...");
    println!("  Chat: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("  API Info: http://{}/api/info", server.address());
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
