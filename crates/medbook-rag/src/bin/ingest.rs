//! Ingestion binary: PDF -> chunks -> embeddings -> Pinecone
//!
//! Run with: cargo run -p medbook-rag --bin medbook-ingest -- --pdf Medical_book.pdf

use anyhow::Context;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use medbook_rag::{
    config::RagConfig,
    ingestion::{IngestPipeline, RecursiveTextSplitter},
    providers::{EmbeddingProvider, OnnxEmbedder, PineconeClient},
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "medbook-ingest", about = "Index a PDF book into Pinecone")]
struct Args {
    /// TOML configuration file
    #[arg(long, env = "MEDBOOK_CONFIG")]
    config: Option<PathBuf>,

    /// PDF to ingest (overrides config)
    #[arg(long)]
    pdf: Option<PathBuf>,

    /// Pinecone index name (overrides config)
    #[arg(long)]
    index: Option<String>,

    /// Vectors per upsert request (overrides config)
    #[arg(long)]
    batch_size: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "medbook_rag=info,medbook_ingest=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = RagConfig::load(args.config.as_deref()).context("loading configuration")?;
    if let Some(pdf) = args.pdf {
        config.ingest.pdf_path = pdf;
    }
    if let Some(index) = args.index {
        config.pinecone.index_name = index;
    }
    if let Some(batch_size) = args.batch_size {
        config.ingest.batch_size = batch_size;
    }
    config.validate().context("validating configuration")?;

    let pdf_path = config.ingest.pdf_path.clone();
    let splitter = RecursiveTextSplitter::from_config(&config.chunking);
    let book = IngestPipeline::prepare(&pdf_path, &splitter)
        .with_context(|| format!("reading {}", pdf_path.display()))?;

    tracing::info!("Loading embedding model ({})...", config.embeddings.model);
    let embedder = Arc::new(
        OnnxEmbedder::new(&config.embeddings)
            .await
            .context("loading embedding model")?,
    );

    let client = PineconeClient::new(&config.pinecone).context("creating Pinecone client")?;
    let model = client
        .ensure_index(&config.pinecone, embedder.dimensions())
        .await
        .with_context(|| format!("preparing index '{}'", config.pinecone.index_name))?;
    let index = client.index_for(&model, config.pinecone.namespace.clone())?;

    let progress = ProgressBar::new(book.chunks.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] {bar:40} {pos}/{len} chunks")
            .context("building progress bar")?,
    );

    tracing::info!("Upserting vectors to Pinecone...");
    let pipeline =
        IngestPipeline::new(embedder, Arc::new(index), &config.ingest).with_progress(progress);
    let report = pipeline
        .upsert_chunks(&book.chunks)
        .await
        .context("upserting chunks")?;

    println!(
        "Ingestion complete: {} pages, {} chunks, {} vectors in {} batches",
        book.pages.len(),
        report.chunks,
        report.vectors_upserted,
        report.batches
    );

    Ok(())
}
