use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use log::{error, info};
use std::path::Path;

use gdpr_rag::config::RagConfig;
use gdpr_rag::database::{QdrantIndex, COLLECTION_NAME};
use gdpr_rag::document;
use gdpr_rag::ollama::OllamaClient;
use gdpr_rag::rag::RagEngine;

/// Question answering over the GDPR text using local Ollama models and Qdrant
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the structured corpus (JSON array of document nodes)
    #[arg(index = 1)]
    corpus_path: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize environment
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    // Validate configuration before any network activity
    let config = RagConfig::from_env().context("Invalid configuration")?;

    let path = Path::new(&args.corpus_path);
    if !path.exists() {
        error!("Corpus file not found: {}", args.corpus_path);
        return Err(anyhow::anyhow!("Corpus file not found"));
    }

    let index = QdrantIndex::new(&config).context("Failed to initialize Qdrant client")?;
    let ollama = OllamaClient::new(&config);

    // Only ingest when the collection doesn't exist yet
    let needs_ingest = !index
        .collection_exists()
        .await
        .context("Failed to reach Qdrant")?;
    if needs_ingest {
        index
            .create_collection()
            .await
            .context("Failed to create collection")?;
    } else {
        info!("Using existing collection: {}", COLLECTION_NAME);
    }

    let engine = RagEngine::new(index, ollama.clone(), ollama, config);

    if needs_ingest {
        let nodes = document::load_corpus(path).context("Failed to load corpus")?;
        info!("Indexing {} document nodes", nodes.len());
        engine
            .ingest(&nodes)
            .await
            .context("Failed to ingest corpus")?;
    }

    // Enter interactive Q&A loop
    engine
        .run_query_loop()
        .await
        .context("Error in query loop")?;

    Ok(())
}
