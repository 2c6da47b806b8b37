use anyhow::{bail, Context, Result};
use std::env;

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";
const DEFAULT_EMBED_MODEL: &str = "nomic-embed-text:v1.5";
const DEFAULT_LLM_MODEL: &str = "phi3:mini";
const DEFAULT_TOP_K: usize = 5;
const DEFAULT_MAX_CONTEXT_CHARS: usize = 8000;
const DEFAULT_CHUNK_MAX_WORDS: usize = 300;
const DEFAULT_BATCH_SIZE: usize = 128;

/// Runtime configuration, read once at startup and passed into the components.
#[derive(Debug, Clone)]
pub struct RagConfig {
    /// Base URL of the Ollama server (embeddings and generation)
    pub ollama_url: String,
    /// Qdrant gRPC endpoint
    pub qdrant_url: String,
    /// Optional Qdrant API key
    pub qdrant_api_key: Option<String>,
    /// Embedding model id
    pub embed_model: String,
    /// Generation model id
    pub llm_model: String,
    /// Number of chunks to retrieve per question
    pub top_k: usize,
    /// Character budget for the assembled context
    pub max_context_chars: usize,
    /// Maximum number of words per chunk
    pub chunk_max_words: usize,
    /// Number of records per vector store write
    pub batch_size: usize,
}

impl RagConfig {
    /// Read the configuration from environment variables, falling back to the
    /// documented defaults. Invalid numeric values are a startup error.
    pub fn from_env() -> Result<Self> {
        Ok(RagConfig {
            ollama_url: env::var("OLLAMA_URL").unwrap_or_else(|_| DEFAULT_OLLAMA_URL.to_string()),
            qdrant_url: env::var("QDRANT_URL").unwrap_or_else(|_| DEFAULT_QDRANT_URL.to_string()),
            qdrant_api_key: env::var("QDRANT_API_KEY").ok(),
            embed_model: env::var("EMBED_MODEL")
                .unwrap_or_else(|_| DEFAULT_EMBED_MODEL.to_string()),
            llm_model: env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_LLM_MODEL.to_string()),
            top_k: positive_var("TOP_K", DEFAULT_TOP_K)?,
            max_context_chars: positive_var("MAX_CONTEXT_CHARS", DEFAULT_MAX_CONTEXT_CHARS)?,
            chunk_max_words: positive_var("CHUNK_MAX_WORDS", DEFAULT_CHUNK_MAX_WORDS)?,
            batch_size: positive_var("BATCH_SIZE", DEFAULT_BATCH_SIZE)?,
        })
    }
}

/// Read a numeric variable, using `default` when unset.
fn positive_var(name: &str, default: usize) -> Result<usize> {
    match env::var(name) {
        Ok(raw) => parse_positive(name, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_positive(name: &str, raw: &str) -> Result<usize> {
    let value: usize = raw
        .trim()
        .parse()
        .with_context(|| format!("{} must be a positive integer, got '{}'", name, raw))?;
    if value == 0 {
        bail!("{} must be a positive integer, got 0", name);
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_positive_values() {
        assert_eq!(parse_positive("TOP_K", "5").unwrap(), 5);
        assert_eq!(parse_positive("BATCH_SIZE", " 128 ").unwrap(), 128);
    }

    #[test]
    fn rejects_zero() {
        assert!(parse_positive("CHUNK_MAX_WORDS", "0").is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_positive("TOP_K", "five").is_err());
        assert!(parse_positive("TOP_K", "-3").is_err());
    }
}
