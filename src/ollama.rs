use crate::config::RagConfig;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Embedding requests are short; generation can take minutes on small hosts.
const EMBED_TIMEOUT: Duration = Duration::from_secs(120);
const GENERATE_TIMEOUT: Duration = Duration::from_secs(300);

/// Representation of a vector embedding
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Embedding {
    pub values: Vec<f32>,
}

/// Capability interface: text in, dense vector out.
#[allow(async_fn_in_trait)]
pub trait EmbeddingGateway {
    async fn embed(&self, text: &str) -> Result<Embedding>;
}

/// Capability interface: prompt in, generated text out.
#[allow(async_fn_in_trait)]
pub trait GenerativeService {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Client for the Ollama HTTP API (embeddings and generation)
#[derive(Clone)]
pub struct OllamaClient {
    base_url: String,
    embed_model: String,
    llm_model: String,
    client: reqwest::Client,
}

impl OllamaClient {
    /// Create a new Ollama client
    pub fn new(config: &RagConfig) -> Self {
        let client = reqwest::Client::new();
        OllamaClient {
            base_url: config.ollama_url.trim_end_matches('/').to_string(),
            embed_model: config.embed_model.clone(),
            llm_model: config.llm_model.clone(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl EmbeddingGateway for OllamaClient {
    /// Request an embedding for a text
    async fn embed(&self, text: &str) -> Result<Embedding> {
        let request = EmbeddingRequest {
            model: &self.embed_model,
            prompt: text,
        };

        let url = format!("{}/api/embeddings", self.base_url);
        let response = self
            .client
            .post(&url)
            .timeout(EMBED_TIMEOUT)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow::anyhow!(
                "Embedding request failed: {} {}",
                status,
                error_text
            ));
        }

        let response_data: EmbeddingResponse = response.json().await?;

        Ok(Embedding {
            values: response_data.embedding,
        })
    }
}

impl GenerativeService for OllamaClient {
    /// Generate text for a prompt, with streaming disabled
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            model: &self.llm_model,
            prompt,
            stream: false,
        };

        let url = format!("{}/api/generate", self.base_url);
        let response = self
            .client
            .post(&url)
            .timeout(GENERATE_TIMEOUT)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow::anyhow!(
                "Generation request failed: {} {}",
                status,
                error_text
            ));
        }

        let response_data: GenerateResponse = response.json().await?;
        Ok(response_data.response)
    }
}

// Request/response structures for the Ollama API

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize, Debug)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize, Debug)]
struct GenerateResponse {
    response: String,
}
