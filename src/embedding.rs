//! Embedding provider implementations.
//!
//! Implements the core [`Embedder`] trait for:
//! - **[`DisabledEmbedder`]** — always errors; used when `embedding.provider = "disabled"`.
//!   Search then fails with an upstream error while the related-info
//!   file-path flow keeps working.
//! - **[`HttpEmbedder`]** — OpenAI (`POST /v1/embeddings`) or Ollama
//!   (`POST /api/embed`), selected by `embedding.provider`.
//!
//! # Retry Strategy
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, ... (capped at 2^5)

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use serde_json::Value;

use context_scout_core::embedding::Embedder;

use crate::config::EmbeddingConfig;

/// Build the embedder named by the configuration.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledEmbedder)),
        "openai" | "ollama" => Ok(Arc::new(HttpEmbedder::new(config)?)),
        other => bail!("Unknown embedding provider: {}", other),
    }
}

/// A no-op embedding provider that always returns errors.
pub struct DisabledEmbedder;

#[async_trait]
impl Embedder for DisabledEmbedder {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        bail!("Embedding provider is disabled. Set [embedding] provider in config.")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Api {
    OpenAi,
    Ollama,
}

/// Embedding provider backed by an HTTP embeddings API.
pub struct HttpEmbedder {
    api: Api,
    model: String,
    endpoint: String,
    api_key: Option<String>,
    dims: Option<usize>,
    max_retries: u32,
    client: reqwest::Client,
}

impl HttpEmbedder {
    /// # Errors
    ///
    /// Returns an error if `model` is not set, or if the OpenAI provider is
    /// selected and `OPENAI_API_KEY` is not in the environment.
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow!("embedding.model required for {} provider", config.provider))?;

        let (api, endpoint, api_key) = match config.provider.as_str() {
            "openai" => {
                let key = std::env::var("OPENAI_API_KEY")
                    .map_err(|_| anyhow!("OPENAI_API_KEY environment variable not set"))?;
                let base = config.url.as_deref().unwrap_or("https://api.openai.com");
                (
                    Api::OpenAi,
                    format!("{}/v1/embeddings", base.trim_end_matches('/')),
                    Some(key),
                )
            }
            "ollama" => {
                let base = config.url.as_deref().unwrap_or("http://localhost:11434");
                (
                    Api::Ollama,
                    format!("{}/api/embed", base.trim_end_matches('/')),
                    None,
                )
            }
            other => bail!("Unknown embedding provider: {}", other),
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            api,
            model,
            endpoint,
            api_key,
            dims: config.dims,
            max_retries: config.max_retries,
            client,
        })
    }

    async fn post_with_retry(&self, body: &Value) -> Result<Value> {
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tracing::debug!(attempt, ?delay, "retrying embedding request");
                tokio::time::sleep(delay).await;
            }

            let mut request = self.client.post(&self.endpoint).json(body);
            if let Some(key) = &self.api_key {
                request = request.bearer_auth(key);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response.json().await?);
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    if status.as_u16() == 429 || status.is_server_error() {
                        last_err = Some(anyhow!("embedding API error {}: {}", status, body_text));
                        continue;
                    }
                    bail!("embedding API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(anyhow!("embedding request to {} failed: {}", self.endpoint, e));
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow!("Embedding failed after retries")))
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut body = serde_json::json!({
            "model": self.model,
            "input": [text],
        });
        if let (Api::OpenAi, Some(dims)) = (self.api, self.dims) {
            body["dimensions"] = dims.into();
        }
        let json = self.post_with_retry(&body).await?;
        let vectors = match self.api {
            Api::OpenAi => parse_openai_response(&json)?,
            Api::Ollama => parse_ollama_response(&json)?,
        };
        vectors
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Empty embedding response"))
    }
}

fn to_vector(value: &Value) -> Result<Vec<f32>> {
    let items = value
        .as_array()
        .ok_or_else(|| anyhow!("embedding is not an array"))?;
    Ok(items
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
        .collect())
}

/// Extracts `data[].embedding`, ordered by `data[].index` when present.
fn parse_openai_response(json: &Value) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| anyhow!("Invalid OpenAI response: missing data array"))?;

    let mut indexed = Vec::with_capacity(data.len());
    for (pos, item) in data.iter().enumerate() {
        let embedding = item
            .get("embedding")
            .ok_or_else(|| anyhow!("Invalid OpenAI response: missing embedding"))?;
        let index = item
            .get("index")
            .and_then(Value::as_u64)
            .map_or(pos, |i| i as usize);
        indexed.push((index, to_vector(embedding)?));
    }
    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

fn parse_ollama_response(json: &Value) -> Result<Vec<Vec<f32>>> {
    json.get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| anyhow!("Invalid Ollama response: missing embeddings array"))?
        .iter()
        .map(to_vector)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_openai_in_index_order() {
        let body = json!({
            "data": [
                { "index": 1, "embedding": [0.5, 0.5] },
                { "index": 0, "embedding": [1.0, 0.0] }
            ]
        });
        let vectors = parse_openai_response(&body).unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.5, 0.5]]);
    }

    #[test]
    fn parses_ollama_embeddings() {
        let body = json!({ "embeddings": [[0.25, -1.0]] });
        assert_eq!(parse_ollama_response(&body).unwrap(), vec![vec![0.25, -1.0]]);
    }

    #[test]
    fn rejects_malformed_responses() {
        assert!(parse_openai_response(&json!({ "object": "list" })).is_err());
        assert!(parse_ollama_response(&json!({ "embeddings": [1.0] })).is_err());
    }

    #[tokio::test]
    async fn disabled_embedder_errors() {
        let embedder = create_embedder(&EmbeddingConfig::default()).unwrap();
        assert_eq!(embedder.model_name(), "disabled");
        assert!(embedder.embed("anything").await.is_err());
    }

    #[test]
    fn ollama_needs_no_api_key() {
        let config = EmbeddingConfig {
            provider: "ollama".into(),
            model: Some("nomic-embed-text".into()),
            url: Some("http://127.0.0.1:9/".into()),
            ..Default::default()
        };
        let embedder = HttpEmbedder::new(&config).unwrap();
        assert_eq!(embedder.endpoint, "http://127.0.0.1:9/api/embed");
        assert_eq!(embedder.model_name(), "nomic-embed-text");
    }
}
