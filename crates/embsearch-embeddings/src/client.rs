//! Blocking HTTP client for the remote embedding service.
//!
//! Wire contract: POST `{base_url}/api/embeddings` with
//! `{"model": …, "prompt": …}`, response `{"embedding": [f32, …]}`.
//! A response without an `embedding` field is an error, never a silent
//! null.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use embsearch_core::config::EmbeddingConfig;
use embsearch_core::errors::{EmbeddingError, EmbsearchResult};
use embsearch_core::traits::IEmbeddingProvider;

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Option<Vec<f32>>,
}

/// Client for a remote embedding model server.
///
/// Holds a `reqwest` blocking client, which is internally pooled and
/// safe to share by reference across scan workers.
#[derive(Debug, Clone)]
pub struct HttpEmbeddingClient {
    client: reqwest::blocking::Client,
    base_url: String,
    timeout_secs: u64,
}

impl HttpEmbeddingClient {
    /// Build a client from configuration.
    pub fn new(config: &EmbeddingConfig) -> EmbsearchResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| EmbeddingError::RequestFailed {
                model: String::new(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout_secs: config.request_timeout_secs,
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn embeddings_url(&self) -> String {
        format!("{}/api/embeddings", self.base_url)
    }
}

impl IEmbeddingProvider for HttpEmbeddingClient {
    fn embed(&self, model: &str, text: &str) -> EmbsearchResult<Vec<f32>> {
        let request = EmbedRequest {
            model,
            prompt: text,
        };

        let response = self
            .client
            .post(self.embeddings_url())
            .json(&request)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    EmbeddingError::Timeout {
                        model: model.to_string(),
                        seconds: self.timeout_secs,
                    }
                } else {
                    EmbeddingError::RequestFailed {
                        model: model.to_string(),
                        reason: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(EmbeddingError::RequestFailed {
                model: model.to_string(),
                reason: format!("server returned {status}"),
            }
            .into());
        }

        let body: EmbedResponse =
            response.json().map_err(|e| EmbeddingError::RequestFailed {
                model: model.to_string(),
                reason: format!("malformed response: {e}"),
            })?;

        let embedding = body.embedding.ok_or_else(|| EmbeddingError::MissingEmbedding {
            model: model.to_string(),
        })?;

        debug!(model, dims = embedding.len(), "embedded text");
        Ok(embedding)
    }

    fn name(&self) -> &str {
        "http-embedding-client"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let config = EmbeddingConfig {
            base_url: "http://localhost:11434/".to_string(),
            ..Default::default()
        };
        let client = HttpEmbeddingClient::new(&config).unwrap();
        assert_eq!(client.embeddings_url(), "http://localhost:11434/api/embeddings");
    }

    #[test]
    fn missing_embedding_field_deserializes_to_none() {
        let body: EmbedResponse = serde_json::from_str("{}").unwrap();
        assert!(body.embedding.is_none());
        let body: EmbedResponse = serde_json::from_str("{\"embedding\": [1.0, 2.0]}").unwrap();
        assert_eq!(body.embedding.unwrap(), vec![1.0, 2.0]);
    }
}
