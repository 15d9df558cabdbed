//! Embedding endpoint client (OpenAI-compatible `/embeddings`).
//!
//! Embedding is recall infrastructure, not a hard dependency: the retrieval
//! agent treats a failed or empty embedding as a signal to fall back to
//! keyword lookup, so errors here are reported, never escalated.

use serde::{Deserialize, Serialize};

use crate::retrieval::store::Embedder;
use crate::retrieval::RetrievalError;

pub struct HttpEmbedder {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::blocking::Client,
}

impl HttpEmbedder {
    pub fn new(base_url: &str, api_key: &str, model: &str, timeout_secs: u64) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            client,
        }
    }

    /// Read endpoint, credential and model from the environment. A missing
    /// credential is tolerated here — every embed call will degrade to the
    /// keyword fallback instead.
    pub fn from_env() -> Self {
        let base_url = std::env::var("FAIRLENS_EMBEDDING_URL")
            .unwrap_or_else(|_| "https://api.siliconflow.cn/v1".to_string());
        let api_key = std::env::var("FAIRLENS_EMBEDDING_API_KEY").unwrap_or_default();
        let model = std::env::var("FAIRLENS_EMBEDDING_MODEL")
            .unwrap_or_else(|_| "BAAI/bge-m3".to_string());

        Self::new(&base_url, &api_key, &model, 60)
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

impl Embedder for HttpEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, RetrievalError> {
        if self.api_key.is_empty() {
            return Err(RetrievalError::Embedding(
                "no embedding credential configured".into(),
            ));
        }

        let url = format!("{}/embeddings", self.base_url);
        let body = EmbeddingRequest {
            model: &self.model,
            input: text,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| RetrievalError::Embedding(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(RetrievalError::Embedding(format!("status {status}: {body}")));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .map_err(|e| RetrievalError::Embedding(e.to_string()))?;

        Ok(parsed
            .data
            .into_iter()
            .next()
            .map(|datum| datum.embedding)
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_credential_reports_not_panics() {
        let embedder = HttpEmbedder::new("https://api.example.com", "", "some-model", 5);
        let result = embedder.embed("query text");
        assert!(matches!(result, Err(RetrievalError::Embedding(_))));
    }

    #[test]
    fn constructor_trims_trailing_slash() {
        let embedder = HttpEmbedder::new("https://api.example.com/v1/", "key", "m", 5);
        assert_eq!(embedder.base_url, "https://api.example.com/v1");
    }
}
