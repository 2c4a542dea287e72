// src/embedding/openai.rs
//! OpenAI-compatible `/embeddings` provider. Requires an API key.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::EmbeddingProvider;
use crate::error::{EmbeddingError, HotnessError};

pub const DEFAULT_OPENAI_ENDPOINT: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "text-embedding-3-small";

pub struct OpenAiEmbeddingProvider {
    http: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedDatum>,
}

#[derive(Deserialize)]
struct EmbedDatum {
    embedding: Vec<f32>,
}

impl OpenAiEmbeddingProvider {
    /// `endpoint` is the API base (e.g. `https://api.openai.com/v1`); `/embeddings` is appended.
    pub fn new(
        endpoint: &str,
        api_key: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, HotnessError> {
        let http = reqwest::Client::builder()
            .user_agent("news-hotness/0.1")
            .connect_timeout(timeout.min(Duration::from_secs(4)))
            .timeout(timeout)
            .build()
            .map_err(|e| HotnessError::InvalidConfig(format!("http client: {e}")))?;
        Ok(Self {
            http,
            url: format!("{}/embeddings", endpoint.trim_end_matches('/')),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if self.api_key.is_empty() {
            return Err(EmbeddingError::Disabled);
        }

        let req = EmbedRequest {
            model: &self.model,
            input: text,
        };
        let resp = self
            .http
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(EmbeddingError::Status(resp.status().as_u16()));
        }

        // body-read timeouts stay retriable; undecodable bodies are malformed
        let body: EmbedResponse = resp.json().await.map_err(EmbeddingError::from)?;
        body.data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EmbeddingError::Malformed("empty data array".to_string()))
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}
