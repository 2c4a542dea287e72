// src/config/embedding.rs
use serde::Deserialize;
use std::{env, sync::Arc, time::Duration};

use crate::embedding::{
    hashing::DEFAULT_HASHING_DIMENSION,
    openai::{DEFAULT_OPENAI_ENDPOINT, DEFAULT_OPENAI_MODEL},
    DisabledEmbeddingProvider, DynEmbeddingProvider, HashingEmbeddingProvider,
    OpenAiEmbeddingProvider, RetryPolicy,
};
use crate::error::HotnessError;

pub const ENV_EMBEDDING_TEST_MODE: &str = "EMBEDDING_TEST_MODE";
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";

fn default_provider() -> String {
    "openai".to_string()
}
fn default_api_key() -> String {
    "ENV".to_string()
}
fn default_endpoint() -> String {
    DEFAULT_OPENAI_ENDPOINT.to_string()
}
fn default_model() -> String {
    DEFAULT_OPENAI_MODEL.to_string()
}
fn default_request_timeout_ms() -> u64 {
    4_000
}
fn default_max_in_flight() -> usize {
    4
}
fn default_run_budget_ms() -> u64 {
    20_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingSettings {
    /// "openai" | "hashing" | "disabled" (case-insensitive)
    #[serde(default = "default_provider")]
    pub provider: String,
    /// "ENV" means: read from OPENAI_API_KEY
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Expected vector length; vectors of any other length are rejected.
    #[serde(default)]
    pub dimension: Option<usize>,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
    /// Wall-clock budget for all embedding work of one run.
    #[serde(default = "default_run_budget_ms")]
    pub run_budget_ms: u64,
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            api_key: default_api_key(),
            endpoint: default_endpoint(),
            model: default_model(),
            dimension: None,
            request_timeout_ms: default_request_timeout_ms(),
            max_in_flight: default_max_in_flight(),
            run_budget_ms: default_run_budget_ms(),
            retry: RetryPolicy::default(),
        }
    }
}

impl EmbeddingSettings {
    pub fn run_budget(&self) -> Duration {
        Duration::from_millis(self.run_budget_ms)
    }

    pub fn validate(&self) -> Result<(), HotnessError> {
        if self.max_in_flight == 0 {
            return Err(HotnessError::InvalidConfig(
                "embedding.max_in_flight must be at least 1".to_string(),
            ));
        }
        if self.run_budget_ms == 0 || self.request_timeout_ms == 0 {
            return Err(HotnessError::InvalidConfig(
                "embedding budgets and timeouts must be positive".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(HotnessError::InvalidConfig(
                "embedding.retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.dimension == Some(0) {
            return Err(HotnessError::InvalidConfig(
                "embedding.dimension must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Factory: build a provider according to config and environment variables.
    ///
    /// * If `EMBEDDING_TEST_MODE=mock`, returns the deterministic hashing provider.
    /// * Else builds the configured provider; `openai` without a key is a config error.
    pub fn build_provider(&self) -> Result<DynEmbeddingProvider, HotnessError> {
        let dimension = self.dimension.unwrap_or(DEFAULT_HASHING_DIMENSION);

        if env::var(ENV_EMBEDDING_TEST_MODE)
            .map(|v| v == "mock")
            .unwrap_or(false)
        {
            return Ok(Arc::new(HashingEmbeddingProvider::new(dimension)));
        }

        match self.provider.trim().to_lowercase().as_str() {
            "openai" => {
                let key = self.resolve_api_key()?;
                let provider = OpenAiEmbeddingProvider::new(
                    &self.endpoint,
                    &key,
                    &self.model,
                    Duration::from_millis(self.request_timeout_ms),
                )?;
                Ok(Arc::new(provider))
            }
            "hashing" | "mock" => Ok(Arc::new(HashingEmbeddingProvider::new(dimension))),
            "disabled" => Ok(Arc::new(DisabledEmbeddingProvider)),
            other => Err(HotnessError::InvalidConfig(format!(
                "unsupported embedding provider: {other}"
            ))),
        }
    }

    fn resolve_api_key(&self) -> Result<String, HotnessError> {
        if self.api_key.trim().eq_ignore_ascii_case("env") {
            env::var(ENV_OPENAI_API_KEY).map_err(|_| {
                HotnessError::InvalidConfig(format!("missing {ENV_OPENAI_API_KEY} env var"))
            })
        } else {
            Ok(self.api_key.trim().to_string())
        }
    }
}
