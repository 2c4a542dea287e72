// src/embedding/mod.rs
//! Embedding provider adapter: provider abstraction, retry, per-run caching and
//! bounded-concurrency batch embedding.

pub mod cache;
pub mod hashing;
pub mod openai;
pub mod retry;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::error::{EmbeddingError, HotnessError};

pub use cache::{content_key, Embedding, EmbeddingCache};
pub use hashing::{DisabledEmbeddingProvider, HashingEmbeddingProvider};
pub use openai::OpenAiEmbeddingProvider;
pub use retry::{retry_with_backoff, RetryPolicy};

/// Low-level provider: does a single remote (or local) call, no retries, no caching.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
    /// Provider name for diagnostics.
    fn name(&self) -> &'static str;
}

pub type DynEmbeddingProvider = Arc<dyn EmbeddingProvider>;

/// Cosine similarity in `[-1, 1]`. `None` for empty or mismatched vectors;
/// zero-norm vectors compare as `0.0`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.is_empty() || a.len() != b.len() {
        return None;
    }
    let (mut dot, mut na, mut nb) = (0f64, 0f64, 0f64);
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return Some(0.0);
    }
    Some((dot / (na.sqrt() * nb.sqrt())).clamp(-1.0, 1.0))
}

/// Provider wrapped with the retry policy and output validation.
#[derive(Clone)]
pub struct Embedder {
    provider: DynEmbeddingProvider,
    retry: RetryPolicy,
    dimension: Option<usize>,
}

impl Embedder {
    pub fn new(provider: DynEmbeddingProvider, retry: RetryPolicy) -> Self {
        Self {
            provider,
            retry,
            dimension: None,
        }
    }

    /// Reject vectors whose length differs from `dimension`.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = Some(dimension);
        self
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Embed one text, retrying transient failures. Never returns a zero vector
    /// in place of a failure.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, HotnessError> {
        let provider = &self.provider;
        let out = retry_with_backoff(&self.retry, || provider.embed(text))
            .await
            .and_then(|v| self.validate(v));
        out.map_err(|e| HotnessError::EmbeddingUnavailable {
            cause: format!("{}: {e}", self.provider.name()),
        })
    }

    /// Fill `cache` for every distinct text not yet in it, with at most
    /// `max_in_flight` concurrent provider calls. Work still pending at
    /// `deadline` is aborted and recorded as unavailable.
    pub async fn embed_all(
        &self,
        cache: &EmbeddingCache,
        texts: &[String],
        max_in_flight: usize,
        deadline: Instant,
    ) {
        let mut pending: HashSet<String> = HashSet::new();
        let mut todo = Vec::new();
        for t in texts {
            if !cache.contains(t) && pending.insert(t.clone()) {
                todo.push(t.clone());
            }
        }
        if todo.is_empty() {
            return;
        }

        let permits = Arc::new(Semaphore::new(max_in_flight.max(1)));
        let mut set = JoinSet::new();
        for text in todo {
            let embedder = self.clone();
            let permits = Arc::clone(&permits);
            set.spawn(async move {
                let out = match permits.acquire_owned().await {
                    Ok(_permit) => embedder.embed(&text).await,
                    Err(_) => Err(HotnessError::EmbeddingUnavailable {
                        cause: "embedding pool closed".to_string(),
                    }),
                };
                (text, out)
            });
        }

        loop {
            match tokio::time::timeout_at(deadline, set.join_next()).await {
                Ok(Some(Ok((text, out)))) => {
                    pending.remove(&text);
                    match out {
                        Ok(v) => cache.insert(&text, Arc::new(v)),
                        Err(e) => cache.insert_failure(&text, e.to_string()),
                    }
                }
                Ok(Some(Err(join_err))) => {
                    tracing::warn!(target: "hotness", error = %join_err, "embedding task failed");
                }
                Ok(None) => break,
                Err(_elapsed) => {
                    set.abort_all();
                    tracing::warn!(
                        target: "hotness",
                        pending = pending.len(),
                        "run budget exhausted before all embeddings arrived"
                    );
                    break;
                }
            }
        }

        for text in pending {
            cache.insert_failure(&text, "run budget exhausted");
        }
    }

    fn validate(&self, v: Vec<f32>) -> Result<Vec<f32>, EmbeddingError> {
        if v.is_empty() {
            return Err(EmbeddingError::Malformed("empty embedding".to_string()));
        }
        if let Some(d) = self.dimension {
            if v.len() != d {
                return Err(EmbeddingError::Malformed(format!(
                    "expected dimension {d}, got {}",
                    v.len()
                )));
            }
        }
        if v.iter().any(|x| !x.is_finite()) {
            return Err(EmbeddingError::Malformed("non-finite component".to_string()));
        }
        Ok(v)
    }
}

/// Deadline helper for callers that think in budgets.
pub fn deadline_after(budget: Duration) -> Instant {
    Instant::now() + budget
}
