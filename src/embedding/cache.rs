// src/embedding/cache.rs
//! Per-run embedding cache keyed by content hash.
//!
//! A run owns its cache; nothing here is global, so independent runs (and tests)
//! never see each other's vectors. Failures are remembered too, so a text whose
//! provider call already failed is not retried again within the same run.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::HotnessError;

pub type Embedding = Arc<Vec<f32>>;

/// Hex SHA-256 of the text, used as the cache key.
pub fn content_key(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(64);
    for b in digest.iter() {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

#[derive(Debug, Clone)]
enum Entry {
    Ready(Embedding),
    Failed(String),
}

#[derive(Debug, Default)]
pub struct EmbeddingCache {
    inner: Mutex<HashMap<String, Entry>>,
}

impl EmbeddingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached outcome for `text`, if any.
    pub fn get(&self, text: &str) -> Option<Result<Embedding, HotnessError>> {
        let key = content_key(text);
        let guard = self.lock();
        guard.get(&key).map(|e| match e {
            Entry::Ready(v) => Ok(Arc::clone(v)),
            Entry::Failed(cause) => Err(HotnessError::EmbeddingUnavailable {
                cause: cause.clone(),
            }),
        })
    }

    pub fn contains(&self, text: &str) -> bool {
        let key = content_key(text);
        self.lock().contains_key(&key)
    }

    pub fn insert(&self, text: &str, embedding: Embedding) {
        self.insert_key(content_key(text), Entry::Ready(embedding));
    }

    pub fn insert_failure(&self, text: &str, cause: impl Into<String>) {
        self.insert_key(content_key(text), Entry::Failed(cause.into()));
    }

    fn insert_key(&self, key: String, entry: Entry) {
        self.lock().insert(key, entry);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // entries are written whole, so a poisoned map is still consistent
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
