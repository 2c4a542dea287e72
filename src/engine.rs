//! # Hotness Engine
//! One run: validate → partition malformed candidates → embed (bounded, cached)
//! → five signals per item → weighted score → top-N shortlist.
//!
//! The engine never writes history and never fails on a single bad item:
//! malformed candidates are skipped with a diagnostic, embedding failures fall
//! back to heuristics flagged `degraded`. The only hard errors are invalid
//! weights or selection overrides, raised before any embedding call.

use chrono::{DateTime, Utc};
use metrics::{counter, gauge, histogram};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use crate::aggregate::Weights;
use crate::config::EngineConfig;
use crate::embedding::{deadline_after, DynEmbeddingProvider, Embedder, Embedding, EmbeddingCache};
use crate::error::HotnessError;
use crate::history::HistoryStore;
use crate::metrics::{
    ensure_metrics_described, DEGRADED_SIGNALS_TOTAL, EMBEDDING_FAILURES_TOTAL,
    ITEMS_SCORED_TOTAL, ITEMS_SKIPPED_TOTAL, LAST_RUN_TS, RUN_MS, SHORTLIST_SIZE,
};
use crate::select::{select_top, SelectionConfig};
use crate::sentiment::{LexiconSentiment, SentimentModel};
use crate::signals::{
    batch_max_engagement, default_signals, ItemView, Peer, Signal, SignalContext,
};
use crate::text::{anon_hash, normalize_text};
use crate::types::{
    CandidateItem, PublishedRecord, ScoredItem, SkipReason, SkippedItem, TopicProfile,
};

/// Per-run replacements for configured values.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunOverrides {
    pub weights: Option<Weights>,
    pub threshold: Option<f64>,
    pub top_n: Option<usize>,
}

/// Result of one run. `scored` keeps input order; `shortlist` is ranked.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub scored: Vec<ScoredItem>,
    pub shortlist: Vec<ScoredItem>,
    pub skipped: Vec<SkippedItem>,
}

struct Prepared<'a> {
    item: &'a CandidateItem,
    text: String,
}

pub struct HotnessEngine {
    embedder: Embedder,
    signals: Vec<Box<dyn Signal>>,
    config: EngineConfig,
}

impl HotnessEngine {
    /// Validates `config` and wraps `provider` with its retry policy.
    pub fn new(config: EngineConfig, provider: DynEmbeddingProvider) -> Result<Self, HotnessError> {
        config.validate()?;
        let mut embedder = Embedder::new(provider, config.embedding.retry);
        if let Some(d) = config.embedding.dimension {
            embedder = embedder.with_dimension(d);
        }
        Ok(Self {
            embedder,
            signals: default_signals(Arc::new(LexiconSentiment::new())),
            config,
        })
    }

    /// Build the provider from the `[embedding]` section (honors `EMBEDDING_TEST_MODE`).
    pub fn from_config(config: EngineConfig) -> Result<Self, HotnessError> {
        let provider = config.embedding.build_provider()?;
        Self::new(config, provider)
    }

    pub fn with_sentiment_model(mut self, model: Arc<dyn SentimentModel>) -> Self {
        self.signals = default_signals(model);
        self
    }

    pub fn embedder(&self) -> &Embedder {
        &self.embedder
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Look up history through the configured window, then [`run`](Self::run).
    pub async fn run_with_store(
        &self,
        candidates: &[CandidateItem],
        topic: &TopicProfile,
        store: &dyn HistoryStore,
        overrides: &RunOverrides,
        now: DateTime<Utc>,
    ) -> Result<RunReport, HotnessError> {
        let history = store.lookup(&self.config.history.window, now)?;
        self.run(candidates, topic, &history, overrides, now).await
    }

    /// [`run_with_store`](Self::run_with_store) over undecoded batch entries.
    /// Entries that fail [`CandidateItem::from_json`] are skipped as
    /// `invalid_field` at their original index; the rest of the batch is scored.
    pub async fn run_json_with_store(
        &self,
        entries: &[Value],
        topic: &TopicProfile,
        store: &dyn HistoryStore,
        overrides: &RunOverrides,
        now: DateTime<Utc>,
    ) -> Result<RunReport, HotnessError> {
        let mut decoded = Vec::with_capacity(entries.len());
        let mut rejected = Vec::new();
        for (index, value) in entries.iter().enumerate() {
            match CandidateItem::from_json(value) {
                Ok(item) => decoded.push((index, item)),
                Err(detail) => rejected.push(SkippedItem {
                    index,
                    url: value
                        .get("url")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .trim()
                        .to_string(),
                    reason: SkipReason::InvalidField,
                    detail: Some(detail),
                }),
            }
        }
        let indexed: Vec<(usize, &CandidateItem)> =
            decoded.iter().map(|(i, item)| (*i, item)).collect();

        let history = store.lookup(&self.config.history.window, now)?;
        self.run_indexed(&indexed, rejected, topic, &history, overrides, now)
            .await
    }

    /// Score and select. `history` is used as given (already windowed).
    pub async fn run(
        &self,
        candidates: &[CandidateItem],
        topic: &TopicProfile,
        history: &[PublishedRecord],
        overrides: &RunOverrides,
        now: DateTime<Utc>,
    ) -> Result<RunReport, HotnessError> {
        let indexed: Vec<(usize, &CandidateItem)> = candidates.iter().enumerate().collect();
        self.run_indexed(&indexed, Vec::new(), topic, history, overrides, now)
            .await
    }

    /// `candidates` carry their batch index; `rejected` are entries already
    /// excluded upstream and are merged into the skip list by index.
    async fn run_indexed(
        &self,
        candidates: &[(usize, &CandidateItem)],
        rejected: Vec<SkippedItem>,
        topic: &TopicProfile,
        history: &[PublishedRecord],
        overrides: &RunOverrides,
        now: DateTime<Utc>,
    ) -> Result<RunReport, HotnessError> {
        let started = Instant::now();
        ensure_metrics_described();

        // Configuration errors abort the run before any provider call.
        let weights = overrides.weights.unwrap_or(self.config.weights);
        weights.validate()?;
        let selection = SelectionConfig {
            threshold: overrides.threshold.unwrap_or(self.config.selection.threshold),
            top_n: overrides.top_n.unwrap_or(self.config.selection.top_n),
        };
        selection.validate()?;

        let (prepared, mut skipped) = partition(candidates);
        skipped.extend(rejected);
        skipped.sort_by_key(|s| s.index);
        for s in &skipped {
            tracing::warn!(
                target: "hotness",
                index = s.index,
                url = %s.url,
                reason = %s.reason,
                "candidate skipped"
            );
        }
        counter!(ITEMS_SKIPPED_TOTAL).increment(skipped.len() as u64);

        if prepared.is_empty() {
            tracing::info!(target: "hotness", skipped = skipped.len(), "empty batch, nothing to score");
            return Ok(RunReport {
                skipped,
                ..RunReport::default()
            });
        }

        // Topic embedding from keywords is only needed when none was supplied.
        let keywords = topic.clean_keywords();
        let topic_text = (topic.topic_embedding.is_none() && !keywords.is_empty())
            .then(|| keywords.join(" "));

        let mut texts: Vec<String> = prepared.iter().map(|p| p.text.clone()).collect();
        texts.extend(topic_text.iter().cloned());

        let cache = EmbeddingCache::new();
        let settings = &self.config.embedding;
        self.embedder
            .embed_all(
                &cache,
                &texts,
                settings.max_in_flight,
                deadline_after(settings.run_budget()),
            )
            .await;

        let keyword_embedding: Option<Embedding> =
            match topic_text.as_deref().map(|t| cache_lookup(&cache, t)) {
                Some(Ok(v)) => Some(v),
                Some(Err(cause)) => {
                    tracing::warn!(
                        target: "hotness",
                        error = %cause,
                        "topic embedding unavailable, relevance uses keyword overlap"
                    );
                    None
                }
                None => None,
            };
        let topic_embedding: Option<&[f32]> = topic
            .topic_embedding
            .as_deref()
            .or(keyword_embedding.as_ref().map(|v| v.as_slice()));

        let mut embedding_failures = 0u64;
        let item_embeddings: Vec<Option<Embedding>> = prepared
            .iter()
            .map(|p| match cache_lookup(&cache, &p.text) {
                Ok(v) => Some(v),
                Err(cause) => {
                    embedding_failures += 1;
                    tracing::warn!(
                        target: "hotness",
                        url = %p.item.url,
                        text_id = %anon_hash(&p.text),
                        error = %cause,
                        "item embedding unavailable, relevance/uniqueness degraded"
                    );
                    None
                }
            })
            .collect();
        counter!(EMBEDDING_FAILURES_TOTAL).increment(embedding_failures);

        let peers: Vec<Peer<'_>> = prepared
            .iter()
            .zip(&item_embeddings)
            .map(|(p, emb)| Peer {
                url: &p.item.url,
                published_at: p.item.published_at,
                embedding: emb.as_ref().map(|v| v.as_slice()),
            })
            .collect();

        let ctx = SignalContext {
            now,
            max_engagement: batch_max_engagement(prepared.iter().map(|p| p.item)),
            topic,
            topic_embedding,
            history,
            peers: &peers,
            fallback: &self.config.fallback,
        };

        let mut degraded_total = 0u64;
        let scored: Vec<ScoredItem> = prepared
            .iter()
            .zip(&item_embeddings)
            .map(|(p, emb)| {
                let view = ItemView {
                    item: p.item,
                    text: &p.text,
                    embedding: emb.as_ref().map(|v| v.as_slice()),
                };
                let item = self.score_item(&view, &ctx, &weights);
                for kind in &item.degraded {
                    tracing::debug!(target: "hotness", url = %item.item.url, signal = %kind, "degraded signal");
                }
                degraded_total += item.degraded.len() as u64;
                item
            })
            .collect();
        counter!(DEGRADED_SIGNALS_TOTAL).increment(degraded_total);
        counter!(ITEMS_SCORED_TOTAL).increment(scored.len() as u64);

        let shortlist = select_top(&scored, &selection);

        let ms = started.elapsed().as_secs_f64() * 1000.0;
        histogram!(RUN_MS).record(ms);
        gauge!(SHORTLIST_SIZE).set(shortlist.len() as f64);
        gauge!(LAST_RUN_TS).set(Utc::now().timestamp() as f64);

        tracing::info!(
            target: "hotness",
            scored = scored.len(),
            shortlisted = shortlist.len(),
            skipped = skipped.len(),
            history = history.len(),
            embedding_failures = embedding_failures,
            degraded = degraded_total,
            provider = self.embedder.provider_name(),
            elapsed_ms = ms as u64,
            "hotness run finished"
        );

        Ok(RunReport {
            scored,
            shortlist,
            skipped,
        })
    }

    fn score_item(
        &self,
        view: &ItemView<'_>,
        ctx: &SignalContext<'_>,
        weights: &Weights,
    ) -> ScoredItem {
        let mut signals = BTreeMap::new();
        let mut degraded = Vec::new();
        for signal in &self.signals {
            let s = signal.score(view, ctx);
            signals.insert(signal.kind(), s.value);
            if s.degraded {
                degraded.push(signal.kind());
            }
        }
        let hot_score = weights.hot_score(&signals);
        ScoredItem {
            item: view.item.clone(),
            signals,
            hot_score,
            degraded,
        }
    }
}

fn cache_lookup(cache: &EmbeddingCache, text: &str) -> Result<Embedding, String> {
    match cache.get(text) {
        Some(Ok(v)) => Ok(v),
        Some(Err(e)) => Err(e.to_string()),
        None => Err("not embedded".to_string()),
    }
}

/// Split the batch into scorable items and skip diagnostics. The first
/// occurrence of a url wins; later ones are duplicates.
fn partition<'a>(candidates: &[(usize, &'a CandidateItem)]) -> (Vec<Prepared<'a>>, Vec<SkippedItem>) {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut kept = Vec::with_capacity(candidates.len());
    let mut skipped = Vec::new();

    for &(index, item) in candidates {
        let url = item.url.trim();
        let skip = |reason| SkippedItem {
            index,
            url: url.to_string(),
            reason,
            detail: None,
        };
        if url.is_empty() {
            skipped.push(skip(SkipReason::MissingUrl));
            continue;
        }
        if seen.contains(url) {
            skipped.push(skip(SkipReason::DuplicateUrl));
            continue;
        }
        let text = normalize_text(&item.text());
        if text.is_empty() {
            skipped.push(skip(SkipReason::EmptyText));
            continue;
        }
        seen.insert(url);
        kept.push(Prepared { item, text });
    }
    (kept, skipped)
}
