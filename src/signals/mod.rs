// src/signals/mod.rs
//! Signal extractors. Each maps one candidate (plus run context) to a score in [0,1].
//!
//! The registry is fixed: freshness, virality, relevance, sentiment, uniqueness.
//! Every extractor is pure given its inputs; embeddings are fetched before scoring.

pub mod freshness;
pub mod relevance;
pub mod sentiment;
pub mod uniqueness;
pub mod virality;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;

use crate::sentiment::SentimentModel;
use crate::types::{CandidateItem, PublishedRecord, SignalKind, TopicProfile};

pub use freshness::{freshness_at, Freshness};
pub use relevance::{keyword_overlap, Relevance};
pub use sentiment::Sentiment;
pub use uniqueness::Uniqueness;
pub use virality::{batch_max_engagement, trend_frequency, Virality};

/// How virality is scored for an item that reports no engagement counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementFallback {
    /// `missing_engagement_score`, not degraded.
    #[default]
    Constant,
    /// Similar stories in the batch published within `trend_window_hours`,
    /// divided by `trend_saturation` and capped at 1. Degraded.
    TrendFrequency,
}

/// Scores used when the data a signal needs is absent. These are policy knobs:
/// "unknown" defaults to neutral, absent engagement to zero.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct FallbackPolicy {
    pub missing_timestamp_score: f64,
    pub missing_engagement_score: f64,
    pub unknown_relevance_score: f64,
    pub unknown_uniqueness_score: f64,
    pub missing_engagement_mode: EngagementFallback,
    /// Cosine at or above which two batch items tell the same story.
    pub trend_similarity: f64,
    pub trend_window_hours: u64,
    /// Number of similar stories that saturates the trend score.
    pub trend_saturation: u32,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self {
            missing_timestamp_score: 0.5,
            missing_engagement_score: 0.0,
            unknown_relevance_score: 0.5,
            unknown_uniqueness_score: 0.5,
            missing_engagement_mode: EngagementFallback::Constant,
            trend_similarity: 0.7,
            trend_window_hours: 6,
            trend_saturation: 10,
        }
    }
}

/// One signal value; `degraded` marks values produced by a fallback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalScore {
    pub value: f64,
    pub degraded: bool,
}

impl SignalScore {
    pub fn exact(value: f64) -> Self {
        Self {
            value: clamp01(value),
            degraded: false,
        }
    }

    pub fn degraded(value: f64) -> Self {
        Self {
            value: clamp01(value),
            degraded: true,
        }
    }
}

/// NaN maps to 0.
pub fn clamp01(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

/// A candidate as seen by the extractors.
#[derive(Debug, Clone, Copy)]
pub struct ItemView<'a> {
    pub item: &'a CandidateItem,
    /// Normalized `title + " " + summary`.
    pub text: &'a str,
    /// `None` when the embedding provider was unavailable for this text.
    pub embedding: Option<&'a [f32]>,
}

/// Another scorable item of the same run, for batch-relative signals.
#[derive(Debug, Clone, Copy)]
pub struct Peer<'a> {
    pub url: &'a str,
    pub published_at: Option<DateTime<Utc>>,
    pub embedding: Option<&'a [f32]>,
}

/// Read-only context shared by every item of a run.
#[derive(Debug, Clone, Copy)]
pub struct SignalContext<'a> {
    pub now: DateTime<Utc>,
    pub max_engagement: u64,
    pub topic: &'a TopicProfile,
    pub topic_embedding: Option<&'a [f32]>,
    pub history: &'a [PublishedRecord],
    /// Every scorable item of the run, the item itself included.
    pub peers: &'a [Peer<'a>],
    pub fallback: &'a FallbackPolicy,
}

pub trait Signal: Send + Sync {
    fn kind(&self) -> SignalKind;
    fn score(&self, item: &ItemView<'_>, ctx: &SignalContext<'_>) -> SignalScore;
}

/// The fixed five-signal registry, in `SignalKind::ALL` order.
pub fn default_signals(sentiment: Arc<dyn SentimentModel>) -> Vec<Box<dyn Signal>> {
    vec![
        Box::new(Freshness::default()),
        Box::new(Virality),
        Box::new(Relevance),
        Box::new(Sentiment::new(sentiment)),
        Box::new(Uniqueness),
    ]
}
