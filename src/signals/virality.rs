// src/signals/virality.rs
//! Virality: engagement relative to the most-shared item in the current batch.
//! Items without counters score a constant, or optionally how many similar
//! stories the batch carries right now.

use chrono::Duration;

use super::{EngagementFallback, ItemView, Peer, Signal, SignalContext, SignalScore};
use crate::embedding::cosine_similarity;
use crate::types::{CandidateItem, SignalKind};

/// Largest engagement among the batch; 0 if nobody reports any.
pub fn batch_max_engagement<'a, I>(items: I) -> u64
where
    I: IntoIterator<Item = &'a CandidateItem>,
{
    items
        .into_iter()
        .filter_map(CandidateItem::engagement)
        .max()
        .unwrap_or(0)
}

/// Count of other batch items with cosine >= `ctx.fallback.trend_similarity`
/// published within the trend window before `ctx.now`, over the saturation
/// count, capped at 1. Peers without a timestamp or embedding are ignored.
pub fn trend_frequency(url: &str, embedding: &[f32], ctx: &SignalContext<'_>) -> f64 {
    let fb = ctx.fallback;
    let window = Duration::hours(fb.trend_window_hours.min(24 * 365) as i64);
    let recent = |p: &Peer<'_>| {
        p.published_at
            .is_some_and(|at| ctx.now.signed_duration_since(at) <= window)
    };
    let similar = ctx
        .peers
        .iter()
        .filter(|p| p.url != url && recent(*p))
        .filter_map(|p| p.embedding)
        .filter_map(|e| cosine_similarity(embedding, e))
        .filter(|sim| *sim >= fb.trend_similarity)
        .count();
    (similar as f64 / fb.trend_saturation.max(1) as f64).min(1.0)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Virality;

impl Signal for Virality {
    fn kind(&self) -> SignalKind {
        SignalKind::Virality
    }

    fn score(&self, item: &ItemView<'_>, ctx: &SignalContext<'_>) -> SignalScore {
        match item.item.engagement() {
            Some(n) => SignalScore::exact(n as f64 / ctx.max_engagement.max(1) as f64),
            None => match (ctx.fallback.missing_engagement_mode, item.embedding) {
                (EngagementFallback::TrendFrequency, Some(emb)) => {
                    SignalScore::degraded(trend_frequency(&item.item.url, emb, ctx))
                }
                // absence of data is not evidence of virality
                _ => SignalScore::exact(ctx.fallback.missing_engagement_score),
            },
        }
    }
}
