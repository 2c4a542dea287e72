// src/signals/uniqueness.rs
//! Uniqueness against publication history: `1 - max cosine similarity`.
//!
//! Without an item embedding, titles are compared lexically
//! (normalized Levenshtein) against history records that carry one.

use strsim::normalized_levenshtein;

use super::{ItemView, Signal, SignalContext, SignalScore};
use crate::embedding::cosine_similarity;
use crate::types::{PublishedRecord, SignalKind};

/// Highest cosine similarity to any record of matching dimension.
fn max_semantic_similarity(emb: &[f32], history: &[PublishedRecord]) -> Option<f64> {
    history
        .iter()
        .filter_map(|r| cosine_similarity(emb, &r.embedding))
        .reduce(f64::max)
}

/// Highest title similarity to any record that has a title.
fn max_lexical_similarity(title: &str, history: &[PublishedRecord]) -> Option<f64> {
    let title = title.trim().to_lowercase();
    if title.is_empty() {
        return None;
    }
    history
        .iter()
        .filter_map(|r| r.title.as_deref())
        .map(|t| normalized_levenshtein(&title, &t.trim().to_lowercase()))
        .reduce(f64::max)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Uniqueness;

impl Signal for Uniqueness {
    fn kind(&self) -> SignalKind {
        SignalKind::Uniqueness
    }

    fn score(&self, item: &ItemView<'_>, ctx: &SignalContext<'_>) -> SignalScore {
        if ctx.history.is_empty() {
            return SignalScore::exact(1.0);
        }

        if let Some(emb) = item.embedding {
            if let Some(sim) = max_semantic_similarity(emb, ctx.history) {
                return SignalScore::exact(1.0 - sim.max(0.0));
            }
        }

        match max_lexical_similarity(&item.item.title, ctx.history) {
            Some(sim) => SignalScore::degraded(1.0 - sim),
            None => SignalScore::degraded(ctx.fallback.unknown_uniqueness_score),
        }
    }
}
