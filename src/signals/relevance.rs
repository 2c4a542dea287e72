// src/signals/relevance.rs
//! Relevance to the topic: rescaled cosine similarity, with a keyword-overlap
//! fallback when embeddings are unavailable.

use super::{ItemView, Signal, SignalContext, SignalScore};
use crate::embedding::cosine_similarity;
use crate::types::SignalKind;

/// Fraction of keywords found in `text` (case-insensitive substring match).
/// Blank keywords are ignored; no keywords means 0.
pub fn keyword_overlap(text: &str, keywords: &[&str]) -> f64 {
    if keywords.is_empty() {
        return 0.0;
    }
    let hay = text.to_lowercase();
    let hits = keywords
        .iter()
        .filter(|k| hay.contains(&k.to_lowercase()))
        .count();
    hits as f64 / keywords.len() as f64
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Relevance;

impl Signal for Relevance {
    fn kind(&self) -> SignalKind {
        SignalKind::Relevance
    }

    fn score(&self, item: &ItemView<'_>, ctx: &SignalContext<'_>) -> SignalScore {
        if let (Some(emb), Some(topic)) = (item.embedding, ctx.topic_embedding) {
            if let Some(cos) = cosine_similarity(emb, topic) {
                return SignalScore::exact((cos + 1.0) / 2.0);
            }
        }

        let keywords = ctx.topic.clean_keywords();
        if keywords.is_empty() {
            return SignalScore::degraded(ctx.fallback.unknown_relevance_score);
        }
        SignalScore::degraded(keyword_overlap(item.text, &keywords))
    }
}
