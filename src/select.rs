// src/select.rs
//! Top-N selection: threshold filter, deterministic ranking, truncation.
//!
//! Order: `hot_score` desc, then newer `published_at` (missing last), then input order.
//! Never pads the shortlist with below-threshold items.

use serde::Deserialize;
use std::cmp::Ordering;

use crate::error::HotnessError;
use crate::types::ScoredItem;

pub const DEFAULT_THRESHOLD: f64 = 0.4;
pub const DEFAULT_TOP_N: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub threshold: f64,
    pub top_n: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            top_n: DEFAULT_TOP_N,
        }
    }
}

impl SelectionConfig {
    pub fn validate(&self) -> Result<(), HotnessError> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(HotnessError::InvalidConfig(format!(
                "threshold must be within [0,1], got {}",
                self.threshold
            )));
        }
        if self.top_n == 0 {
            return Err(HotnessError::InvalidConfig(
                "top_n must be a positive integer".to_string(),
            ));
        }
        Ok(())
    }
}

fn rank(a: &(usize, &ScoredItem), b: &(usize, &ScoredItem)) -> Ordering {
    b.1.hot_score
        .total_cmp(&a.1.hot_score)
        // Some(newer) > Some(older) > None
        .then_with(|| b.1.item.published_at.cmp(&a.1.item.published_at))
        .then_with(|| a.0.cmp(&b.0))
}

/// Shortlist from `scored`, which must be in input order.
pub fn select_top(scored: &[ScoredItem], cfg: &SelectionConfig) -> Vec<ScoredItem> {
    let mut pool: Vec<(usize, &ScoredItem)> = scored
        .iter()
        .enumerate()
        .filter(|(_, s)| s.hot_score >= cfg.threshold)
        .collect();
    pool.sort_by(rank);
    pool.into_iter()
        .take(cfg.top_n)
        .map(|(_, s)| s.clone())
        .collect()
}
