// src/signals/freshness.rs
//! Freshness: exponential decay `exp(-hours / 12)`.

use chrono::{DateTime, Utc};

use super::{ItemView, Signal, SignalContext, SignalScore};
use crate::types::SignalKind;

pub const DEFAULT_DECAY_HOURS: f64 = 12.0;

/// Decay for an item published at `published_at`; future timestamps count as age 0.
pub fn freshness_at(published_at: DateTime<Utc>, now: DateTime<Utc>, decay_hours: f64) -> f64 {
    let age_ms = (now - published_at).num_milliseconds().max(0) as f64;
    let hours = age_ms / 3_600_000.0;
    (-hours / decay_hours.max(f64::EPSILON)).exp()
}

#[derive(Debug, Clone, Copy)]
pub struct Freshness {
    pub decay_hours: f64,
}

impl Default for Freshness {
    fn default() -> Self {
        Self {
            decay_hours: DEFAULT_DECAY_HOURS,
        }
    }
}

impl Signal for Freshness {
    fn kind(&self) -> SignalKind {
        SignalKind::Freshness
    }

    fn score(&self, item: &ItemView<'_>, ctx: &SignalContext<'_>) -> SignalScore {
        match item.item.published_at {
            Some(at) => SignalScore::exact(freshness_at(at, ctx.now, self.decay_hours)),
            None => SignalScore::degraded(ctx.fallback.missing_timestamp_score),
        }
    }
}
