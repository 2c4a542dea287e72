// src/aggregate.rs
//! Weighted aggregation of the five signals into one hotness score.
//!
//! Weights are configuration. They must be finite, non-negative and sum to 1.0
//! (within [`WEIGHT_SUM_EPSILON`]), which makes the hot score a convex
//! combination and keeps it in [0,1].

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::error::HotnessError;
use crate::signals::clamp01;
use crate::types::SignalKind;

pub const WEIGHT_SUM_EPSILON: f64 = 1e-3;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Weights {
    pub freshness: f64,
    pub virality: f64,
    pub relevance: f64,
    pub sentiment: f64,
    pub uniqueness: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            freshness: 0.25,
            virality: 0.25,
            relevance: 0.30,
            sentiment: 0.10,
            uniqueness: 0.10,
        }
    }
}

impl Weights {
    /// Build from a name → weight mapping. Every signal must be present exactly once.
    pub fn from_map(map: &HashMap<String, f64>) -> Result<Self, HotnessError> {
        let mut parsed: BTreeMap<SignalKind, f64> = BTreeMap::new();
        for (name, &w) in map {
            let kind = SignalKind::parse(name).ok_or_else(|| {
                HotnessError::InvalidWeightConfiguration(format!("unknown signal '{name}'"))
            })?;
            if parsed.insert(kind, w).is_some() {
                return Err(HotnessError::InvalidWeightConfiguration(format!(
                    "signal '{kind}' given more than once"
                )));
            }
        }
        let get = |k: SignalKind| {
            parsed.get(&k).copied().ok_or_else(|| {
                HotnessError::InvalidWeightConfiguration(format!("missing weight for '{k}'"))
            })
        };
        let w = Self {
            freshness: get(SignalKind::Freshness)?,
            virality: get(SignalKind::Virality)?,
            relevance: get(SignalKind::Relevance)?,
            sentiment: get(SignalKind::Sentiment)?,
            uniqueness: get(SignalKind::Uniqueness)?,
        };
        w.validate()?;
        Ok(w)
    }

    pub fn get(&self, kind: SignalKind) -> f64 {
        match kind {
            SignalKind::Freshness => self.freshness,
            SignalKind::Virality => self.virality,
            SignalKind::Relevance => self.relevance,
            SignalKind::Sentiment => self.sentiment,
            SignalKind::Uniqueness => self.uniqueness,
        }
    }

    pub fn sum(&self) -> f64 {
        SignalKind::ALL.iter().map(|k| self.get(*k)).sum()
    }

    pub fn validate(&self) -> Result<(), HotnessError> {
        for kind in SignalKind::ALL {
            let w = self.get(kind);
            if !w.is_finite() || w < 0.0 {
                return Err(HotnessError::InvalidWeightConfiguration(format!(
                    "weight for '{kind}' must be a finite non-negative number, got {w}"
                )));
            }
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_EPSILON {
            return Err(HotnessError::InvalidWeightConfiguration(format!(
                "weights must sum to 1.0 (±{WEIGHT_SUM_EPSILON}), got {sum:.4}"
            )));
        }
        Ok(())
    }

    /// `Σ weight_i * signal_i`; missing signals count as 0.
    pub fn hot_score(&self, signals: &BTreeMap<SignalKind, f64>) -> f64 {
        let raw: f64 = SignalKind::ALL
            .iter()
            .map(|k| self.get(*k) * clamp01(signals.get(k).copied().unwrap_or(0.0)))
            .sum();
        clamp01(raw)
    }
}
