// src/config/mod.rs
//! Engine configuration loaded from TOML, with env overrides.
//!
//! Lookup: `$HOTNESS_CONFIG_PATH`, else `config/hotness.toml`; if neither file
//! exists the built-in defaults are used. Every section is optional.
//! `HOTNESS_THRESHOLD` and `HOTNESS_TOP_N` override the selection section.

pub mod embedding;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::aggregate::Weights;
use crate::error::HotnessError;
use crate::history::{HistoryStore, HistoryWindow, InMemoryHistory, JsonlHistory};
use crate::select::SelectionConfig;
use crate::signals::FallbackPolicy;

pub use embedding::EmbeddingSettings;

// --- env defaults & names ---
pub const DEFAULT_HOTNESS_CONFIG_PATH: &str = "config/hotness.toml";
pub const ENV_HOTNESS_CONFIG_PATH: &str = "HOTNESS_CONFIG_PATH";
pub const ENV_HOTNESS_THRESHOLD: &str = "HOTNESS_THRESHOLD";
pub const ENV_HOTNESS_TOP_N: &str = "HOTNESS_TOP_N";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    #[serde(flatten)]
    pub window: HistoryWindow,
    /// JSON-lines log; in-memory history when absent.
    pub path: Option<PathBuf>,
}

impl HistorySettings {
    pub fn open_store(&self) -> Result<Arc<dyn HistoryStore>, HotnessError> {
        match &self.path {
            Some(p) => Ok(Arc::new(JsonlHistory::open(p)?)),
            None => Ok(Arc::new(InMemoryHistory::default())),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub weights: Weights,
    pub selection: SelectionConfig,
    pub history: HistorySettings,
    pub fallback: FallbackPolicy,
    pub embedding: EmbeddingSettings,
}

impl EngineConfig {
    /// Parse TOML text; no env overrides, no validation.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing hotness config")
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading hotness config from {}", path.display()))?;
        Self::from_toml_str(&raw).with_context(|| format!("in {}", path.display()))
    }

    /// Load using env var + fallbacks, apply env overrides, validate.
    pub fn from_toml() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_HOTNESS_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_HOTNESS_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let default = PathBuf::from(DEFAULT_HOTNESS_CONFIG_PATH);
            if default.exists() {
                Self::load_from(&default)?
            } else {
                Self::default()
            }
        };

        cfg.apply_env_overrides();
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Some(t) = parse_threshold_env(std::env::var(ENV_HOTNESS_THRESHOLD).ok()) {
            self.selection.threshold = t;
        }
        if let Some(n) = parse_top_n_env(std::env::var(ENV_HOTNESS_TOP_N).ok()) {
            self.selection.top_n = n;
        }
    }

    pub fn validate(&self) -> Result<(), HotnessError> {
        self.weights.validate()?;
        self.selection.validate()?;
        self.embedding.validate()?;
        let fb = &self.fallback;
        for (name, v) in [
            ("missing_timestamp_score", fb.missing_timestamp_score),
            ("missing_engagement_score", fb.missing_engagement_score),
            ("unknown_relevance_score", fb.unknown_relevance_score),
            ("unknown_uniqueness_score", fb.unknown_uniqueness_score),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(HotnessError::InvalidConfig(format!(
                    "fallback.{name} must be within [0,1], got {v}"
                )));
            }
        }
        if !(0.0..=1.0).contains(&fb.trend_similarity) {
            return Err(HotnessError::InvalidConfig(format!(
                "fallback.trend_similarity must be within [0,1], got {}",
                fb.trend_similarity
            )));
        }
        Ok(())
    }
}

// parse optional float env and clamp to <0.0..=1.0>
fn parse_threshold_env(raw: Option<String>) -> Option<f64> {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .map(|v| v.clamp(0.0, 1.0))
}

fn parse_top_n_env(raw: Option<String>) -> Option<usize> {
    raw.and_then(|s| s.trim().parse::<usize>().ok())
        .filter(|n| *n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn empty_toml_gives_defaults() {
        let cfg = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.weights, Weights::default());
        assert_eq!(cfg.selection.threshold, 0.4);
        assert_eq!(cfg.selection.top_n, 3);
        assert_eq!(cfg.history.window, HistoryWindow::default());
        assert!(cfg.history.path.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn sections_override_defaults() {
        let raw = r#"
            [weights]
            freshness = 0.2
            virality = 0.2
            relevance = 0.4
            sentiment = 0.1
            uniqueness = 0.1

            [selection]
            top_n = 4

            [history]
            max_age_hours = 24
            path = "data/published.jsonl"

            [embedding]
            provider = "hashing"
            dimension = 64

            [embedding.retry]
            max_attempts = 5
            base_delay_ms = 100
        "#;
        let cfg = EngineConfig::from_toml_str(raw).unwrap();
        assert_eq!(cfg.weights.relevance, 0.4);
        assert_eq!(cfg.selection.top_n, 4);
        assert_eq!(cfg.selection.threshold, 0.4);
        assert_eq!(cfg.history.window.max_age_hours, Some(24));
        assert_eq!(cfg.history.window.max_records, Some(500));
        assert_eq!(
            cfg.history.path.as_deref(),
            Some(Path::new("data/published.jsonl"))
        );
        assert_eq!(cfg.embedding.dimension, Some(64));
        assert_eq!(cfg.embedding.retry.max_attempts, 5);
        assert_eq!(cfg.embedding.retry.max_delay.as_millis(), 2000);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn bad_weights_fail_validation() {
        let raw = r#"
            [weights]
            freshness = 0.2
            virality = 0.25
            relevance = 0.3
            sentiment = 0.1
            uniqueness = 0.1
        "#;
        let cfg = EngineConfig::from_toml_str(raw).unwrap();
        assert!(matches!(
            cfg.validate(),
            Err(HotnessError::InvalidWeightConfiguration(_))
        ));
    }

    #[test]
    fn trend_frequency_mode_is_opt_in() {
        use crate::signals::EngagementFallback;

        let cfg = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.fallback.missing_engagement_mode, EngagementFallback::Constant);

        let raw = r#"
            [fallback]
            missing_engagement_mode = "trend_frequency"
            trend_window_hours = 3
        "#;
        let cfg = EngineConfig::from_toml_str(raw).unwrap();
        assert_eq!(
            cfg.fallback.missing_engagement_mode,
            EngagementFallback::TrendFrequency
        );
        assert_eq!(cfg.fallback.trend_window_hours, 3);
        assert_eq!(cfg.fallback.trend_saturation, 10);
        assert!(cfg.validate().is_ok());

        let bad = EngineConfig::from_toml_str("[fallback]\ntrend_similarity = 1.5").unwrap();
        assert!(matches!(bad.validate(), Err(HotnessError::InvalidConfig(_))));
    }

    #[test]
    fn env_parsers_clamp_and_reject() {
        assert_eq!(parse_threshold_env(Some(" 0.55 ".into())), Some(0.55));
        assert_eq!(parse_threshold_env(Some("7".into())), Some(1.0));
        assert_eq!(parse_threshold_env(Some("abc".into())), None);
        assert_eq!(parse_top_n_env(Some("4".into())), Some(4));
        assert_eq!(parse_top_n_env(Some("0".into())), None);
        assert_eq!(parse_top_n_env(None), None);
    }

    #[serial_test::serial]
    #[test]
    fn from_toml_reads_env_path_and_overrides() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("hotness.toml");
        fs::write(&p, "[selection]\nthreshold = 0.3\ntop_n = 2\n").unwrap();

        env::set_var(ENV_HOTNESS_CONFIG_PATH, p.display().to_string());
        env::set_var(ENV_HOTNESS_TOP_N, "5");
        let cfg = EngineConfig::from_toml().unwrap();
        assert_eq!(cfg.selection.threshold, 0.3);
        assert_eq!(cfg.selection.top_n, 5);

        env::set_var(ENV_HOTNESS_CONFIG_PATH, tmp.path().join("missing.toml"));
        assert!(EngineConfig::from_toml().is_err());

        env::remove_var(ENV_HOTNESS_CONFIG_PATH);
        env::remove_var(ENV_HOTNESS_TOP_N);
    }
}
