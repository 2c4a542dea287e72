// src/metrics.rs
use anyhow::{Context, Result};
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub const ITEMS_SCORED_TOTAL: &str = "hotness_items_scored_total";
pub const ITEMS_SKIPPED_TOTAL: &str = "hotness_items_skipped_total";
pub const EMBEDDING_FAILURES_TOTAL: &str = "hotness_embedding_failures_total";
pub const DEGRADED_SIGNALS_TOTAL: &str = "hotness_degraded_signals_total";
pub const SHORTLIST_SIZE: &str = "hotness_shortlist_size";
pub const RUN_MS: &str = "hotness_run_ms";
pub const LAST_RUN_TS: &str = "hotness_last_run_ts";

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(ITEMS_SCORED_TOTAL, "Candidates scored across all runs.");
        describe_counter!(
            ITEMS_SKIPPED_TOTAL,
            "Candidates excluded as malformed (missing/duplicate url, empty text)."
        );
        describe_counter!(
            EMBEDDING_FAILURES_TOTAL,
            "Texts whose embedding stayed unavailable after retries."
        );
        describe_counter!(
            DEGRADED_SIGNALS_TOTAL,
            "Signal values produced by a fallback heuristic."
        );
        describe_gauge!(SHORTLIST_SIZE, "Shortlist length of the last run.");
        describe_histogram!(RUN_MS, "Wall time of one scoring run in milliseconds.");
        describe_gauge!(LAST_RUN_TS, "Unix ts when the engine last ran.");
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder. Call once, before the first run.
    pub fn init() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;

        ensure_metrics_described();
        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
