//! News Hotness Service — Binary Entrypoint
//! Loads config, opens the publication history, builds the engine and serves
//! the scoring API plus `/metrics` on the Shuttle runtime.

use std::sync::Arc;

use anyhow::Context;
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use news_hotness::api::{self, AppState};
use news_hotness::config::EngineConfig;
use news_hotness::engine::HotnessEngine;
use news_hotness::metrics::Metrics;

/// Compact tracing logs; `RUST_LOG` wins over the default filter.
/// No-op when the runtime already installed a subscriber.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hotness=info,warn"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let metrics = Metrics::init()?;

    let config = EngineConfig::from_toml().context("loading hotness config")?;
    let history = config
        .history
        .open_store()
        .context("opening publication history")?;
    let engine = HotnessEngine::from_config(config).context("building hotness engine")?;

    tracing::info!(
        target: "hotness",
        provider = engine.embedder().provider_name(),
        history = history.len(),
        threshold = engine.config().selection.threshold,
        top_n = engine.config().selection.top_n,
        "hotness service starting"
    );

    let state = AppState {
        engine: Arc::new(engine),
        history,
    };
    let router = api::router(state).merge(metrics.router());

    Ok(router.into())
}
