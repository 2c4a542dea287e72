use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::aggregate::Weights;
use crate::engine::{HotnessEngine, RunOverrides, RunReport};
use crate::error::HotnessError;
use crate::history::HistoryStore;
use crate::text::normalize_text;
use crate::types::{PublishedRecord, TopicProfile};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<HotnessEngine>,
    pub history: Arc<dyn HistoryStore>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/score", post(score))
        .route("/published", post(published))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Maps engine errors onto HTTP statuses with a `{ "error": ... }` body.
#[derive(Debug)]
pub enum ApiError {
    Engine(HotnessError),
    Unprocessable(String),
}

impl From<HotnessError> for ApiError {
    fn from(e: HotnessError) -> Self {
        ApiError::Engine(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            ApiError::Engine(e) => {
                let status = match &e {
                    HotnessError::InvalidWeightConfiguration(_)
                    | HotnessError::InvalidConfig(_) => StatusCode::UNPROCESSABLE_ENTITY,
                    HotnessError::EmbeddingUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
                    HotnessError::History(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, e.to_string())
            }
            ApiError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
        };
        if status.is_server_error() {
            tracing::warn!(target: "hotness", status = status.as_u16(), error = %msg, "request failed");
        }
        (status, Json(json!({ "error": msg }))).into_response()
    }
}

#[derive(Deserialize)]
struct ScoreReq {
    /// Decoded per entry; a bad entry is skipped, not a request error.
    news: Vec<serde_json::Value>,
    #[serde(default)]
    topic_keywords: Vec<String>,
    #[serde(default)]
    topic_embedding: Option<Vec<f32>>,
    #[serde(default)]
    top_n: Option<usize>,
    #[serde(default)]
    threshold: Option<f64>,
    /// signal name -> weight; all five required
    #[serde(default)]
    weights: Option<HashMap<String, f64>>,
    /// Evaluation time; defaults to "now". Fixed values make runs reproducible.
    #[serde(default)]
    now: Option<DateTime<Utc>>,
}

async fn score(
    State(state): State<AppState>,
    Json(body): Json<ScoreReq>,
) -> Result<Json<RunReport>, ApiError> {
    let weights = body.weights.as_ref().map(Weights::from_map).transpose()?;
    let overrides = RunOverrides {
        weights,
        threshold: body.threshold,
        top_n: body.top_n,
    };
    let topic = TopicProfile {
        keywords: body.topic_keywords,
        topic_embedding: body.topic_embedding,
    };
    let now = body.now.unwrap_or_else(Utc::now);

    let report = state
        .engine
        .run_json_with_store(&body.news, &topic, state.history.as_ref(), &overrides, now)
        .await?;
    Ok(Json(report))
}

#[derive(Deserialize)]
struct PublishedReq {
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    embedding: Option<Vec<f32>>,
}

/// Publish confirmation: the only path that appends to history.
async fn published(
    State(state): State<AppState>,
    Json(body): Json<PublishedReq>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let url = body.url.trim().to_string();
    if url.is_empty() {
        return Err(ApiError::Unprocessable("url must not be empty".to_string()));
    }

    let embedding = match body.embedding {
        Some(v) => v,
        None => {
            let text = normalize_text(&format!("{} {}", body.title, body.summary));
            if text.is_empty() {
                return Err(ApiError::Unprocessable(
                    "title/summary or embedding required".to_string(),
                ));
            }
            state.engine.embedder().embed(&text).await?
        }
    };

    let title = body.title.trim();
    let record = PublishedRecord {
        url: url.clone(),
        embedding,
        published_at: body.published_at.unwrap_or_else(Utc::now),
        title: (!title.is_empty()).then(|| title.to_string()),
    };
    state.history.append(record).map_err(|e| match e {
        // bad embeddings are the caller's fault
        HotnessError::History(msg) if msg.contains("embedding") => ApiError::Unprocessable(msg),
        other => ApiError::Engine(other),
    })?;

    tracing::info!(target: "hotness", url = %url, history = state.history.len(), "published record appended");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "url": url, "history_len": state.history.len() })),
    ))
}
