// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - POST /score      (report shape, weight validation → 422, bad entries skipped)
// - POST /published  (append → 201, uniqueness feedback, outage → 503)

use std::sync::Arc;

use axum::{
    body::{self, Body},
    Router,
};
use http::{Request, StatusCode};
use serde_json::{json, Value as Json};
use tower::ServiceExt as _; // for `oneshot`

use news_hotness::api::{self, AppState};
use news_hotness::embedding::{DisabledEmbeddingProvider, DynEmbeddingProvider, HashingEmbeddingProvider};
use news_hotness::{EngineConfig, HistoryStore, HotnessEngine, InMemoryHistory};

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

fn test_router_with(provider: DynEmbeddingProvider) -> (Router, Arc<InMemoryHistory>) {
    let engine = HotnessEngine::new(EngineConfig::default(), provider).expect("engine");
    let history = Arc::new(InMemoryHistory::default());
    let state = AppState {
        engine: Arc::new(engine),
        history: history.clone(),
    };
    (api::router(state), history)
}

fn test_router() -> (Router, Arc<InMemoryHistory>) {
    test_router_with(Arc::new(HashingEmbeddingProvider::new(64)))
}

fn post_json(uri: &str, payload: &Json) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build POST")
}

async fn read_json(resp: axum::response::Response) -> Json {
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse json")
}

fn score_payload() -> Json {
    json!({
        "news": [
            {
                "title": "Bicycle theft surges in Berlin",
                "summary": "Insurance claims hit a record.",
                "url": "https://news.example/bike-theft",
                "published_at": "2025-03-01T11:00:00Z",
                "source": "rss",
                "shares": 500
            },
            {
                "title": "Opera season opens",
                "summary": "A quiet premiere.",
                "url": "https://news.example/opera",
                "published_at": "2025-02-27T11:00:00Z",
                "source": "newsapi"
            },
            {
                "title": "",
                "summary": "",
                "url": "https://news.example/blank",
                "source": "twitter"
            }
        ],
        "topic_keywords": ["bicycle", "theft", "insurance"],
        "now": "2025-03-01T12:00:00Z"
    })
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let (app, _) = test_router();
    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .expect("build GET /health");

    let resp = app.oneshot(req).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK, "health should be 200");

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    assert_eq!(String::from_utf8(bytes).expect("utf8").trim(), "OK");
}

#[tokio::test]
async fn api_score_returns_report_with_breakdown() {
    let (app, _) = test_router();
    let resp = app
        .oneshot(post_json("/score", &score_payload()))
        .await
        .expect("oneshot /score");
    assert_eq!(resp.status(), StatusCode::OK);

    let v = read_json(resp).await;
    let scored = v["scored"].as_array().expect("scored array");
    assert_eq!(scored.len(), 2);
    for s in scored {
        let hot = s["hot_score"].as_f64().expect("hot_score");
        assert!((0.0..=1.0).contains(&hot));
        for name in ["freshness", "virality", "relevance", "sentiment", "uniqueness"] {
            assert!(s["signals"].get(name).is_some(), "missing signal {name}");
        }
        assert!(s.get("url").is_some(), "candidate fields are flattened");
    }
    assert_eq!(v["skipped"][0]["reason"], "empty_text");
    assert_eq!(v["skipped"][0]["index"], 2);
    assert_eq!(v["shortlist"][0]["url"], "https://news.example/bike-theft");
}

#[tokio::test]
async fn api_score_rejects_bad_weights_with_422() {
    let (app, _) = test_router();
    let mut payload = score_payload();
    payload["weights"] = json!({
        "freshness": 0.20,
        "virality": 0.25,
        "relevance": 0.30,
        "sentiment": 0.10,
        "uniqueness": 0.10
    });

    let resp = app.oneshot(post_json("/score", &payload)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let v = read_json(resp).await;
    assert!(v["error"]
        .as_str()
        .unwrap_or_default()
        .contains("invalid weight configuration"));
}

#[tokio::test]
async fn api_published_appends_and_lowers_uniqueness() {
    let (app, history) = test_router();

    let confirm = json!({
        "url": "https://news.example/bike-theft",
        "title": "Bicycle theft surges in Berlin",
        "summary": "Insurance claims hit a record.",
        "published_at": "2025-03-01T11:30:00Z"
    });
    let resp = app
        .clone()
        .oneshot(post_json("/published", &confirm))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(history.len(), 1);

    let resp = app
        .oneshot(post_json("/score", &score_payload()))
        .await
        .unwrap();
    let v = read_json(resp).await;
    let u = v["scored"][0]["signals"]["uniqueness"].as_f64().unwrap();
    assert!(u < 1e-6, "same story already published, got {u}");
}

#[tokio::test]
async fn api_published_returns_503_when_embedding_is_unavailable() {
    let (app, history) = test_router_with(Arc::new(DisabledEmbeddingProvider));
    let confirm = json!({
        "url": "https://news.example/x",
        "title": "Some title",
        "summary": "Some summary"
    });
    let resp = app.oneshot(post_json("/published", &confirm)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(history.is_empty());
}

#[tokio::test]
async fn api_published_accepts_precomputed_embedding() {
    let (app, history) = test_router_with(Arc::new(DisabledEmbeddingProvider));
    let confirm = json!({
        "url": "https://news.example/x",
        "title": "Some title",
        "embedding": [0.1, 0.2, 0.3]
    });
    let resp = app.oneshot(post_json("/published", &confirm)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn api_published_rejects_empty_url() {
    let (app, _) = test_router();
    let confirm = json!({ "url": " ", "title": "t" });
    let resp = app.oneshot(post_json("/published", &confirm)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn api_score_skips_bad_entries_and_scores_the_rest() {
    let (app, _) = test_router();
    let payload = json!({
        "news": [
            {
                "title": "Bicycle theft surges in Berlin",
                "summary": "Insurance claims hit a record.",
                "url": "https://news.example/bike-theft",
                "published_at": "2025-03-01T11:00:00Z",
                "source": "rss"
            },
            {
                "title": "Storm warning for the coast",
                "url": "https://news.example/rfc2822",
                "published_at": "Sat, 01 Mar 2025 10:00:00 GMT",
                "source": "Twitter"
            },
            {
                "title": null,
                "summary": "Ferry service suspended.",
                "url": "https://news.example/null-title",
                "published_at": "last tuesday",
                "source": "NEWSAPI"
            },
            { "title": "No source", "url": "https://news.example/no-source" },
            { "title": "Odd source", "url": "https://news.example/odd", "source": "fax" },
            { "title": "Bad counter", "url": "https://news.example/bad-count", "source": "rss", "shares": "lots" }
        ],
        "topic_keywords": ["bicycle", "theft"],
        "now": "2025-03-01T12:00:00Z"
    });

    let resp = app.oneshot(post_json("/score", &payload)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let v = read_json(resp).await;

    let scored: Vec<&str> = v["scored"]
        .as_array()
        .expect("scored array")
        .iter()
        .map(|s| s["url"].as_str().unwrap_or_default())
        .collect();
    assert_eq!(
        scored,
        vec![
            "https://news.example/bike-theft",
            "https://news.example/rfc2822",
            "https://news.example/null-title",
        ]
    );
    assert_eq!(v["scored"][1]["source"], "twitter");
    assert_eq!(v["scored"][1]["published_at"], "2025-03-01T10:00:00Z");
    assert!(v["scored"][2].get("published_at").map_or(true, Json::is_null));

    let skipped = v["skipped"].as_array().expect("skipped array");
    assert_eq!(skipped.len(), 3);
    for (entry, (index, url)) in skipped.iter().zip([
        (3, "https://news.example/no-source"),
        (4, "https://news.example/odd"),
        (5, "https://news.example/bad-count"),
    ]) {
        assert_eq!(entry["index"], index);
        assert_eq!(entry["url"], url);
        assert_eq!(entry["reason"], "invalid_field");
        assert!(entry["detail"].is_string());
    }
}
