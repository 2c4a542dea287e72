//! OpenAI-compatible embedding provider against a local `wiremock` server:
//! request shape, retry on transient failures, and the unavailable path.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use news_hotness::embedding::{Embedder, EmbeddingProvider, OpenAiEmbeddingProvider, RetryPolicy};
use news_hotness::{EmbeddingError, HotnessError};

fn provider(server: &MockServer) -> OpenAiEmbeddingProvider {
    OpenAiEmbeddingProvider::new(
        &format!("{}/v1", server.uri()),
        "test-key",
        "text-embedding-3-small",
        Duration::from_secs(5),
    )
    .expect("build provider")
}

fn embedding_body(v: &[f32]) -> serde_json::Value {
    json!({ "data": [{ "embedding": v, "index": 0 }], "model": "text-embedding-3-small" })
}

#[tokio::test]
async fn posts_model_and_input_with_bearer_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "text-embedding-3-small",
            "input": "bike theft"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(embedding_body(&[0.1, 0.2, 0.3])))
        .expect(1)
        .mount(&server)
        .await;

    let v = provider(&server).embed("bike theft").await.expect("embed ok");
    assert_eq!(v, vec![0.1, 0.2, 0.3]);
}

#[tokio::test]
async fn status_codes_surface_as_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let err = provider(&server).embed("x").await.unwrap_err();
    assert_eq!(err, EmbeddingError::Status(429));
    assert!(err.is_retriable());
}

#[tokio::test]
async fn retries_after_server_error_then_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(embedding_body(&[1.0, 0.0])))
        .mount(&server)
        .await;

    let embedder = Embedder::new(Arc::new(provider(&server)), RetryPolicy::immediate(3));
    let v = embedder.embed("flood warning").await.expect("second attempt succeeds");
    assert_eq!(v, vec![1.0, 0.0]);

    let requests = server.received_requests().await.unwrap_or_default();
    assert_eq!(requests.len(), 2);
}

#[tokio::test]
async fn exhausted_retries_are_embedding_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let embedder = Embedder::new(Arc::new(provider(&server)), RetryPolicy::immediate(3));
    let err = embedder.embed("storm").await.unwrap_err();
    assert!(
        matches!(err, HotnessError::EmbeddingUnavailable { .. }),
        "got {err:?}"
    );

    let requests = server.received_requests().await.unwrap_or_default();
    assert_eq!(requests.len(), 3, "three attempts, then give up");
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let embedder = Embedder::new(Arc::new(provider(&server)), RetryPolicy::immediate(3));
    assert!(embedder.embed("storm").await.is_err());
    let requests = server.received_requests().await.unwrap_or_default();
    assert_eq!(requests.len(), 1);
}

#[tokio::test]
async fn empty_data_array_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .mount(&server)
        .await;

    let err = provider(&server).embed("x").await.unwrap_err();
    assert!(matches!(err, EmbeddingError::Malformed(_)));
}

#[tokio::test]
async fn undecodable_body_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let err = provider(&server).embed("x").await.unwrap_err();
    assert!(matches!(err, EmbeddingError::Malformed(_)), "got {err:?}");
    assert!(!err.is_retriable());
}

#[tokio::test]
async fn slow_responses_time_out_and_are_retriable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(embedding_body(&[1.0]))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let impatient = OpenAiEmbeddingProvider::new(
        &format!("{}/v1", server.uri()),
        "test-key",
        "text-embedding-3-small",
        Duration::from_millis(200),
    )
    .expect("build provider");
    let err = impatient.embed("x").await.unwrap_err();
    assert_eq!(err, EmbeddingError::Timeout);
    assert!(err.is_retriable());
}
