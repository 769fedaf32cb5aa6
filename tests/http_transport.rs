//! End-to-end tests of the reqwest transports against a local mock server.

use neuralex::{Client, ClientConfig, EmbedOptions, ErrorKind, NeuralexError, RetryConfig};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer) -> ClientConfig {
    ClientConfig::new("nlx_wire_key")
        .with_base_url(server.uri())
        .with_retry(
            RetryConfig::default()
                .with_base_delay(Duration::from_millis(5))
                .with_max_delay(Duration::from_millis(20))
                .with_jitter(false),
        )
}

fn success_body() -> serde_json::Value {
    json!({
        "model": "nlx-embed-1",
        "payload": [
            { "text": "a", "embedding": [0.1, 0.2, 0.3, 0.4], "usage": { "total_tokens": 4 } },
            { "text": "b", "embedding": [0.5, 0.6, 0.7, 0.8], "usage": { "total_tokens": 6 } }
        ],
        "total_usage": { "total_tokens": 10 }
    })
}

#[tokio::test]
async fn posts_json_with_bearer_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embed"))
        .and(header("authorization", "Bearer nlx_wire_key"))
        .and(header("content-type", "application/json"))
        .and(header_exists("x-request-id"))
        .and(body_json(json!({ "input": ["a", "b"], "semantic_weight": 0.5 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = Client::new(config(&server)).unwrap();
    let options = EmbedOptions::new().with_semantic_weight(0.5);
    let response = client.embed(["a", "b"], &options).await.unwrap();

    assert_eq!(response.len(), 2);
    assert_eq!(response.total_usage.total_tokens, 10);
    assert_eq!(response.payload[1].embedding, vec![0.5, 0.6, 0.7, 0.8]);
}

#[tokio::test]
async fn retries_server_errors_then_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = Client::new(config(&server)).unwrap();
    let response = client.embed(["a", "b"], &EmbedOptions::default()).await.unwrap();
    assert_eq!(response.model, "nlx-embed-1");
}

#[tokio::test]
async fn retry_after_header_is_honored() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "0")
                .set_body_json(json!({ "error": "rate limited" })),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
        .mount(&server)
        .await;

    let client = Client::new(config(&server)).unwrap();
    assert!(client.embed(["a", "b"], &EmbedOptions::default()).await.is_ok());
}

#[tokio::test]
async fn long_retry_after_surfaces_rate_limit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "3600")
                .set_body_json(json!({ "error": { "message": "quota exhausted" } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = Client::new(config(&server)).unwrap();
    let err = client.embed("a", &EmbedOptions::default()).await.unwrap_err();

    assert_eq!(
        err,
        NeuralexError::RateLimit {
            message: "quota exhausted".into(),
            retry_after: Some(Duration::from_secs(3600)),
            attempts: 1,
        }
    );
}

#[tokio::test]
async fn unauthorized_is_a_single_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "detail": "Invalid API key" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = Client::new(config(&server)).unwrap();
    let err = client.embed("a", &EmbedOptions::default()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authentication);
    assert!(err.to_string().contains("Invalid API key"));
}

#[tokio::test]
async fn slow_server_hits_the_attempt_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(success_body())
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let cfg = config(&server)
        .with_attempt_timeout(Some(Duration::from_millis(100)))
        .with_retry(RetryConfig::disabled());
    let client = Client::new(cfg).unwrap();
    let err = client.embed(["a", "b"], &EmbedOptions::default()).await.unwrap_err();

    assert!(matches!(
        err,
        NeuralexError::Transport {
            kind: neuralex::TransportErrorKind::Timeout,
            attempts: 1,
            ..
        }
    ));
}

#[cfg(feature = "blocking")]
#[tokio::test(flavor = "multi_thread")]
async fn blocking_transport_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embed"))
        .and(header("authorization", "Bearer nlx_wire_key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
        .expect(1)
        .mount(&server)
        .await;

    let cfg = config(&server);
    // The blocking client owns a runtime of its own and must live off the async threads.
    let response = tokio::task::spawn_blocking(move || {
        let client = neuralex::blocking::Client::new(cfg)?;
        client.embed(["a", "b"], &EmbedOptions::default())
    })
    .await
    .unwrap()
    .unwrap();

    assert_eq!(response.len(), 2);
}
