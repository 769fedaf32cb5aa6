//! Scripted transports and payload builders shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use neuralex::{
    AsyncTransport, BlockingTransport, ClientConfig, HttpRequest, HttpResponse, RetryConfig,
    TransportErrorKind, TransportFailure,
};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;

pub type Outcome = Result<HttpResponse, TransportFailure>;

/// One scripted reply, optionally delivered after a delay.
pub struct Reply {
    pub delay: Option<Duration>,
    pub outcome: Outcome,
}

impl Reply {
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self {
            delay: None,
            outcome: Ok(HttpResponse::new(status, body)),
        }
    }

    pub fn ok(body: Value) -> Self {
        Self::status(200, body.to_string())
    }

    pub fn error(status: u16, message: &str) -> Self {
        Self::status(status, json!({ "error": { "message": message } }).to_string())
    }

    pub fn failure(kind: TransportErrorKind, message: &str) -> Self {
        Self {
            delay: None,
            outcome: Err(TransportFailure::new(kind, message)),
        }
    }

    pub fn retry_after(mut self, hint: Duration) -> Self {
        if let Ok(response) = &mut self.outcome {
            response.retry_after = Some(hint);
        }
        self
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

type Handler = Box<dyn Fn(&HttpRequest) -> Reply + Send + Sync>;

/// Mock transport that records every call and answers through a handler.
pub struct MockTransport {
    handler: Handler,
    calls: AtomicUsize,
    log: Mutex<Vec<(Instant, HttpRequest)>>,
}

impl MockTransport {
    pub fn new(handler: impl Fn(&HttpRequest) -> Reply + Send + Sync + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            calls: AtomicUsize::new(0),
            log: Mutex::new(Vec::new()),
        }
    }

    /// Replays `replies` in order, then answers 500.
    pub fn scripted(replies: Vec<Reply>) -> Self {
        let queue = Mutex::new(VecDeque::from(replies));
        Self::new(move |_| {
            queue
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Reply::error(500, "script exhausted"))
        })
    }

    /// Answers every request with a well-formed echo of its inputs.
    pub fn echo() -> Self {
        Self::new(|request| Reply::ok(echo_body(request)))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.log.lock().unwrap().iter().map(|(_, r)| r.clone()).collect()
    }

    /// Gaps between consecutive calls.
    pub fn gaps(&self) -> Vec<Duration> {
        let log = self.log.lock().unwrap();
        log.windows(2).map(|w| w[1].0 - w[0].0).collect()
    }

    fn record(&self, request: &HttpRequest) -> Reply {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.log
            .lock()
            .unwrap()
            .push((Instant::now(), request.clone()));
        (self.handler)(request)
    }
}

#[async_trait]
impl AsyncTransport for MockTransport {
    async fn send(&self, request: &HttpRequest, _timeout: Option<Duration>) -> Outcome {
        let reply = self.record(request);
        if let Some(delay) = reply.delay {
            tokio::time::sleep(delay).await;
        }
        reply.outcome
    }
}

impl BlockingTransport for MockTransport {
    fn send(&self, request: &HttpRequest, _timeout: Option<Duration>) -> Outcome {
        let reply = self.record(request);
        if let Some(delay) = reply.delay {
            std::thread::sleep(delay);
        }
        reply.outcome
    }
}

/// Config with fast, deterministic retries.
pub fn config() -> ClientConfig {
    ClientConfig::new("nlx_test_key").with_retry(
        RetryConfig::default()
            .with_max_attempts(3)
            .with_base_delay(Duration::from_millis(10))
            .with_max_delay(Duration::from_millis(200))
            .with_jitter(false),
    )
}

/// Inputs of a request, in request order.
pub fn request_texts(request: &HttpRequest) -> Vec<String> {
    let body: Value = serde_json::from_str(&request.body).unwrap();
    match &body["input"] {
        Value::String(text) => vec![text.clone()],
        Value::Array(items) => items
            .iter()
            .map(|v| v.as_str().unwrap().to_owned())
            .collect(),
        other => panic!("unexpected input field: {other}"),
    }
}

/// Deterministic 4-dimensional vector for `text`.
pub fn vector_for(text: &str) -> Vec<f32> {
    let len = text.chars().count() as f32;
    vec![len, 1.0, 0.5, -len]
}

/// Response body with one item per `(text, embedding, total_tokens)`.
pub fn body(model: &str, items: &[(&str, Vec<f32>, u64)]) -> Value {
    let total: u64 = items.iter().map(|(_, _, t)| t).sum();
    json!({
        "model": model,
        "payload": items
            .iter()
            .map(|(text, embedding, tokens)| json!({
                "text": text,
                "embedding": embedding,
                "usage": { "total_tokens": tokens }
            }))
            .collect::<Vec<_>>(),
        "total_usage": { "total_tokens": total }
    })
}

pub fn echo_body(request: &HttpRequest) -> Value {
    let texts = request_texts(request);
    let items: Vec<(&str, Vec<f32>, u64)> = texts
        .iter()
        .map(|t| (t.as_str(), vector_for(t), t.split_whitespace().count() as u64))
        .collect();
    body("nlx-embed-1", &items)
}
