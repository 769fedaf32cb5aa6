//! Transport seam and the two retry executors.
//!
//! [`AsyncTransport`] and [`BlockingTransport`] are the only places that touch
//! the network. [`execute_async`] and [`execute_blocking`] run the same loop
//! around [`crate::retry::decide`]; they differ only in how they wait.

use async_trait::async_trait;
use reqwest::Method;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config::ApiKey;
use crate::error::{NeuralexError, Result, TransportErrorKind};
use crate::request::RequestDescriptor;
use crate::retry::{Decision, RetryConfig, decide};

pub mod http;

/// A fully formed HTTP request, credential included.
#[derive(Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpRequest {
    /// Attach the bearer credential to `descriptor`.
    pub fn authorized(descriptor: &RequestDescriptor, api_key: &ApiKey) -> Self {
        let mut headers = descriptor.headers.clone();
        headers.push((
            "authorization".to_owned(),
            format!("Bearer {}", api_key.expose()),
        ));
        Self {
            method: descriptor.method.clone(),
            url: descriptor.url.clone(),
            headers,
            body: descriptor.body.to_string(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: Vec<(&str, &str)> = self
            .headers
            .iter()
            .map(|(k, v)| {
                if k.eq_ignore_ascii_case("authorization") {
                    (k.as_str(), "Bearer ***")
                } else {
                    (k.as_str(), v.as_str())
                }
            })
            .collect();
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &headers)
            .field("body_len", &self.body.len())
            .finish()
    }
}

/// What came back from the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Parsed `Retry-After` header, if any.
    pub retry_after: Option<Duration>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            retry_after: None,
            body: body.into(),
        }
    }

    pub fn with_retry_after(mut self, hint: Duration) -> Self {
        self.retry_after = Some(hint);
        self
    }
}

/// An attempt that ended without an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFailure {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportFailure {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Non-blocking transport. Must tolerate concurrent `send` calls.
#[async_trait]
pub trait AsyncTransport: Send + Sync + 'static {
    /// Send one request. `timeout` bounds this attempt only.
    async fn send(
        &self,
        request: &HttpRequest,
        timeout: Option<Duration>,
    ) -> std::result::Result<HttpResponse, TransportFailure>;
}

/// Thread-blocking transport. Must tolerate concurrent `send` calls.
pub trait BlockingTransport: Send + Sync + 'static {
    /// Send one request. `timeout` bounds this attempt only.
    fn send(
        &self,
        request: &HttpRequest,
        timeout: Option<Duration>,
    ) -> std::result::Result<HttpResponse, TransportFailure>;
}

#[async_trait]
impl<T: AsyncTransport + ?Sized> AsyncTransport for Arc<T> {
    async fn send(
        &self,
        request: &HttpRequest,
        timeout: Option<Duration>,
    ) -> std::result::Result<HttpResponse, TransportFailure> {
        (**self).send(request, timeout).await
    }
}

impl<T: BlockingTransport + ?Sized> BlockingTransport for Arc<T> {
    fn send(
        &self,
        request: &HttpRequest,
        timeout: Option<Duration>,
    ) -> std::result::Result<HttpResponse, TransportFailure> {
        (**self).send(request, timeout)
    }
}

/// Limits an executor works within.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CallBudget {
    /// Deadline for the whole call.
    pub deadline: Duration,
    /// Optional cap on a single attempt.
    pub attempt_timeout: Option<Duration>,
}

impl CallBudget {
    fn attempt_timeout(&self, remaining: Duration) -> Duration {
        self.attempt_timeout.map_or(remaining, |cap| cap.min(remaining))
    }
}

fn deadline_error(budget: &CallBudget, attempts: u32, last_cause: Option<&str>) -> NeuralexError {
    let mut message = format!(
        "deadline of {:?} exhausted after {attempts} attempt(s)",
        budget.deadline
    );
    if let Some(cause) = last_cause {
        message.push_str("; last failure: ");
        message.push_str(cause);
    }
    NeuralexError::Transport {
        kind: TransportErrorKind::Timeout,
        message,
        attempts,
    }
}

/// Run the retry loop on the current task. Backoff waits suspend the task.
///
/// The whole loop runs under `tokio::time::timeout`, so the deadline cancels
/// an in-flight send or a pending backoff alike.
pub(crate) async fn execute_async<T>(
    transport: &T,
    request: &HttpRequest,
    policy: &RetryConfig,
    budget: CallBudget,
) -> Result<String>
where
    T: AsyncTransport + ?Sized,
{
    let started = tokio::time::Instant::now();
    let attempts = AtomicU32::new(0);

    let run = async {
        loop {
            let attempt = attempts.fetch_add(1, Ordering::Relaxed) + 1;
            let remaining = budget.deadline.saturating_sub(started.elapsed());
            debug!(attempt, "sending embed request");

            let outcome = transport
                .send(request, Some(budget.attempt_timeout(remaining)))
                .await;

            match decide(policy, attempt, outcome) {
                Decision::Complete(body) => return Ok(body),
                Decision::Fail(err) => return Err(err),
                Decision::Retry { delay, cause } => {
                    let remaining = budget.deadline.saturating_sub(started.elapsed());
                    if delay >= remaining {
                        return Err(deadline_error(&budget, attempt, Some(&cause)));
                    }
                    warn!(attempt, cause = %cause, ?delay, "retrying embed request");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    };

    match tokio::time::timeout(budget.deadline, run).await {
        Ok(result) => result,
        Err(_) => Err(deadline_error(
            &budget,
            attempts.load(Ordering::Relaxed),
            None,
        )),
    }
}

/// Run the retry loop on the calling thread. Backoff waits block the thread.
pub(crate) fn execute_blocking<T>(
    transport: &T,
    request: &HttpRequest,
    policy: &RetryConfig,
    budget: CallBudget,
) -> Result<String>
where
    T: BlockingTransport + ?Sized,
{
    let started = Instant::now();
    let mut attempt = 0;
    let mut last_cause: Option<String> = None;

    loop {
        let remaining = budget.deadline.saturating_sub(started.elapsed());
        if remaining.is_zero() {
            return Err(deadline_error(&budget, attempt, last_cause.as_deref()));
        }

        attempt += 1;
        debug!(attempt, "sending embed request");
        let outcome = transport.send(request, Some(budget.attempt_timeout(remaining)));

        match decide(policy, attempt, outcome) {
            Decision::Complete(body) => return Ok(body),
            Decision::Fail(err) => return Err(err),
            Decision::Retry { delay, cause } => {
                let remaining = budget.deadline.saturating_sub(started.elapsed());
                if delay >= remaining {
                    return Err(deadline_error(&budget, attempt, Some(&cause)));
                }
                warn!(attempt, cause = %cause, ?delay, "retrying embed request");
                last_cause = Some(cause);
                std::thread::sleep(delay);
            }
        }
    }
}
