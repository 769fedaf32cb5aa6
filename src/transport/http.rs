//! `reqwest`-backed transports.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use std::time::Duration;

use super::{AsyncTransport, HttpRequest, HttpResponse, TransportFailure};
use crate::classify::parse_retry_after;
use crate::config::{ClientConfig, MAX_TIMEOUT};
use crate::error::{NeuralexError, Result, TransportErrorKind};

fn failure_from_reqwest(err: &reqwest::Error) -> TransportFailure {
    let kind = if err.is_timeout() {
        TransportErrorKind::Timeout
    } else if err.is_connect() {
        TransportErrorKind::Connect
    } else {
        TransportErrorKind::Other
    };
    TransportFailure::new(kind, err.to_string())
}

fn build_error(err: reqwest::Error) -> NeuralexError {
    NeuralexError::Transport {
        kind: TransportErrorKind::Other,
        message: format!("cannot build HTTP client: {err}"),
        attempts: 0,
    }
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| parse_retry_after(raw, Utc::now()))
}

/// Async transport over a pooled [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a client with the connect timeout from `config`. Per-attempt
    /// timeouts are set on each request.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(32)
            .build()
            .map_err(build_error)?;
        Ok(Self { client })
    }

    /// Reuse an existing client, e.g. one shared with the rest of an application.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AsyncTransport for HttpTransport {
    async fn send(
        &self,
        request: &HttpRequest,
        timeout: Option<Duration>,
    ) -> std::result::Result<HttpResponse, TransportFailure> {
        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .body(request.body.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout.min(MAX_TIMEOUT));
        }

        let response = builder.send().await.map_err(|e| failure_from_reqwest(&e))?;
        let status = response.status().as_u16();
        let retry_after = retry_after(response.headers());
        let body = response.text().await.map_err(|e| failure_from_reqwest(&e))?;

        Ok(HttpResponse {
            status,
            retry_after,
            body,
        })
    }
}

#[cfg(feature = "blocking")]
pub use self::blocking::BlockingHttpTransport;

#[cfg(feature = "blocking")]
mod blocking {
    use super::*;
    use crate::transport::BlockingTransport;

    /// Thread-blocking transport over [`reqwest::blocking::Client`].
    ///
    /// Must not be created or dropped inside an async runtime.
    #[derive(Debug, Clone)]
    pub struct BlockingHttpTransport {
        client: reqwest::blocking::Client,
    }

    impl BlockingHttpTransport {
        pub fn new(config: &ClientConfig) -> Result<Self> {
            let client = reqwest::blocking::Client::builder()
                .timeout(None::<Duration>)
                .connect_timeout(config.connect_timeout)
                .pool_max_idle_per_host(32)
                .build()
                .map_err(build_error)?;
            Ok(Self { client })
        }

        pub fn from_client(client: reqwest::blocking::Client) -> Self {
            Self { client }
        }
    }

    impl BlockingTransport for BlockingHttpTransport {
        fn send(
            &self,
            request: &HttpRequest,
            timeout: Option<Duration>,
        ) -> std::result::Result<HttpResponse, TransportFailure> {
            let mut builder = self
                .client
                .request(request.method.clone(), &request.url)
                .body(request.body.clone());
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            // reqwest adds the timeout to `Instant::now()`.
            if let Some(timeout) = timeout {
                builder = builder.timeout(timeout.min(MAX_TIMEOUT));
            }

            let response = builder.send().map_err(|e| failure_from_reqwest(&e))?;
            let status = response.status().as_u16();
            let retry_after = retry_after(response.headers());
            let body = response.text().map_err(|e| failure_from_reqwest(&e))?;

            Ok(HttpResponse {
                status,
                retry_after,
                body,
            })
        }
    }
}
