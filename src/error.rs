//! Error types surfaced by the NeuraLex client.
//!
//! Every failure of [`embed`](crate::Client::embed) is one of the variants of
//! [`NeuralexError`]. Callers match on the variant (or on [`ErrorKind`]) rather
//! than parsing messages.
//!
//! | Variant | Raised when | Retried before surfacing |
//! |---------|-------------|--------------------------|
//! | [`Authentication`](NeuralexError::Authentication) | HTTP 401/403, missing API key | never |
//! | [`RateLimit`](NeuralexError::RateLimit) | HTTP 429 | yes |
//! | [`Validation`](NeuralexError::Validation) | bad caller input, caught before sending | never |
//! | [`Api`](NeuralexError::Api) | any other non-2xx status | 5xx only |
//! | [`InvalidResponse`](NeuralexError::InvalidResponse) | 2xx with a malformed payload | never |
//! | [`Transport`](NeuralexError::Transport) | no HTTP response at all | yes |
//! | [`Closed`](NeuralexError::Closed) | `embed` after `close()` | never |
use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T, E = NeuralexError> = std::result::Result<T, E>;

/// Errors produced by the NeuraLex client.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum NeuralexError {
    /// The credential was rejected (HTTP 401/403) or never supplied.
    #[error("authentication failed{}: {message}", fmt_status(*status))]
    Authentication {
        status: Option<u16>,
        message: String,
    },
    /// HTTP 429 persisted through every allowed attempt.
    #[error("rate limited after {attempts} attempt(s): {message}")]
    RateLimit {
        message: String,
        /// Last `Retry-After` hint the service sent, if any.
        retry_after: Option<Duration>,
        attempts: u32,
    },
    /// Caller input violates a documented constraint.
    #[error("validation failed: {0}")]
    Validation(String),
    /// Any other non-2xx response.
    #[error("API error (HTTP {status}) after {attempts} attempt(s): {message}")]
    Api {
        status: u16,
        message: String,
        attempts: u32,
    },
    /// A 2xx response whose payload failed validation.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    /// No HTTP response was received.
    #[error("transport error ({kind}) after {attempts} attempt(s): {message}")]
    Transport {
        kind: TransportErrorKind,
        message: String,
        attempts: u32,
    },
    /// The client's connection has already been released.
    #[error("client is closed")]
    Closed,
}

fn fmt_status(status: Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

/// Discriminant of [`NeuralexError`] for coarse matching and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Authentication,
    RateLimit,
    Validation,
    Api,
    InvalidResponse,
    Transport,
    Closed,
}

/// Why a request produced no HTTP response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    /// The attempt or the whole call ran out of time.
    Timeout,
    /// Connection refused, reset, TLS or DNS failure.
    Connect,
    /// Anything else the HTTP stack reported before a status line arrived.
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::Connect => "connect",
            TransportErrorKind::Other => "other",
        };
        f.write_str(label)
    }
}

impl NeuralexError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            NeuralexError::Authentication { .. } => ErrorKind::Authentication,
            NeuralexError::RateLimit { .. } => ErrorKind::RateLimit,
            NeuralexError::Validation(_) => ErrorKind::Validation,
            NeuralexError::Api { .. } => ErrorKind::Api,
            NeuralexError::InvalidResponse(_) => ErrorKind::InvalidResponse,
            NeuralexError::Transport { .. } => ErrorKind::Transport,
            NeuralexError::Closed => ErrorKind::Closed,
        }
    }

    /// HTTP status associated with the failure, when one was received.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            NeuralexError::Authentication { status, .. } => *status,
            NeuralexError::RateLimit { .. } => Some(429),
            NeuralexError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Server-provided wait hint carried by [`RateLimit`](NeuralexError::RateLimit).
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            NeuralexError::RateLimit { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Number of transport attempts made before this error surfaced.
    pub fn attempts(&self) -> u32 {
        match self {
            NeuralexError::RateLimit { attempts, .. }
            | NeuralexError::Api { attempts, .. }
            | NeuralexError::Transport { attempts, .. } => *attempts,
            NeuralexError::Authentication { status: Some(_), .. }
            | NeuralexError::InvalidResponse(_) => 1,
            _ => 0,
        }
    }

    /// Whether issuing the same call again later could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            NeuralexError::RateLimit { .. } | NeuralexError::Transport { .. } => true,
            NeuralexError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        NeuralexError::Validation(msg.into())
    }

    pub(crate) fn invalid_response(msg: impl Into<String>) -> Self {
        NeuralexError::InvalidResponse(msg.into())
    }
}

impl From<serde_json::Error> for NeuralexError {
    fn from(err: serde_json::Error) -> Self {
        NeuralexError::InvalidResponse(format!("malformed JSON payload: {err}"))
    }
}
