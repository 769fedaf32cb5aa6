//! Maps transport and HTTP outcomes onto [`NeuralexError`].
//!
//! Classification looks only at the status code, the `Retry-After` hint and
//! the body, so the same failure always yields the same error.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::NeuralexError;
use crate::transport::{HttpResponse, TransportFailure};

/// Longest slice of a raw body carried into an error message.
const BODY_SAMPLE_CHARS: usize = 200;

/// 429 and every 5xx are worth another attempt.
pub fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

/// Terminal error for a non-2xx response after `attempts` attempts.
pub(crate) fn classify_response(response: &HttpResponse, attempts: u32) -> NeuralexError {
    let message = extract_message(&response.body, response.status);

    match response.status {
        401 | 403 => NeuralexError::Authentication {
            status: Some(response.status),
            message,
        },
        429 => NeuralexError::RateLimit {
            message,
            retry_after: response.retry_after,
            attempts,
        },
        status => NeuralexError::Api {
            status,
            message,
            attempts,
        },
    }
}

/// Terminal error for an attempt that produced no HTTP response.
pub(crate) fn classify_failure(failure: &TransportFailure, attempts: u32) -> NeuralexError {
    NeuralexError::Transport {
        kind: failure.kind,
        message: failure.message.clone(),
        attempts,
    }
}

/// Pull a human-readable message out of an error body.
///
/// Understands `{"error": {"message": ..}}`, `{"error": ".."}`,
/// `{"detail": ..}` and `{"message": ..}`; anything else falls back to a
/// prefix of the raw body, or the status line when the body is empty.
pub(crate) fn extract_message(body: &str, status: u16) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        let nested = value.pointer("/error/message").and_then(Value::as_str);
        let flat = value.get("error").and_then(Value::as_str);
        if let Some(msg) = nested.or(flat).filter(|m| !m.trim().is_empty()) {
            return msg.trim().to_owned();
        }
        match value.get("detail") {
            Some(Value::String(msg)) if !msg.trim().is_empty() => return msg.trim().to_owned(),
            // Structured validation details are kept verbatim.
            Some(detail @ (Value::Array(_) | Value::Object(_))) => return detail.to_string(),
            _ => {}
        }
        if let Some(msg) = value.get("message").and_then(Value::as_str) {
            if !msg.trim().is_empty() {
                return msg.trim().to_owned();
            }
        }
    }

    let sample: String = body.trim().chars().take(BODY_SAMPLE_CHARS).collect();
    if sample.is_empty() {
        format!("HTTP {status} with empty body")
    } else {
        sample
    }
}

/// Parse a `Retry-After` header value: delta-seconds (fractions accepted) or
/// an HTTP-date. Dates in the past yield a zero wait.
pub(crate) fn parse_retry_after(raw: &str, now: DateTime<Utc>) -> Option<Duration> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(secs) = raw.parse::<f64>() {
        return Duration::try_from_secs_f64(secs).ok();
    }

    let when = DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()?
        .with_timezone(&Utc);
    let wait = when.signed_duration_since(now);
    Some(wait.to_std().unwrap_or(Duration::ZERO))
}
