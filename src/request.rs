//! Request construction.
//!
//! Turns validated inputs plus configuration into a transport-agnostic
//! [`RequestDescriptor`]. The credential is attached later, by the executor.

use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use crate::config::{ClientConfig, MAX_TIMEOUT};
use crate::error::{NeuralexError, Result};
use crate::normalize::NormalizedInput;
use crate::types::EmbedOptions;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Everything needed to issue one embedding request, minus authentication.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub method: Method,
    /// Endpoint path as configured, e.g. `/v1/embed`.
    pub path: String,
    /// Absolute URL: base URL joined with `path`.
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Value,
    /// Random per-request id, also sent as `x-request-id`.
    pub request_id: String,
    /// Deadline for the whole call.
    pub timeout: Duration,
}

#[derive(Serialize)]
struct EmbedPayload<'a> {
    input: InputField<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    semantic_weight: Option<f64>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum InputField<'a> {
    One(&'a str),
    Many(&'a [String]),
}

/// Build the descriptor for `input`, resolving per-call `options` against
/// `config`.
///
/// Fails with [`NeuralexError::Validation`] when the semantic weight is not a
/// finite number in `[0.0, 1.0]`, the model name is blank, or the timeout is
/// zero or above [`MAX_TIMEOUT`]. `config` is never modified.
pub fn build_request(
    input: &NormalizedInput,
    config: &ClientConfig,
    options: &EmbedOptions,
) -> Result<RequestDescriptor> {
    if let Some(weight) = options.semantic_weight {
        if !weight.is_finite() || !(0.0..=1.0).contains(&weight) {
            return Err(NeuralexError::validation(format!(
                "semantic_weight must be within [0.0, 1.0], got {weight}"
            )));
        }
    }

    let model = options
        .model
        .as_deref()
        .or(config.default_model.as_deref());
    if model.is_some_and(|m| m.trim().is_empty()) {
        return Err(NeuralexError::validation("model name must not be blank"));
    }

    let timeout = options.timeout.unwrap_or(config.timeout);
    if timeout.is_zero() {
        return Err(NeuralexError::validation("timeout must be greater than zero"));
    }
    if timeout > MAX_TIMEOUT {
        return Err(NeuralexError::validation(format!(
            "timeout of {timeout:?} exceeds the limit of {MAX_TIMEOUT:?}"
        )));
    }

    let input_field = match input.texts() {
        [only] if input.is_single() => InputField::One(only),
        texts => InputField::Many(texts),
    };
    let body = serde_json::to_value(EmbedPayload {
        input: input_field,
        model,
        semantic_weight: options.semantic_weight,
    })
    .map_err(|e| NeuralexError::validation(format!("cannot encode request: {e}")))?;

    let request_id = uuid::Uuid::new_v4().to_string();
    let headers = vec![
        ("content-type".to_owned(), "application/json".to_owned()),
        ("accept".to_owned(), "application/json".to_owned()),
        ("user-agent".to_owned(), config.user_agent.clone()),
        (REQUEST_ID_HEADER.to_owned(), request_id.clone()),
    ];

    Ok(RequestDescriptor {
        method: Method::POST,
        path: config.embed_path.clone(),
        url: join_url(&config.base_url, &config.embed_path),
        headers,
        body,
        request_id,
        timeout,
    })
}

fn join_url(base: &str, path: &str) -> String {
    let base = base.trim().trim_end_matches('/');
    let path = path.trim().trim_start_matches('/');
    if path.is_empty() {
        base.to_owned()
    } else {
        format!("{base}/{path}")
    }
}
