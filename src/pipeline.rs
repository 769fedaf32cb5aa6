//! Steps shared by the blocking and async clients.
//!
//! Everything except the executor call lives here: input normalization,
//! request building, response parsing and the per-call log events.

use std::time::Instant;

use tracing::{info, warn};

use crate::config::ClientConfig;
use crate::error::Result;
use crate::normalize::{EmbedInput, NormalizedInput, normalize_input};
use crate::request::build_request;
use crate::response::parse_response;
use crate::transport::{CallBudget, HttpRequest};
use crate::types::{EmbedOptions, EmbeddingResponse};

/// A call that passed validation and is ready for the executor.
pub(crate) struct Prepared {
    pub input: NormalizedInput,
    pub request: HttpRequest,
    pub request_id: String,
    pub budget: CallBudget,
}

/// Normalize and build. Fails before any network activity.
pub(crate) fn prepare(
    input: EmbedInput,
    config: &ClientConfig,
    options: &EmbedOptions,
) -> Result<Prepared> {
    let input = normalize_input(input, config.max_batch_size, config.max_text_chars)?;
    let descriptor = build_request(&input, config, options)?;
    let request = HttpRequest::authorized(&descriptor, &config.api_key);

    Ok(Prepared {
        input,
        request,
        request_id: descriptor.request_id,
        budget: CallBudget {
            deadline: descriptor.timeout,
            attempt_timeout: config.attempt_timeout,
        },
    })
}

pub(crate) fn finish(
    body: &str,
    input: &NormalizedInput,
    config: &ClientConfig,
) -> Result<EmbeddingResponse> {
    parse_response(body, input, config.ordering)
}

/// Emit the terminal event for one call and pass the result through.
pub(crate) fn record_outcome(
    result: Result<EmbeddingResponse>,
    start: Instant,
) -> Result<EmbeddingResponse> {
    let elapsed_micros = start.elapsed().as_micros();
    match &result {
        Ok(response) => info!(
            model = %response.model,
            items = response.len(),
            dimensions = response.dimensions(),
            total_tokens = response.total_usage.total_tokens,
            elapsed_micros,
            "embed_success"
        ),
        Err(err) => warn!(
            error = %err,
            error_kind = ?err.kind(),
            attempts = err.attempts(),
            elapsed_micros,
            "embed_failure"
        ),
    }
    result
}
