use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Token accounting reported by the service.
///
/// Used both per item and for the whole request.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Usage {
    /// Tokens consumed by the input text. Zero when the service omits it.
    #[serde(default)]
    pub prompt_tokens: u64,
    /// Tokens billed for the item or request.
    pub total_tokens: u64,
}

impl Usage {
    pub fn new(total_tokens: u64) -> Self {
        Self {
            prompt_tokens: 0,
            total_tokens,
        }
    }
}

/// One embedded input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingItem {
    /// Position of the input this item belongs to.
    pub index: usize,
    /// Input text as echoed by the service.
    pub text: String,
    /// Embedding vector; same length for every item of a response.
    pub embedding: Vec<f32>,
    pub usage: Usage,
}

impl EmbeddingItem {
    pub fn dimensions(&self) -> usize {
        self.embedding.len()
    }
}

/// Result of one [`embed`](crate::Client::embed) call.
///
/// `payload` has exactly one item per input, in input order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingResponse {
    /// Model that produced the vectors.
    pub model: String,
    pub payload: Vec<EmbeddingItem>,
    /// Aggregate usage; `total_tokens` equals the sum over `payload`.
    pub total_usage: Usage,
}

impl EmbeddingResponse {
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Vector dimensionality shared by all items.
    pub fn dimensions(&self) -> usize {
        self.payload.first().map_or(0, EmbeddingItem::dimensions)
    }

    pub fn embeddings(&self) -> impl Iterator<Item = &[f32]> {
        self.payload.iter().map(|item| item.embedding.as_slice())
    }

    pub fn into_vectors(self) -> Vec<Vec<f32>> {
        self.payload.into_iter().map(|item| item.embedding).collect()
    }
}

/// Per-call overrides for [`embed`](crate::Client::embed).
///
/// Anything left `None` falls back to the client's [`ClientConfig`](crate::ClientConfig).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbedOptions {
    pub model: Option<String>,
    /// Blend between term matching (0.0) and meaning (1.0).
    pub semantic_weight: Option<f64>,
    /// Deadline for the whole call, retries and backoff included.
    pub timeout: Option<Duration>,
}

impl EmbedOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_semantic_weight(mut self, weight: f64) -> Self {
        self.semantic_weight = Some(weight);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
