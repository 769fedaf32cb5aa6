//! Input normalization: one string or many become an ordered, validated list.

use crate::error::{NeuralexError, Result};

/// Text handed to [`embed`](crate::Client::embed): one string or a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbedInput {
    Single(String),
    Batch(Vec<String>),
}

impl From<&str> for EmbedInput {
    fn from(text: &str) -> Self {
        EmbedInput::Single(text.to_owned())
    }
}

impl From<String> for EmbedInput {
    fn from(text: String) -> Self {
        EmbedInput::Single(text)
    }
}

impl From<&String> for EmbedInput {
    fn from(text: &String) -> Self {
        EmbedInput::Single(text.clone())
    }
}

impl From<Vec<String>> for EmbedInput {
    fn from(texts: Vec<String>) -> Self {
        EmbedInput::Batch(texts)
    }
}

impl From<Vec<&str>> for EmbedInput {
    fn from(texts: Vec<&str>) -> Self {
        EmbedInput::Batch(texts.into_iter().map(str::to_owned).collect())
    }
}

impl From<&[&str]> for EmbedInput {
    fn from(texts: &[&str]) -> Self {
        EmbedInput::Batch(texts.iter().map(|t| (*t).to_owned()).collect())
    }
}

impl From<&[String]> for EmbedInput {
    fn from(texts: &[String]) -> Self {
        EmbedInput::Batch(texts.to_vec())
    }
}

impl<const N: usize> From<[&str; N]> for EmbedInput {
    fn from(texts: [&str; N]) -> Self {
        EmbedInput::Batch(texts.iter().map(|t| (*t).to_owned()).collect())
    }
}

/// Validated inputs in caller order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedInput {
    texts: Vec<String>,
    single: bool,
}

impl NormalizedInput {
    pub fn texts(&self) -> &[String] {
        &self.texts
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    /// Whether the caller passed a bare string rather than a list.
    pub fn is_single(&self) -> bool {
        self.single
    }
}

/// Validate `input` against the batch and length limits.
///
/// Texts are passed through untouched; whitespace-only entries are rejected
/// rather than trimmed.
pub fn normalize_input(
    input: EmbedInput,
    max_batch_size: usize,
    max_text_chars: Option<usize>,
) -> Result<NormalizedInput> {
    let (texts, single) = match input {
        EmbedInput::Single(text) => (vec![text], true),
        EmbedInput::Batch(texts) => (texts, false),
    };

    if texts.is_empty() {
        return Err(NeuralexError::validation("input batch is empty"));
    }
    if texts.len() > max_batch_size {
        return Err(NeuralexError::validation(format!(
            "batch of {} inputs exceeds the limit of {max_batch_size}",
            texts.len()
        )));
    }

    for (index, text) in texts.iter().enumerate() {
        if text.trim().is_empty() {
            return Err(NeuralexError::validation(if single {
                "input text is empty".to_owned()
            } else {
                format!("input #{index} is empty")
            }));
        }
        if let Some(limit) = max_text_chars {
            let chars = text.chars().count();
            if chars > limit {
                return Err(NeuralexError::validation(format!(
                    "input #{index} has {chars} characters, limit is {limit}"
                )));
            }
        }
    }

    Ok(NormalizedInput { texts, single })
}
