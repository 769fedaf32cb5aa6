//! Response parsing and validation.
//!
//! The service answers with
//!
//! ```json
//! {
//!   "model": "nlx-embed-1",
//!   "payload": [
//!     {"text": "a", "embedding": [0.1, 0.2], "usage": {"total_tokens": 4}, "index": 0}
//!   ],
//!   "usage": {"total_tokens": 4}
//! }
//! ```
//!
//! `data` is accepted for `payload`, `total_usage` for `usage`, and `index`
//! is optional. Items are realigned to input order according to
//! [`ItemOrdering`]; anything that cannot be aligned is rejected.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

use crate::error::{NeuralexError, Result};
use crate::normalize::NormalizedInput;
use crate::types::{EmbeddingItem, EmbeddingResponse, Usage};

/// Strategy for matching response items to inputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemOrdering {
    /// Use `index` when every item has one, otherwise trust server order if
    /// every echo matches its input, otherwise match by text.
    #[default]
    Auto,
    /// Require a unique, in-range `index` on every item.
    Index,
    /// Match items to inputs by echoed text.
    Text,
    /// Trust server order without checking.
    Positional,
}

#[derive(Deserialize)]
struct WireResponse {
    model: Option<String>,
    #[serde(alias = "data")]
    payload: Option<Vec<WireItem>>,
    #[serde(alias = "total_usage")]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct WireItem {
    text: Option<String>,
    embedding: Option<Vec<f32>>,
    usage: Option<Usage>,
    index: Option<usize>,
}

struct ParsedItem {
    text: String,
    embedding: Vec<f32>,
    usage: Usage,
    index: Option<usize>,
}

/// Decode and validate a 2xx body against the inputs that produced it.
pub fn parse_response(
    body: &str,
    input: &NormalizedInput,
    ordering: ItemOrdering,
) -> Result<EmbeddingResponse> {
    let wire: WireResponse = serde_json::from_str(body)?;

    let model = wire
        .model
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| NeuralexError::invalid_response("missing `model`"))?;
    let wire_items = wire
        .payload
        .ok_or_else(|| NeuralexError::invalid_response("missing `payload` array"))?;
    let total_usage = wire
        .usage
        .ok_or_else(|| NeuralexError::invalid_response("missing top-level `usage`"))?;

    if wire_items.len() != input.len() {
        return Err(NeuralexError::invalid_response(format!(
            "service returned {} items for {} inputs",
            wire_items.len(),
            input.len()
        )));
    }

    let items = wire_items
        .into_iter()
        .enumerate()
        .map(|(pos, item)| parse_item(pos, item))
        .collect::<Result<Vec<_>>>()?;

    let dimensions = items.first().map_or(0, |item| item.embedding.len());
    if let Some(pos) = items.iter().position(|i| i.embedding.len() != dimensions) {
        return Err(NeuralexError::invalid_response(format!(
            "item #{pos} has {} dimensions, expected {dimensions}",
            items[pos].embedding.len()
        )));
    }

    let item_total = items
        .iter()
        .try_fold(0_u64, |acc, i| acc.checked_add(i.usage.total_tokens))
        .ok_or_else(|| NeuralexError::invalid_response("usage overflow: item tokens exceed u64"))?;
    if item_total != total_usage.total_tokens {
        return Err(NeuralexError::invalid_response(format!(
            "usage mismatch: items sum to {item_total} tokens, total reports {}",
            total_usage.total_tokens
        )));
    }

    let payload = align(items, input.texts(), ordering)?
        .into_iter()
        .enumerate()
        .map(|(index, item)| EmbeddingItem {
            index,
            text: item.text,
            embedding: item.embedding,
            usage: item.usage,
        })
        .collect();

    Ok(EmbeddingResponse {
        model,
        payload,
        total_usage,
    })
}

fn parse_item(pos: usize, item: WireItem) -> Result<ParsedItem> {
    let missing =
        |field: &str| NeuralexError::invalid_response(format!("item #{pos} is missing `{field}`"));

    let text = item.text.ok_or_else(|| missing("text"))?;
    let embedding = item.embedding.ok_or_else(|| missing("embedding"))?;
    let usage = item.usage.ok_or_else(|| missing("usage"))?;
    if embedding.is_empty() {
        return Err(NeuralexError::invalid_response(format!(
            "item #{pos} has an empty embedding"
        )));
    }

    Ok(ParsedItem {
        text,
        embedding,
        usage,
        index: item.index,
    })
}

fn align(
    items: Vec<ParsedItem>,
    inputs: &[String],
    ordering: ItemOrdering,
) -> Result<Vec<ParsedItem>> {
    match ordering {
        ItemOrdering::Positional => Ok(items),
        ItemOrdering::Index => align_by_index(items),
        ItemOrdering::Text => align_by_text(items, inputs),
        ItemOrdering::Auto => {
            if items.iter().all(|i| i.index.is_some()) {
                align_by_index(items)
            } else if items.iter().zip(inputs).all(|(item, text)| &item.text == text) {
                Ok(items)
            } else {
                align_by_text(items, inputs)
            }
        }
    }
}

fn align_by_index(items: Vec<ParsedItem>) -> Result<Vec<ParsedItem>> {
    let len = items.len();
    let mut slots: Vec<Option<ParsedItem>> = (0..len).map(|_| None).collect();

    for (pos, item) in items.into_iter().enumerate() {
        let index = item.index.ok_or_else(|| {
            NeuralexError::invalid_response(format!("item #{pos} has no `index`"))
        })?;
        let slot = slots.get_mut(index).ok_or_else(|| {
            NeuralexError::invalid_response(format!(
                "item #{pos} has index {index}, out of range for {len} inputs"
            ))
        })?;
        if slot.replace(item).is_some() {
            return Err(NeuralexError::invalid_response(format!(
                "index {index} appears more than once"
            )));
        }
    }

    // Unique in-range indices over `len` items fill every slot.
    Ok(slots.into_iter().flatten().collect())
}

fn align_by_text(items: Vec<ParsedItem>, inputs: &[String]) -> Result<Vec<ParsedItem>> {
    let mut by_text: HashMap<String, VecDeque<ParsedItem>> = HashMap::new();
    for item in items {
        by_text.entry(item.text.clone()).or_default().push_back(item);
    }

    inputs
        .iter()
        .enumerate()
        .map(|(pos, text)| {
            by_text
                .get_mut(text)
                .and_then(VecDeque::pop_front)
                .ok_or_else(|| {
                    NeuralexError::invalid_response(format!(
                        "no response item echoes input #{pos}"
                    ))
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::normalize::normalize_input;
    use serde_json::json;

    fn input(texts: Vec<&str>) -> NormalizedInput {
        normalize_input(texts.into(), 100, None).unwrap()
    }

    fn invalid(body: serde_json::Value, texts: Vec<&str>) -> String {
        match parse_response(&body.to_string(), &input(texts), ItemOrdering::Auto) {
            Err(NeuralexError::InvalidResponse(msg)) => msg,
            other => panic!("expected InvalidResponse, got {other:?}"),
        }
    }

    #[test]
    fn parses_two_item_batch_in_order() {
        let body = json!({
            "model": "nlx-embed-1",
            "payload": [
                {"text": "a", "embedding": [0.1, 0.2, 0.3, 0.4], "usage": {"total_tokens": 4}},
                {"text": "b", "embedding": [0.5, 0.6, 0.7, 0.8], "usage": {"total_tokens": 6}}
            ],
            "usage": {"total_tokens": 10}
        });

        let resp = parse_response(&body.to_string(), &input(vec!["a", "b"]), ItemOrdering::Auto)
            .unwrap();

        assert_eq!(resp.model, "nlx-embed-1");
        assert_eq!(resp.total_usage.total_tokens, 10);
        let texts: Vec<&str> = resp.payload.iter().map(|i| i.text.as_str()).collect();
        assert_eq!(texts, ["a", "b"]);
        assert_eq!(resp.payload[1].index, 1);
        assert_eq!(resp.payload[1].usage.total_tokens, 6);
        assert_eq!(resp.dimensions(), 4);
    }

    #[test]
    fn accepts_data_and_total_usage_aliases() {
        let body = json!({
            "model": "m",
            "data": [{"text": "a", "embedding": [1.0], "usage": {"total_tokens": 1}}],
            "total_usage": {"prompt_tokens": 1, "total_tokens": 1}
        });
        let resp = parse_response(&body.to_string(), &input(vec!["a"]), ItemOrdering::Auto)
            .unwrap();
        assert_eq!(resp.total_usage.prompt_tokens, 1);
    }

    #[test]
    fn reorders_by_index() {
        let body = json!({
            "model": "m",
            "payload": [
                {"index": 1, "text": "b", "embedding": [2.0], "usage": {"total_tokens": 1}},
                {"index": 0, "text": "a", "embedding": [1.0], "usage": {"total_tokens": 1}}
            ],
            "usage": {"total_tokens": 2}
        });
        let resp = parse_response(&body.to_string(), &input(vec!["a", "b"]), ItemOrdering::Auto)
            .unwrap();
        assert_eq!(resp.into_vectors(), vec![vec![1.0], vec![2.0]]);
    }

    #[test]
    fn reorders_by_text_when_no_index() {
        let body = json!({
            "model": "m",
            "payload": [
                {"text": "b", "embedding": [2.0], "usage": {"total_tokens": 1}},
                {"text": "a", "embedding": [1.0], "usage": {"total_tokens": 1}},
                {"text": "a", "embedding": [3.0], "usage": {"total_tokens": 1}}
            ],
            "usage": {"total_tokens": 3}
        });
        let resp = parse_response(
            &body.to_string(),
            &input(vec!["a", "b", "a"]),
            ItemOrdering::Auto,
        )
        .unwrap();
        assert_eq!(resp.into_vectors(), vec![vec![1.0], vec![2.0], vec![3.0]]);
    }

    #[test]
    fn positional_trusts_server_order() {
        let body = json!({
            "model": "m",
            "payload": [
                {"text": "A", "embedding": [1.0], "usage": {"total_tokens": 1}},
                {"text": "B", "embedding": [2.0], "usage": {"total_tokens": 1}}
            ],
            "usage": {"total_tokens": 2}
        });
        let texts = input(vec!["a", "b"]);
        let resp = parse_response(&body.to_string(), &texts, ItemOrdering::Positional).unwrap();
        assert_eq!(resp.payload[0].text, "A");

        // Echoes that match nothing cannot be text-aligned.
        let err = parse_response(&body.to_string(), &texts, ItemOrdering::Auto).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidResponse);
    }

    #[test]
    fn strict_index_mode_requires_indices() {
        let body = json!({
            "model": "m",
            "payload": [{"text": "a", "embedding": [1.0], "usage": {"total_tokens": 1}}],
            "usage": {"total_tokens": 1}
        });
        let err = parse_response(&body.to_string(), &input(vec!["a"]), ItemOrdering::Index)
            .unwrap_err();
        assert!(err.to_string().contains("has no `index`"));
    }

    #[test]
    fn duplicate_or_out_of_range_index_is_rejected() {
        let dup = invalid(
            json!({
                "model": "m",
                "payload": [
                    {"index": 0, "text": "a", "embedding": [1.0], "usage": {"total_tokens": 1}},
                    {"index": 0, "text": "b", "embedding": [2.0], "usage": {"total_tokens": 1}}
                ],
                "usage": {"total_tokens": 2}
            }),
            vec!["a", "b"],
        );
        assert!(dup.contains("more than once"));

        let out = invalid(
            json!({
                "model": "m",
                "payload": [{
                    "index": 5,
                    "text": "a",
                    "embedding": [1.0],
                    "usage": {"total_tokens": 1}
                }],
                "usage": {"total_tokens": 1}
            }),
            vec!["a"],
        );
        assert!(out.contains("out of range"));
    }

    #[test]
    fn count_mismatch_is_rejected() {
        let msg = invalid(
            json!({
                "model": "m",
                "payload": [{"text": "a", "embedding": [1.0], "usage": {"total_tokens": 1}}],
                "usage": {"total_tokens": 1}
            }),
            vec!["a", "b"],
        );
        assert_eq!(msg, "service returned 1 items for 2 inputs");
    }

    #[test]
    fn missing_fields_are_rejected() {
        let item = json!({"text": "a", "embedding": [1.0], "usage": {"total_tokens": 1}});
        assert!(invalid(json!({"payload": [item], "usage": {"total_tokens": 1}}), vec!["a"])
            .contains("model"));
        assert!(invalid(json!({"model": "m", "usage": {"total_tokens": 1}}), vec!["a"])
            .contains("payload"));
        assert!(invalid(json!({"model": "m", "payload": [item]}), vec!["a"]).contains("usage"));
        assert!(invalid(
            json!({"model": "m", "payload": [{"text": "a", "usage": {"total_tokens": 1}}],
                   "usage": {"total_tokens": 1}}),
            vec!["a"],
        )
        .contains("embedding"));
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let msg = invalid(
            json!({
                "model": "m",
                "payload": [
                    {"text": "a", "embedding": [1.0, 2.0], "usage": {"total_tokens": 1}},
                    {"text": "b", "embedding": [1.0], "usage": {"total_tokens": 1}}
                ],
                "usage": {"total_tokens": 2}
            }),
            vec!["a", "b"],
        );
        assert!(msg.contains("dimensions"));
    }

    #[test]
    fn usage_sum_must_match_total() {
        let msg = invalid(
            json!({
                "model": "m",
                "payload": [{"text": "a", "embedding": [1.0], "usage": {"total_tokens": 3}}],
                "usage": {"total_tokens": 4}
            }),
            vec!["a"],
        );
        assert!(msg.contains("usage mismatch"));
    }

    #[test]
    fn overflowing_item_usage_is_rejected() {
        let msg = invalid(
            json!({
                "model": "m",
                "payload": [
                    {"text": "a", "embedding": [1.0], "usage": {"total_tokens": u64::MAX}},
                    {"text": "b", "embedding": [2.0], "usage": {"total_tokens": 1}}
                ],
                "usage": {"total_tokens": 0}
            }),
            vec!["a", "b"],
        );
        assert!(msg.contains("usage overflow"));
    }

    #[test]
    fn non_json_and_non_numeric_vectors_are_rejected() {
        let texts = input(vec!["a"]);
        let err = parse_response("<html>oops</html>", &texts, ItemOrdering::Auto).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidResponse);

        let body = json!({
            "model": "m",
            "payload": [{"text": "a", "embedding": ["x"], "usage": {"total_tokens": 1}}],
            "usage": {"total_tokens": 1}
        });
        let err = parse_response(&body.to_string(), &texts, ItemOrdering::Auto).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidResponse);
    }
}
