//! Defensive JSON extraction from model output.
//!
//! Judge models asked for JSON often wrap it in markdown fences, echo the
//! requested format back, or add prose around the verdict. These helpers
//! collect every plausible JSON span and keep the first one that fits the
//! target type.

use crate::error::{ChainError, Result};
use serde::de::DeserializeOwned;

const FENCE: &str = "```";
const RAW_PREVIEW_CHARS: usize = 200;

/// Contents of every markdown code fence in `text`, in order.
///
/// An info string such as `json` right after the opening fence is dropped.
pub fn fenced_blocks(text: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find(FENCE) {
        let body = rest[open + FENCE.len()..].trim_start_matches(|c: char| c.is_ascii_alphanumeric());
        let Some(close) = body.find(FENCE) else {
            break;
        };
        blocks.push(body[..close].trim());
        rest = &body[close + FENCE.len()..];
    }
    blocks
}

/// Spans of `text` that may hold JSON, most specific first.
///
/// Fenced blocks come first, then, for every `{` or `[`, the span up to the
/// last matching closer. Later objects are reachable even when an earlier
/// one (an echoed format example, say) does not parse as the target.
pub fn json_candidates(text: &str) -> Vec<&str> {
    let trimmed = text.trim();
    let mut candidates = fenced_blocks(trimmed);

    for (start, open) in trimmed.char_indices().filter(|(_, c)| matches!(c, '{' | '[')) {
        let close = if open == '{' { '}' } else { ']' };
        if let Some(end) = trimmed.rfind(close).filter(|&end| end > start) {
            candidates.push(&trimmed[start..=end]);
        }
    }
    candidates
}

/// Parse text into a typed `T` with defensive JSON extraction.
///
/// Tries the whole text first, then each of [`json_candidates`] in order,
/// returning the first that deserializes.
pub fn parse_as<T: DeserializeOwned>(text: &str) -> Result<T> {
    let trimmed = text.trim();

    std::iter::once(trimmed)
        .chain(json_candidates(trimmed))
        .find_map(|candidate| serde_json::from_str::<T>(candidate).ok())
        .ok_or_else(|| {
            let cut = trimmed
                .char_indices()
                .nth(RAW_PREVIEW_CHARS)
                .map_or(trimmed.len(), |(i, _)| i);
            ChainError::Evaluation(format!(
                "no JSON in the model output matched the expected shape. Raw text (truncated): {}",
                &trimmed[..cut]
            ))
        })
}
