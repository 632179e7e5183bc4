//! Pull a JSON object out of free-form LLM output.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use thiserror::Error;

#[allow(clippy::expect_used)]
static FENCED_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").expect("fenced block pattern is valid")
});

#[derive(Debug, Error)]
pub enum JsonExtractError {
    #[error("empty response")]
    Empty,

    #[error("no valid JSON in response: {0}")]
    Invalid(#[from] serde_json::Error),
}

/// Deserialize the first fenced code block, or the whole text when there is
/// no fence.
pub fn extract_json<T: DeserializeOwned>(text: &str) -> Result<T, JsonExtractError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(JsonExtractError::Empty);
    }

    let payload = FENCED_BLOCK
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map_or(text, |m| m.as_str());

    Ok(serde_json::from_str(payload)?)
}

pub fn extract_json_value(text: &str) -> Result<serde_json::Value, JsonExtractError> {
    extract_json(text)
}
