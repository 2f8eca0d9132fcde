//! Parsers for model output
//!
//! Pure functions: titled drafts for generate/refine, and score sheets for
//! the scorer. Score decoding reports failures; substituting the degraded
//! sheet is the caller's decision.

use pitchline_core::{DecodeError, DimensionScore, ScoreDimension, ScoreSheet};
use serde_json::Value;

const TITLE_MARKER: &str = "TITLE:";
const CONTENT_MARKER: &str = "CONTENT:";
const FENCE: &str = "```";
const JSON_FENCE: &str = "```json";

/// Split `TITLE: ... CONTENT: ...` output into `(title, body)`.
///
/// The text before the first `CONTENT:` (with every `TITLE:` label removed) is
/// the title when non-empty; the trimmed text after it is the body. Without a
/// `CONTENT:` marker the whole output is the body and `default_title` is used.
pub fn parse_titled_draft(raw: &str, default_title: &str) -> (String, String) {
    match raw.split_once(CONTENT_MARKER) {
        Some((head, tail)) => {
            let title = head.replace(TITLE_MARKER, "");
            let title = title.trim();
            let title = if title.is_empty() {
                default_title.to_string()
            } else {
                title.to_string()
            };
            (title, tail.trim().to_string())
        }
        None => (default_title.to_string(), raw.to_string()),
    }
}

/// Strip a markdown code fence around JSON.
///
/// A `json`-tagged fence wins; otherwise the first fenced block is taken;
/// unfenced text is returned trimmed.
pub fn strip_code_fence(raw: &str) -> &str {
    let text = raw.trim();
    if let Some((_, after)) = text.split_once(JSON_FENCE) {
        return after.split(FENCE).next().unwrap_or_default().trim();
    }
    if text.contains(FENCE) {
        return text.split(FENCE).nth(1).unwrap_or_default().trim();
    }
    text
}

/// Decode scorer output into a sheet covering every dimension.
///
/// Each dimension needs an object with a numeric `score`; `explanation` is
/// optional. Scores are clamped into `[0, 1]`. Unknown keys are ignored.
pub fn parse_scores(raw: &str) -> Result<ScoreSheet, DecodeError> {
    let text = strip_code_fence(raw);
    let value: Value = serde_json::from_str(text).map_err(|e| DecodeError::Malformed {
        reason: format!("scorer output: {e}"),
    })?;
    let object = value.as_object().ok_or_else(|| DecodeError::Malformed {
        reason: "scorer output: expected a JSON object".to_string(),
    })?;

    let mut sheet = ScoreSheet::new();
    for dimension in ScoreDimension::ALL {
        let entry = object
            .get(dimension.as_db_str())
            .ok_or(DecodeError::MissingDimension {
                dimension: *dimension,
            })?;
        let score = entry
            .get("score")
            .and_then(Value::as_f64)
            .ok_or_else(|| DecodeError::InvalidScore {
                dimension: *dimension,
                reason: "missing numeric score".to_string(),
            })?;
        let explanation = entry
            .get("explanation")
            .and_then(Value::as_str)
            .unwrap_or_default();
        sheet.insert(
            *dimension,
            DimensionScore::new(score.clamp(0.0, 1.0), explanation),
        );
    }
    Ok(sheet)
}

// ============================================================================
// TESTS
// ============================================================================
