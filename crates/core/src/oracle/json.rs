use crate::domain::contract::OracleRecommendations;
use crate::domain::recommendation::RecommendationResult;

/// Outcome of checking an oracle payload against the response schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleVerdict {
    Valid(Vec<RecommendationResult>),
    Malformed { reason: String },
}

/// Removes Markdown fences (```json ... ``` or ``` ... ```) around a body.
/// Anything else is returned trimmed and untouched.
pub fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }

    let mut inner = trimmed;
    if let Some((_, after_first)) = inner.split_once('\n') {
        inner = after_first;
    }
    if let Some(end) = inner.rfind("```") {
        inner = &inner[..end];
    }
    inner.trim()
}

pub fn parse_recommendations(text: &str) -> OracleVerdict {
    let body = strip_fences(text);

    let parsed = match serde_json::from_str::<OracleRecommendations>(body) {
        Ok(parsed) => parsed,
        Err(err) => {
            return OracleVerdict::Malformed {
                reason: format!("payload does not match recommendations schema: {err}"),
            }
        }
    };

    match parsed.validate_and_into_results() {
        Ok(results) => OracleVerdict::Valid(results),
        Err(err) => OracleVerdict::Malformed {
            reason: format!("{err:#}"),
        },
    }
}
