use crate::domain::card::CardRecord;
use serde::{Deserialize, Serialize};

/// A single validated item from an oracle response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationResult {
    pub card_id: String,
    pub match_score: u8,
    pub rationale: String,
}

/// An oracle suggestion joined back to its catalog record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedRecommendation {
    #[serde(flatten)]
    pub card: CardRecord,
    pub match_score: u8,
    pub rationale: String,
}
