use crate::domain::recommendation::RecommendationResult;
use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};

/// Number of oracle entries consumed per response; extras are truncated.
pub const MAX_RECOMMENDATIONS: usize = 3;

/// Top-level oracle payload. Items stay untyped until they are consumed so
/// that entries past the cut-off cannot fail the response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleRecommendations {
    pub recommendations: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleRecommendation {
    pub card_id: String,
    pub score: i64,
    pub reasoning: String,
}

impl OracleRecommendations {
    pub fn validate_and_into_results(self) -> anyhow::Result<Vec<RecommendationResult>> {
        let total = self.recommendations.len();
        if total > MAX_RECOMMENDATIONS {
            tracing::debug!(total, kept = MAX_RECOMMENDATIONS, "truncating oracle recommendations");
        }

        self.recommendations
            .into_iter()
            .take(MAX_RECOMMENDATIONS)
            .enumerate()
            .map(|(idx, item)| {
                serde_json::from_value::<OracleRecommendation>(item)
                    .with_context(|| format!("recommendation {idx} does not match schema"))?
                    .validate_and_into_result()
            })
            .collect()
    }
}

impl OracleRecommendation {
    fn validate_and_into_result(self) -> anyhow::Result<RecommendationResult> {
        ensure!(
            (1..=100).contains(&self.score),
            "score out of range for card {:?}: {}",
            self.card_id,
            self.score
        );

        Ok(RecommendationResult {
            card_id: self.card_id.trim().to_string(),
            match_score: self.score as u8,
            rationale: self.reasoning.trim().to_string(),
        })
    }
}
