pub mod error;
pub mod gemini;
pub mod json;

use crate::catalog::Catalog;
use crate::domain::card::CardRecord;
use crate::domain::profile::UserProfile;
use anyhow::Context;
use serde::Serialize;

/// Everything the oracle sees for one call. It knows no cards besides `catalog`.
#[derive(Debug, Clone, Serialize)]
pub struct OracleRequest {
    pub profile: UserProfile,
    pub catalog: Vec<CardRecord>,
}

impl OracleRequest {
    pub fn new(profile: UserProfile, catalog: &Catalog) -> Self {
        Self {
            profile,
            catalog: catalog.cards().to_vec(),
        }
    }

    pub fn catalog_json(&self) -> anyhow::Result<String> {
        serde_json::to_string_pretty(&self.catalog).context("failed to serialize card catalog")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_json_lists_every_card() {
        let catalog = Catalog::bundled().unwrap();
        let profile = UserProfile::try_new(50_000, ["Fuel"], Vec::<&str>::new()).unwrap();
        let request = OracleRequest::new(profile, &catalog);

        let json = request.catalog_json().unwrap();
        let cards: Vec<serde_json::Value> = serde_json::from_str(&json).unwrap();
        assert_eq!(cards.len(), catalog.len());
        assert_eq!(cards[0]["id"], catalog.cards()[0].id.as_str());
    }
}

/// External recommendation service. Returns the raw JSON text of its answer;
/// validation happens in [`json::parse_recommendations`].
#[async_trait::async_trait]
pub trait RecommendationOracle: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn recommend(&self, request: &OracleRequest) -> anyhow::Result<String>;
}
