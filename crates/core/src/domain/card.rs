use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const TAG_TRAVEL: &str = "Travel";
pub const TAG_CASHBACK: &str = "Cashback";
pub const TAG_PREMIUM: &str = "Premium";

/// One entry of the card catalog. Loaded once and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardRecord {
    pub id: String,
    pub name: String,
    pub issuer: String,
    pub joining_fee: u32,
    pub annual_fee: u32,
    pub fee_waiver_policy: String,
    pub interest_rate_policy: String,
    pub welcome_bonus: String,
    pub features: Vec<String>,
    pub category_tags: BTreeSet<String>,
    pub application_url: String,
}

impl CardRecord {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.category_tags.contains(tag)
    }
}
