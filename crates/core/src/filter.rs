use crate::domain::card::{CardRecord, TAG_CASHBACK, TAG_PREMIUM, TAG_TRAVEL};
use crate::selection::SelectionSet;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Directory filter chips.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CardFilter {
    #[default]
    All,
    NoAnnualFee,
    BestForTravel,
    Cashback,
    Premium,
}

impl CardFilter {
    pub const ALL: [CardFilter; 5] = [
        CardFilter::All,
        CardFilter::NoAnnualFee,
        CardFilter::BestForTravel,
        CardFilter::Cashback,
        CardFilter::Premium,
    ];

    pub fn label(self) -> &'static str {
        match self {
            CardFilter::All => "All",
            CardFilter::NoAnnualFee => "No Annual Fee",
            CardFilter::BestForTravel => "Best for Travel",
            CardFilter::Cashback => "Cashback",
            CardFilter::Premium => "Premium Cards",
        }
    }

    fn slug(self) -> &'static str {
        match self {
            CardFilter::All => "all",
            CardFilter::NoAnnualFee => "no-annual-fee",
            CardFilter::BestForTravel => "best-for-travel",
            CardFilter::Cashback => "cashback",
            CardFilter::Premium => "premium",
        }
    }

    pub fn matches(self, card: &CardRecord) -> bool {
        match self {
            CardFilter::All => true,
            CardFilter::NoAnnualFee => card.annual_fee == 0,
            CardFilter::BestForTravel => card.has_tag(TAG_TRAVEL),
            CardFilter::Cashback => card.has_tag(TAG_CASHBACK),
            CardFilter::Premium => card.has_tag(TAG_PREMIUM),
        }
    }
}

impl fmt::Display for CardFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for CardFilter {
    type Err = anyhow::Error;

    /// Accepts either the slug (`no-annual-fee`) or the chip label (`No Annual Fee`).
    fn from_str(s: &str) -> anyhow::Result<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|f| f.slug().eq_ignore_ascii_case(s) || f.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| anyhow::anyhow!("unknown card filter: {s:?}"))
    }
}

/// Case-insensitive substring match against card name or issuer.
pub fn matches_search(card: &CardRecord, search_text: &str) -> bool {
    let needle = search_text.to_lowercase();
    if needle.is_empty() {
        return true;
    }
    card.name.to_lowercase().contains(&needle) || card.issuer.to_lowercase().contains(&needle)
}

/// Cards passing both the filter and the search, in catalog order.
pub fn visible_cards<'a>(
    catalog: &'a [CardRecord],
    active_filter: CardFilter,
    search_text: &str,
) -> Vec<&'a CardRecord> {
    catalog
        .iter()
        .filter(|card| active_filter.matches(card))
        .filter(|card| matches_search(card, search_text))
        .collect()
}

/// A visible card as the directory grid shows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntry {
    #[serde(flatten)]
    pub card: CardRecord,
    pub selected: bool,
    pub compare_disabled: bool,
}

pub fn directory_entries(
    catalog: &[CardRecord],
    active_filter: CardFilter,
    search_text: &str,
    selection: &SelectionSet,
) -> Vec<DirectoryEntry> {
    visible_cards(catalog, active_filter, search_text)
        .into_iter()
        .map(|card| {
            let selected = selection.contains(&card.id);
            DirectoryEntry {
                card: card.clone(),
                selected,
                compare_disabled: !selected && selection.is_full(),
            }
        })
        .collect()
}
