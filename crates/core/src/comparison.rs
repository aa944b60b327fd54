use crate::domain::card::CardRecord;
use crate::domain::recommendation::EnrichedRecommendation;
use crate::orchestrator::RequestState;
use crate::selection::SelectionSet;
use serde::Serialize;

/// Skeleton cards shown while a request is pending.
pub const LOADING_PLACEHOLDERS: usize = 3;

const TRAY_LABEL_MAX_CHARS: usize = 20;
const TRAY_LABEL_KEEP_CHARS: usize = 18;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonViewModel {
    pub ai_panel: Option<AiPanel>,
    pub manual_panel: Option<ManualPanel>,
    pub tray: Option<ComparisonTray>,
    pub nothing_to_show: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AiPanel {
    Loading { placeholders: usize },
    Error { message: String },
    Results { entries: Vec<AiEntry> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiEntry {
    pub top_match: bool,
    #[serde(flatten)]
    pub recommendation: EnrichedRecommendation,
    pub highlights: Vec<DetailField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualPanel {
    pub cards: Vec<ComparisonCard>,
}

/// One column of the side-by-side comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonCard {
    pub id: String,
    pub name: String,
    pub issuer: String,
    pub joining_fee: u32,
    pub annual_fee: u32,
    pub details: Vec<DetailField>,
    pub features: Vec<String>,
    pub application_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailField {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonTray {
    pub count: usize,
    pub labels: Vec<String>,
    pub limit_reached: bool,
}

pub fn assemble(state: &RequestState, selection: &SelectionSet) -> ComparisonViewModel {
    let ai_panel = ai_panel(state);
    let manual_panel = (!selection.is_empty()).then(|| ManualPanel {
        cards: selection.cards().iter().map(comparison_card).collect(),
    });
    let tray = (!selection.is_empty()).then(|| ComparisonTray {
        count: selection.len(),
        labels: selection.cards().iter().map(|c| tray_label(&c.name)).collect(),
        limit_reached: selection.is_full(),
    });

    ComparisonViewModel {
        nothing_to_show: ai_panel.is_none() && manual_panel.is_none(),
        ai_panel,
        manual_panel,
        tray,
    }
}

fn ai_panel(state: &RequestState) -> Option<AiPanel> {
    match state {
        RequestState::Idle => None,
        RequestState::Pending => Some(AiPanel::Loading {
            placeholders: LOADING_PLACEHOLDERS,
        }),
        RequestState::Failed { reason } => Some(AiPanel::Error {
            message: reason.clone(),
        }),
        // Oracle order is the rank order; index 0 is the top match.
        RequestState::Fulfilled { results } => Some(AiPanel::Results {
            entries: results
                .iter()
                .enumerate()
                .map(|(idx, rec)| AiEntry {
                    top_match: idx == 0,
                    highlights: highlights(&rec.card),
                    recommendation: rec.clone(),
                })
                .collect(),
        }),
    }
}

fn highlights(card: &CardRecord) -> Vec<DetailField> {
    vec![
        field("Joining Fee", format_inr(card.joining_fee)),
        field("Annual Fee", format_inr(card.annual_fee)),
        field("Fee Waiver", card.fee_waiver_policy.clone()),
        field("Bonus", card.welcome_bonus.clone()),
    ]
}

fn comparison_card(card: &CardRecord) -> ComparisonCard {
    ComparisonCard {
        id: card.id.clone(),
        name: card.name.clone(),
        issuer: card.issuer.clone(),
        joining_fee: card.joining_fee,
        annual_fee: card.annual_fee,
        details: vec![
            field("Joining Fee", format_inr(card.joining_fee)),
            field("Annual Fee", format_inr(card.annual_fee)),
            field("Fee Waiver", card.fee_waiver_policy.clone()),
            field("Interest Rate", card.interest_rate_policy.clone()),
            field("Welcome Bonus", card.welcome_bonus.clone()),
        ],
        features: card.features.clone(),
        application_url: card.application_url.clone(),
    }
}

fn field(label: &'static str, value: String) -> DetailField {
    DetailField { label, value }
}

/// Rupee amount with Indian digit grouping: the last three digits, then pairs.
pub fn format_inr(amount: u32) -> String {
    let digits = amount.to_string();
    if digits.len() <= 3 {
        return format!("₹{digits}");
    }

    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(2);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();
    format!("₹{},{tail}", groups.join(","))
}

pub fn tray_label(name: &str) -> String {
    if name.chars().count() > TRAY_LABEL_MAX_CHARS {
        let cut: String = name.chars().take(TRAY_LABEL_KEEP_CHARS).collect();
        format!("{cut}...")
    } else {
        name.to_string()
    }
}
