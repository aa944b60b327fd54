use crate::config::Settings;
use crate::domain::card::CardRecord;
use anyhow::{ensure, Context};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

const BUNDLED_CATALOG: &str = include_str!("../data/cards.json");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogManifest {
    pub version: String,
    pub updated_on: NaiveDate,
    pub cards: Vec<CardRecord>,
}

/// Immutable in-memory card catalog, shared read-only for the whole session.
#[derive(Debug, Clone)]
pub struct Catalog {
    version: String,
    updated_on: NaiveDate,
    cards: Vec<CardRecord>,
}

impl Catalog {
    /// Loads `CARD_CATALOG_PATH` when configured, the bundled manifest otherwise.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        match settings.card_catalog_path.as_deref() {
            Some(path) => Self::load(Path::new(path)),
            None => Self::bundled(),
        }
    }

    pub fn bundled() -> anyhow::Result<Self> {
        Self::from_json_str(BUNDLED_CATALOG).context("bundled card catalog is invalid")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read card catalog {}", path.display()))?;
        Self::from_json_str(&text)
            .with_context(|| format!("invalid card catalog {}", path.display()))
    }

    pub fn from_json_str(text: &str) -> anyhow::Result<Self> {
        let manifest = serde_json::from_str::<CatalogManifest>(text)
            .context("card catalog is not a valid manifest")?;
        Self::from_manifest(manifest)
    }

    pub fn from_manifest(manifest: CatalogManifest) -> anyhow::Result<Self> {
        let mut seen = HashSet::with_capacity(manifest.cards.len());
        for card in &manifest.cards {
            ensure!(!card.id.trim().is_empty(), "card id must be non-empty");
            ensure!(seen.insert(card.id.as_str()), "duplicate card id: {}", card.id);
            ensure!(!card.name.trim().is_empty(), "card {} has no name", card.id);
            ensure!(!card.issuer.trim().is_empty(), "card {} has no issuer", card.id);
        }

        tracing::debug!(
            version = %manifest.version,
            updated_on = %manifest.updated_on,
            cards_len = manifest.cards.len(),
            "card catalog loaded"
        );

        Ok(Self {
            version: manifest.version,
            updated_on: manifest.updated_on,
            cards: manifest.cards,
        })
    }

    pub fn cards(&self) -> &[CardRecord] {
        &self.cards
    }

    pub fn get(&self, id: &str) -> Option<&CardRecord> {
        self.cards.iter().find(|card| card.id == id)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn updated_on(&self) -> NaiveDate {
        self.updated_on
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}
