use crate::domain::card::CardRecord;
use serde::Serialize;

/// Maximum number of cards in a manual comparison.
pub const SELECTION_CAPACITY: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleOutcome {
    Added,
    Removed,
    /// The card was absent and the selection was full; nothing changed.
    AtCapacity,
}

/// The manual comparison cart. Unique by card id, ordered by selection time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SelectionSet {
    cards: Vec<CardRecord>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle(&mut self, card: &CardRecord) -> ToggleOutcome {
        if let Some(pos) = self.position(&card.id) {
            self.cards.remove(pos);
            return ToggleOutcome::Removed;
        }

        if self.is_full() {
            tracing::debug!(card_id = %card.id, "selection full; toggle ignored");
            return ToggleOutcome::AtCapacity;
        }

        self.cards.push(card.clone());
        ToggleOutcome::Added
    }

    pub fn clear(&mut self) {
        self.cards.clear();
    }

    pub fn contains(&self, card_id: &str) -> bool {
        self.position(card_id).is_some()
    }

    /// Whether a toggle of `card_id` would change the selection.
    pub fn can_toggle(&self, card_id: &str) -> bool {
        self.contains(card_id) || !self.is_full()
    }

    pub fn is_full(&self) -> bool {
        self.cards.len() >= SELECTION_CAPACITY
    }

    pub fn cards(&self) -> &[CardRecord] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    fn position(&self, card_id: &str) -> Option<usize> {
        self.cards.iter().position(|c| c.id == card_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::tests::card;

    fn cards(n: usize) -> Vec<CardRecord> {
        (0..n)
            .map(|i| card(&format!("c{i}"), &format!("Card {i}"), "Bank", 0, &[]))
            .collect()
    }

    fn ids(selection: &SelectionSet) -> Vec<&str> {
        selection.cards().iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn appends_in_selection_order() {
        let cards = cards(3);
        let mut selection = SelectionSet::new();
        selection.toggle(&cards[2]);
        selection.toggle(&cards[0]);
        assert_eq!(ids(&selection), vec!["c2", "c0"]);
    }

    #[test]
    fn toggling_twice_returns_to_empty() {
        let cards = cards(1);
        let mut selection = SelectionSet::new();
        assert_eq!(selection.toggle(&cards[0]), ToggleOutcome::Added);
        assert_eq!(selection.toggle(&cards[0]), ToggleOutcome::Removed);
        assert!(selection.is_empty());
    }

    #[test]
    fn fifth_card_is_a_no_op() {
        let cards = cards(5);
        let mut selection = SelectionSet::new();
        for c in &cards[..4] {
            selection.toggle(c);
        }
        let before = selection.clone();
        assert_eq!(selection.toggle(&cards[4]), ToggleOutcome::AtCapacity);
        assert_eq!(selection, before);
        assert!(!selection.can_toggle("c4"));
    }

    #[test]
    fn removal_succeeds_at_capacity_and_keeps_order() {
        let cards = cards(4);
        let mut selection = SelectionSet::new();
        for c in &cards {
            selection.toggle(c);
        }
        assert!(selection.can_toggle("c1"));
        assert_eq!(selection.toggle(&cards[1]), ToggleOutcome::Removed);
        assert_eq!(ids(&selection), vec!["c0", "c2", "c3"]);
    }

    #[test]
    fn bound_holds_over_arbitrary_toggle_sequences() {
        let cards = cards(7);
        let mut selection = SelectionSet::new();
        // Deterministic pseudo-random walk over the cards.
        let mut x: usize = 17;
        for _ in 0..500 {
            x = (x * 31 + 7) % 101;
            selection.toggle(&cards[x % cards.len()]);
            assert!(selection.len() <= SELECTION_CAPACITY);
            let mut seen = ids(&selection);
            seen.sort_unstable();
            seen.dedup();
            assert_eq!(seen.len(), selection.len());
        }
    }

    #[test]
    fn clear_empties_selection() {
        let cards = cards(3);
        let mut selection = SelectionSet::new();
        for c in &cards {
            selection.toggle(c);
        }
        selection.clear();
        assert!(selection.is_empty());
    }
}
