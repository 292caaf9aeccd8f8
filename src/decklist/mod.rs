//! Arena-style decklists: parsing, export and format validation.

mod parser;
mod validate;

pub use parser::{parse_card_line, CardLine, ParseErrorKind};
pub use validate::{copy_limit, is_basic_land, ValidationError, MAX_COPIES, MAX_SIDEBOARD};

use std::collections::HashMap;
use std::fmt;

use crate::models::{Card, OracleId};

/// The two halves of a decklist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Maindeck,
    Sideboard,
}

/// One distinct card and how many copies of it a section holds
#[derive(Debug, Clone, PartialEq)]
pub struct DeckEntry {
    pub card: Card,
    pub quantity: u32,
}

/// Entries keyed by oracle id, in order of first appearance
#[derive(Debug, Clone, Default, PartialEq)]
struct Pile {
    entries: Vec<DeckEntry>,
    index: HashMap<OracleId, usize>,
    total: u32,
}

impl Pile {
    /// Returns the new total, or `None` (leaving the pile untouched) if it
    /// would not fit in a `u32`. No entry can exceed the total.
    fn add(&mut self, card: Card, quantity: u32) -> Option<u32> {
        let total = self.total.checked_add(quantity)?;
        match self.index.get(card.oracle_id()) {
            Some(&slot) => self.entries[slot].quantity += quantity,
            None => {
                self.index.insert(card.oracle_id().clone(), self.entries.len());
                self.entries.push(DeckEntry { card, quantity });
            }
        }
        self.total = total;
        Some(total)
    }

    fn total(&self) -> u32 {
        self.total
    }

    fn quantity_of(&self, oracle_id: &OracleId) -> u32 {
        self.index
            .get(oracle_id)
            .map_or(0, |&slot| self.entries[slot].quantity)
    }

    /// One reference per copy
    fn expand(&self) -> Vec<&Card> {
        self.entries
            .iter()
            .flat_map(|e| std::iter::repeat(&e.card).take(e.quantity as usize))
            .collect()
    }
}

/// A maindeck and a sideboard. Each holds at most one entry per oracle id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Decklist {
    maindeck: Pile,
    sideboard: Pile,
}

impl Decklist {
    pub fn builder() -> DecklistBuilder {
        DecklistBuilder::default()
    }

    /// Total copies in the maindeck
    pub fn count_main(&self) -> u32 {
        self.maindeck.total()
    }

    /// Total copies in the sideboard
    pub fn count_sideboard(&self) -> u32 {
        self.sideboard.total()
    }

    pub fn maindeck(&self) -> &[DeckEntry] {
        &self.maindeck.entries
    }

    pub fn sideboard(&self) -> &[DeckEntry] {
        &self.sideboard.entries
    }

    pub fn entries(&self, section: Section) -> &[DeckEntry] {
        match section {
            Section::Maindeck => self.maindeck(),
            Section::Sideboard => self.sideboard(),
        }
    }

    /// Copies of one card in one section; 0 if absent
    pub fn quantity_of(&self, section: Section, oracle_id: &OracleId) -> u32 {
        self.pile(section).quantity_of(oracle_id)
    }

    /// Every maindeck card, repeated once per copy
    pub fn maindeck_cards(&self) -> Vec<&Card> {
        self.maindeck.expand()
    }

    /// Every sideboard card, repeated once per copy
    pub fn sideboard_cards(&self) -> Vec<&Card> {
        self.sideboard.expand()
    }

    pub fn is_empty(&self) -> bool {
        self.maindeck.entries.is_empty() && self.sideboard.entries.is_empty()
    }

    fn pile(&self, section: Section) -> &Pile {
        match section {
            Section::Maindeck => &self.maindeck,
            Section::Sideboard => &self.sideboard,
        }
    }
}

/// Arena export: `<qty> <name>` lines, then a blank line, `Sideboard` and
/// the sideboard lines when the sideboard is not empty
impl fmt::Display for Decklist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in self.maindeck() {
            writeln!(f, "{} {}", entry.quantity, entry.card.name())?;
        }

        if !self.sideboard.entries.is_empty() {
            writeln!(f)?;
            writeln!(f, "Sideboard")?;
            for entry in self.sideboard() {
                writeln!(f, "{} {}", entry.quantity, entry.card.name())?;
            }
        }
        Ok(())
    }
}

/// Assembles a [`Decklist`], merging repeated cards by oracle id
#[derive(Debug, Clone, Default)]
pub struct DecklistBuilder {
    deck: Decklist,
}

impl DecklistBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add copies of `card` and return the section's new total.
    /// A zero quantity adds nothing. `None` if the total would overflow,
    /// in which case nothing is added.
    pub fn add(&mut self, section: Section, card: Card, quantity: u32) -> Option<u32> {
        let pile = match section {
            Section::Maindeck => &mut self.deck.maindeck,
            Section::Sideboard => &mut self.deck.sideboard,
        };
        if quantity == 0 {
            return Some(pile.total());
        }
        pile.add(card, quantity)
    }

    /// Chained form of [`DecklistBuilder::add`]; copies that would overflow
    /// the maindeck total are dropped
    pub fn maindeck(mut self, card: Card, quantity: u32) -> Self {
        if self.add(Section::Maindeck, card, quantity).is_none() {
            log::warn!("Maindeck total overflow, dropped {} copies", quantity);
        }
        self
    }

    pub fn sideboard(mut self, card: Card, quantity: u32) -> Self {
        if self.add(Section::Sideboard, card, quantity).is_none() {
            log::warn!("Sideboard total overflow, dropped {} copies", quantity);
        }
        self
    }

    pub fn build(self) -> Decklist {
        self.deck
    }
}

#[cfg(test)]
#[path = "decklist_tests.rs"]
mod tests;
