//! Line-oriented decklist parser.
//!
//! Accepted layout:
//!
//! ```text
//! About
//! Name Mono Red
//!
//! Deck
//! 4 Lightning Bolt (2ED) 161
//! 20 Mountain
//!
//! Sideboard
//! 3 Pyroblast
//! ```
//!
//! The `About`/`Name` preamble and the `Deck` marker are optional. Blank
//! lines are skipped wherever they appear.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use super::{Decklist, DecklistBuilder, Section, MAX_SIDEBOARD};
use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::resolver::Resolver;

/// Malformed decklist structure or card line
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("'About' header must be followed by a 'Name' line")]
    MissingDeckName,

    #[error("'Deck' section declared twice")]
    DuplicateDeck,

    #[error("'Deck' section after 'Sideboard'")]
    DeckAfterSideboard,

    #[error("'Sideboard' section declared twice")]
    DuplicateSideboard,

    #[error("invalid quantity '{0}'")]
    InvalidQuantity(String),

    #[error("card line has no card name")]
    MissingName,

    #[error("{quantity} more copies overflow the section total")]
    QuantityOverflow { quantity: u32 },

    #[error("sideboard exceeds {limit} cards (has {total})")]
    SideboardTooLarge { total: u32, limit: u32 },
}

/// One parsed card line. The printing suffix is informational only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardLine {
    pub quantity: u32,
    pub name: String,
    pub set_code: Option<String>,
    pub collector_number: Option<String>,
}

/// Last `(SET)` group after the name, an optional collector number and
/// any trailing markers such as `*F*`
static PRINTING_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<name>.+)\s+\((?P<set>[A-Za-z0-9]{2,8})\)(?:\s+(?P<number>\S+))?(?:\s+.*)?$")
        .unwrap_or_else(|e| panic!("invalid printing suffix pattern: {e}"))
});

/// Parse `<quantity> <name>[ (<set>)[ <collector number>[ <markers>]]]`
pub fn parse_card_line(line: &str) -> std::result::Result<CardLine, ParseErrorKind> {
    let line = line.trim();
    let (quantity_token, rest) = match line.split_once(char::is_whitespace) {
        Some((quantity, rest)) => (quantity, rest.trim()),
        None => (line, ""),
    };

    let quantity = quantity_token
        .parse::<u32>()
        .ok()
        .filter(|q| *q > 0)
        .ok_or_else(|| ParseErrorKind::InvalidQuantity(quantity_token.to_string()))?;

    let (name, set_code, collector_number) = match PRINTING_SUFFIX.captures(rest) {
        Some(caps) => (
            caps["name"].trim().to_string(),
            Some(caps["set"].to_string()),
            caps.name("number").map(|m| m.as_str().to_string()),
        ),
        None => (rest.to_string(), None, None),
    };

    if name.is_empty() {
        return Err(ParseErrorKind::MissingName);
    }

    Ok(CardLine {
        quantity,
        name,
        set_code,
        collector_number,
    })
}

fn is_marker(line: &str, marker: &str) -> bool {
    line.eq_ignore_ascii_case(marker)
}

impl Resolver {
    /// Parse a decklist, resolving every card line to a stored card.
    ///
    /// The first failing line aborts the parse; no partial decklist is
    /// returned. Resolution failures are reported as [`Error::DeckLine`].
    pub async fn parse_decklist(&self, text: &str, cancel: &CancelToken) -> Result<Decklist> {
        let parse_error = |line: usize, kind: ParseErrorKind| Error::Parse { line, kind };

        let mut builder = DecklistBuilder::new();
        let mut in_deck = false;
        let mut in_sideboard = false;
        let mut has_about = false;
        let mut line_count = 0;

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            line_count = line_no;

            if idx == 0 && is_marker(line, "About") {
                has_about = true;
                continue;
            }
            if idx == 1 && has_about {
                let first_word = line.split_whitespace().next().unwrap_or_default();
                if !is_marker(first_word, "Name") {
                    return Err(parse_error(line_no, ParseErrorKind::MissingDeckName));
                }
                continue;
            }

            if line.is_empty() {
                continue;
            }

            if is_marker(line, "Deck") {
                if in_sideboard {
                    return Err(parse_error(line_no, ParseErrorKind::DeckAfterSideboard));
                }
                if in_deck {
                    return Err(parse_error(line_no, ParseErrorKind::DuplicateDeck));
                }
                in_deck = true;
                continue;
            }

            if is_marker(line, "Sideboard") {
                if in_sideboard {
                    return Err(parse_error(line_no, ParseErrorKind::DuplicateSideboard));
                }
                in_sideboard = true;
                continue;
            }

            let card_line = parse_card_line(line).map_err(|kind| parse_error(line_no, kind))?;
            let card = match self.resolve_deck_name(&card_line.name, cancel).await {
                Ok(card) => card,
                Err(e @ Error::Cancelled(_)) => return Err(e),
                Err(e) => {
                    return Err(Error::DeckLine {
                        line: line_no,
                        text: line.to_string(),
                        source: Box::new(e),
                    })
                }
            };

            let section = if in_sideboard {
                Section::Sideboard
            } else {
                Section::Maindeck
            };
            let total = builder
                .add(section, card, card_line.quantity)
                .ok_or_else(|| {
                    parse_error(
                        line_no,
                        ParseErrorKind::QuantityOverflow {
                            quantity: card_line.quantity,
                        },
                    )
                })?;

            if section == Section::Sideboard && total > MAX_SIDEBOARD {
                return Err(parse_error(
                    line_no,
                    ParseErrorKind::SideboardTooLarge {
                        total,
                        limit: MAX_SIDEBOARD,
                    },
                ));
            }
        }

        if has_about && line_count < 2 {
            return Err(parse_error(2, ParseErrorKind::MissingDeckName));
        }

        let deck = builder.build();
        log::info!(
            "Parsed decklist: {} maindeck, {} sideboard card(s)",
            deck.count_main(),
            deck.count_sideboard()
        );
        Ok(deck)
    }
}
