//! Format legality checks over a completed decklist.

use std::collections::BTreeMap;
use thiserror::Error;

use super::Decklist;

/// Copies of one card allowed across maindeck and sideboard
pub const MAX_COPIES: u32 = 4;

/// Largest constructed sideboard
pub const MAX_SIDEBOARD: u32 = 15;

/// Format legality violation, with the actual value and the limit it broke
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("maindeck has {actual} cards, minimum is {limit}")]
    MaindeckTooSmall { actual: u32, limit: u32 },

    #[error("maindeck has {actual} cards, maximum is {limit}")]
    MaindeckTooLarge { actual: u32, limit: u32 },

    #[error("sideboard has {actual} cards, maximum is {limit}")]
    SideboardTooLarge { actual: u32, limit: u32 },

    #[error("total of {actual} copies of {name} between maindeck and sideboard, maximum is {limit}")]
    TooManyCopies { name: String, actual: u32, limit: u32 },

    #[error("maindeck has {actual} copies of {name}, maximum is {limit}")]
    TooManyMaindeckCopies { name: String, actual: u32, limit: u32 },
}

const BASIC_LANDS: &[&str] = &[
    "Plains",
    "Island",
    "Swamp",
    "Mountain",
    "Forest",
    "Snow-Covered Plains",
    "Snow-Covered Island",
    "Snow-Covered Swamp",
    "Snow-Covered Mountain",
    "Snow-Covered Forest",
    "Wastes",
    "Snow-Covered Wastes",
];

/// Cards whose rules text allows any number of copies
const ANY_NUMBER: &[&str] = &[
    "Relentless Rats",
    "Shadowborn Apostle",
    "Rat Colony",
    "Persistent Petitioners",
    "Dragon's Approach",
    "Slime Against Humanity",
    "Hare Apparent",
    "Templar Knight",
    "Tempest Hawk",
];

/// Cards with their own fixed copy limit
const OWN_LIMIT: &[(&str, u32)] = &[("Seven Dwarves", 7), ("Nazgûl", 9)];

fn same_name(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

pub fn is_basic_land(name: &str) -> bool {
    BASIC_LANDS.iter().any(|land| same_name(land, name))
}

/// Copies of `name` a deck may hold when the format allows `default`.
/// `None` means unlimited.
///
/// Seven Dwarves and Nazgûl are not unlimited: their rules text caps them
/// at 7 and 9 copies, so an eighth Seven Dwarves fails every format check.
pub fn copy_limit(name: &str, default: u32) -> Option<u32> {
    if is_basic_land(name) || ANY_NUMBER.iter().any(|card| same_name(card, name)) {
        return None;
    }
    match OWN_LIMIT.iter().find(|(card, _)| same_name(card, name)) {
        Some(&(_, limit)) => Some(limit),
        None => Some(default),
    }
}

impl Decklist {
    /// Check deck sizes, then the combined copy limit across both sections.
    ///
    /// `max_main == 0` means no maindeck maximum.
    pub fn validate(
        &self,
        min_main: u32,
        max_main: u32,
        max_sideboard: u32,
    ) -> Result<(), ValidationError> {
        let main = self.count_main();
        let side = self.count_sideboard();

        if main < min_main {
            return Err(ValidationError::MaindeckTooSmall {
                actual: main,
                limit: min_main,
            });
        }
        if max_main > 0 && main > max_main {
            return Err(ValidationError::MaindeckTooLarge {
                actual: main,
                limit: max_main,
            });
        }
        if side > max_sideboard {
            return Err(ValidationError::SideboardTooLarge {
                actual: side,
                limit: max_sideboard,
            });
        }

        // Sorted by name so the reported card is deterministic
        let mut totals: BTreeMap<&str, u32> = BTreeMap::new();
        for entry in self.maindeck().iter().chain(self.sideboard()) {
            let total = totals.entry(entry.card.name()).or_default();
            *total = total.saturating_add(entry.quantity);
        }

        for (name, actual) in totals {
            if let Some(limit) = copy_limit(name, MAX_COPIES) {
                if actual > limit {
                    return Err(ValidationError::TooManyCopies {
                        name: name.to_string(),
                        actual,
                        limit,
                    });
                }
            }
        }
        Ok(())
    }

    /// 60+ card maindeck, sideboard of at most 15, four copies per card
    pub fn validate_constructed(&self) -> Result<(), ValidationError> {
        self.validate(60, 0, MAX_SIDEBOARD)?;
        self.validate_four_ofs()
    }

    /// 40+ card maindeck, no sideboard
    pub fn validate_limited(&self) -> Result<(), ValidationError> {
        self.validate(40, 0, 0)
    }

    /// At most one copy of each maindeck card
    pub fn validate_singleton(&self) -> Result<(), ValidationError> {
        self.check_maindeck_copies(1)
    }

    /// At most four copies of each maindeck card
    pub fn validate_four_ofs(&self) -> Result<(), ValidationError> {
        self.check_maindeck_copies(MAX_COPIES)
    }

    fn check_maindeck_copies(&self, default: u32) -> Result<(), ValidationError> {
        for entry in self.maindeck() {
            let Some(limit) = copy_limit(entry.card.name(), default) else {
                continue;
            };
            if entry.quantity > limit {
                return Err(ValidationError::TooManyMaindeckCopies {
                    name: entry.card.name().to_string(),
                    actual: entry.quantity,
                    limit,
                });
            }
        }
        Ok(())
    }
}
