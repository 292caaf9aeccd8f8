//! Card data as it is stored locally and handed to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::scryfall::RemoteCard;

/// Oracle identity shared by every printing of one logical card.
///
/// Comparison is case-insensitive: the id is lowercased on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct OracleId(String);

impl OracleId {
    pub fn new(id: impl AsRef<str>) -> Self {
        OracleId(id.as_ref().trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for OracleId {
    fn from(id: String) -> Self {
        OracleId::new(id)
    }
}

impl From<&str> for OracleId {
    fn from(id: &str) -> Self {
        OracleId::new(id)
    }
}

impl From<OracleId> for String {
    fn from(id: OracleId) -> Self {
        id.0
    }
}

impl fmt::Display for OracleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Oracle-level card data, independent of any printing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardRecord {
    pub oracle_id: OracleId,
    pub name: String,
    pub type_line: String,
    pub mana_cost: Option<String>,
    pub oracle_text: Option<String>,
    pub power: Option<String>,
    pub toughness: Option<String>,
    pub cmc: f64,
    pub colors: Vec<String>,
    pub color_identity: Vec<String>,
    pub layout: String,
}

impl CardRecord {
    /// Oracle-level fields of a remote card; `None` without an oracle id
    pub fn from_remote(card: &RemoteCard) -> Option<Self> {
        let oracle_id = card.oracle_id()?;
        Some(Self {
            oracle_id: OracleId::new(oracle_id),
            name: card.name.clone(),
            type_line: card.type_line().unwrap_or_default().to_string(),
            mana_cost: card.mana_cost().map(str::to_string),
            oracle_text: card.oracle_text().map(str::to_string),
            power: card.power.clone(),
            toughness: card.toughness.clone(),
            cmc: card.cmc,
            colors: card.colors.clone(),
            color_identity: card.color_identity.clone(),
            layout: card.layout.clone(),
        })
    }
}

/// One physical printing of a card in one set/language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintingRecord {
    pub printing_id: String,
    pub oracle_id: OracleId,
    pub set_code: String,
    pub set_name: String,
    pub rarity: String,
    pub collector_number: String,
    pub image_uri: Option<String>,
    pub scryfall_uri: String,
    pub games: Vec<String>,
    /// `YYYY-MM-DD`
    pub released_at: String,
}

impl PrintingRecord {
    /// Printing-level fields of a remote card; `None` without an oracle id
    pub fn from_remote(card: &RemoteCard) -> Option<Self> {
        let oracle_id = card.oracle_id()?;
        Some(Self {
            printing_id: card.id.clone(),
            oracle_id: OracleId::new(oracle_id),
            set_code: card.set.clone(),
            set_name: card.set_name.clone(),
            rarity: card.rarity.clone(),
            collector_number: card.collector_number.clone(),
            image_uri: card.image_url().map(str::to_string),
            scryfall_uri: card.scryfall_uri.clone(),
            games: card.games.clone(),
            released_at: card.released_at.clone(),
        })
    }
}

/// A card with its full printing history, newest printing first.
///
/// Never empty: a card record without printings is not fully resolved
/// and is not handed out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Card {
    record: CardRecord,
    printings: Vec<PrintingRecord>,
}

impl Card {
    /// Returns `None` when `printings` is empty
    pub fn new(record: CardRecord, mut printings: Vec<PrintingRecord>) -> Option<Self> {
        if printings.is_empty() {
            return None;
        }
        printings.sort_by(|a, b| {
            b.released_at
                .cmp(&a.released_at)
                .then_with(|| a.set_code.cmp(&b.set_code))
                .then_with(|| a.printing_id.cmp(&b.printing_id))
        });
        Some(Self { record, printings })
    }

    pub fn oracle_id(&self) -> &OracleId {
        &self.record.oracle_id
    }

    pub fn name(&self) -> &str {
        &self.record.name
    }

    pub fn record(&self) -> &CardRecord {
        &self.record
    }

    pub fn printings(&self) -> &[PrintingRecord] {
        &self.printings
    }

    /// Most recently released printing
    pub fn latest_printing(&self) -> &PrintingRecord {
        &self.printings[0]
    }
}

impl std::ops::Deref for Card {
    type Target = CardRecord;

    fn deref(&self) -> &CardRecord {
        &self.record
    }
}

/// Query text mapped to the oracle ids it resolved to, in discovery order
#[derive(Debug, Clone, PartialEq)]
pub struct QueryCacheEntry {
    pub query: String,
    pub oracle_ids: Vec<OracleId>,
    pub cached_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    pub hit_count: u64,
}
