//! Scryfall Cache - local card store for Magic: The Gathering tooling
//!
//! Resolves Scryfall queries, card names and oracle ids against a SQLite
//! card store, fetching from the Scryfall API only on a cache miss. Every
//! card handed out carries its full printing history. Arena-style decklists
//! are parsed into resolved cards, exported again and checked against
//! format rules.

pub mod cancel;
pub mod config;
pub mod decklist;
pub mod error;
pub mod models;
pub mod resolver;
pub mod scryfall;
pub mod shared;
pub mod store;

#[cfg(test)]
mod test_support;

pub use cancel::{CancelSource, CancelToken};
pub use config::{ClientConfig, Config, DbLocation};
pub use decklist::{Decklist, DecklistBuilder, DeckEntry, ParseErrorKind, Section, ValidationError};
pub use error::{Error, Result, StoreError};
pub use models::{Card, CardRecord, OracleId, PrintingRecord, QueryCacheEntry};
pub use resolver::{InsertWarning, Insertion, Resolver};
pub use scryfall::{ClientError, RemoteCard, ScryfallClient, SearchClient};
pub use store::{CardStore, StoreStats};
