//! Card resolver: answers queries, names and oracle ids from the card
//! store, falling back to the remote search client and caching what it
//! fetches.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;

use crate::cancel::CancelToken;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{Card, CardRecord, OracleId, PrintingRecord};
use crate::scryfall::{RemoteCard, ScryfallClient, SearchClient};
use crate::store::CardStore;

/// Failure swallowed while inserting a card
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InsertWarning {
    /// The printing history could not be fetched; only the printings seen
    /// directly were stored
    #[error("printing history unavailable: {reason}")]
    HistoryUnavailable { reason: String },

    /// One printing was not stored
    #[error("printing {printing_id} skipped: {reason}")]
    PrintingSkipped { printing_id: String, reason: String },
}

/// Result of inserting one card: the aggregate as persisted, plus every
/// non-fatal failure met on the way
#[derive(Debug, Clone)]
pub struct Insertion {
    pub card: Card,
    pub warnings: Vec<InsertWarning>,
}

/// How a failed or empty exact-name search is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NameSearch {
    /// Exact-search errors propagate; only an empty result falls back
    Strict,
    /// Any exact-search failure falls back to the broader search
    Lenient,
}

/// Resolves cards against one store and one remote client.
///
/// Cheap to clone; clones share the store and client.
#[derive(Clone)]
pub struct Resolver {
    store: Arc<CardStore>,
    client: Arc<dyn SearchClient>,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl Resolver {
    pub fn new(store: Arc<CardStore>, client: Arc<dyn SearchClient>) -> Self {
        Self { store, client }
    }

    /// Open the configured store and build a Scryfall client
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = CardStore::open(&config.database)
            .map_err(|e| Error::store(config.database.to_string(), e))?;
        let client = ScryfallClient::new(&config.client)
            .map_err(|e| Error::Config(format!("cannot build Scryfall client: {e}")))?;
        Ok(Self::new(Arc::new(store), Arc::new(client)))
    }

    pub fn store(&self) -> &Arc<CardStore> {
        &self.store
    }

    /// Every card matching a Scryfall query, one per oracle id, in the
    /// order the remote listed them
    pub async fn resolve_query(&self, query: &str, cancel: &CancelToken) -> Result<Vec<Card>> {
        cancel.check(query)?;

        if let Some(cards) = self.query_from_cache(query)? {
            return Ok(cards);
        }

        log::info!("Query cache miss for '{}', searching Scryfall", query);
        let results = cancel
            .guard(query, self.client.search_by_query(query))
            .await?
            .map_err(|e| Error::remote(query, e))?;

        let groups = group_by_oracle_id(results);
        let mut cards = Vec::with_capacity(groups.len());
        for group in &groups {
            let insertion = self.insert_group(&group[0], &group[1..], cancel).await?;
            cards.push(insertion.card);
        }

        let oracle_ids: Vec<OracleId> = cards.iter().map(|c| c.oracle_id().clone()).collect();
        if let Err(e) = self.store.cache_query(query, &oracle_ids) {
            log::warn!("Failed to cache query '{}': {}", query, e);
        }

        log::info!("Resolved query '{}' to {} card(s)", query, cards.len());
        Ok(cards)
    }

    /// Card with exactly this name (case-insensitive).
    ///
    /// An unknown name is searched remotely, first quoted and then, if that
    /// finds nothing, unquoted.
    pub async fn resolve_name(&self, name: &str, cancel: &CancelToken) -> Result<Card> {
        self.resolve_name_with(name, NameSearch::Strict, cancel)
            .await
    }

    /// Name resolution for decklist lines: an exact search that fails
    /// for any reason falls back to the broader search
    pub(crate) async fn resolve_deck_name(&self, name: &str, cancel: &CancelToken) -> Result<Card> {
        self.resolve_name_with(name, NameSearch::Lenient, cancel)
            .await
    }

    /// Card by oracle id. A stored card never causes a remote call.
    pub async fn resolve_identity(&self, oracle_id: &str, cancel: &CancelToken) -> Result<Card> {
        cancel.check(oracle_id)?;
        let id = OracleId::new(oracle_id);

        if let Some(card) = self
            .store
            .load_card(&id)
            .map_err(|e| Error::store(oracle_id, e))?
        {
            log::info!("Card cache hit for oracle_id {}", id);
            return Ok(card);
        }

        log::info!("Card cache miss for oracle_id {}, searching Scryfall", id);
        let results = cancel
            .guard(oracle_id, self.client.search_by_identifier(id.as_str()))
            .await?
            .map_err(|e| Error::remote(oracle_id, e))?;

        let Some(representative) = results.first() else {
            return Err(Error::NotFound(oracle_id.to_string()));
        };
        Ok(self.insert_card(representative, cancel).await?.card)
    }

    /// Store a remote card with its full printing history and return it as
    /// persisted
    pub async fn insert_card(&self, card: &RemoteCard, cancel: &CancelToken) -> Result<Insertion> {
        self.insert_group(card, &[], cancel).await
    }

    /// Cards a query resolved to earlier; `NotCached` if it never was
    pub fn cached_query(&self, query: &str) -> Result<Vec<Card>> {
        self.query_from_cache(query)?
            .ok_or_else(|| Error::NotCached(query.to_string()))
    }

    pub fn cached_card_by_name(&self, name: &str) -> Result<Card> {
        self.store
            .load_card_by_name(name)
            .map_err(|e| Error::store(name, e))?
            .ok_or_else(|| Error::NotCached(name.to_string()))
    }

    pub fn cached_card(&self, oracle_id: &str) -> Result<Card> {
        self.store
            .load_card(&OracleId::new(oracle_id))
            .map_err(|e| Error::store(oracle_id, e))?
            .ok_or_else(|| Error::NotCached(oracle_id.to_string()))
    }

    /// All or nothing: the first uncached name fails the whole lookup
    pub fn cached_cards_by_names<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<Card>> {
        names
            .iter()
            .map(|name| self.cached_card_by_name(name.as_ref()))
            .collect()
    }

    /// All or nothing: the first uncached oracle id fails the whole lookup
    pub fn cached_cards<S: AsRef<str>>(&self, oracle_ids: &[S]) -> Result<Vec<Card>> {
        oracle_ids
            .iter()
            .map(|id| self.cached_card(id.as_ref()))
            .collect()
    }

    /// Forget a cached query so the next resolution searches again.
    /// Returns false if the query was not cached.
    pub fn invalidate_query(&self, query: &str) -> Result<bool> {
        let removed = self
            .store
            .invalidate_query(query)
            .map_err(|e| Error::store(query, e))?;
        if removed {
            log::info!("Invalidated cached query '{}'", query);
        }
        Ok(removed)
    }

    /// `None` on a cache miss. Every cached oracle id must still load.
    fn query_from_cache(&self, query: &str) -> Result<Option<Vec<Card>>> {
        let Some(entry) = self
            .store
            .cached_query(query)
            .map_err(|e| Error::store(query, e))?
        else {
            return Ok(None);
        };

        let mut cards = Vec::with_capacity(entry.oracle_ids.len());
        for oracle_id in &entry.oracle_ids {
            let card = self
                .store
                .load_card(oracle_id)
                .map_err(|e| Error::store(query, e))?
                .ok_or_else(|| Error::CacheInconsistent {
                    input: query.to_string(),
                    oracle_id: oracle_id.to_string(),
                })?;
            cards.push(card);
        }

        if let Err(e) = self.store.touch_query(query) {
            log::warn!("Failed to update cache bookkeeping for '{}': {}", query, e);
        }

        log::info!("Query cache hit for '{}' ({} card(s))", query, cards.len());
        Ok(Some(cards))
    }

    async fn resolve_name_with(
        &self,
        name: &str,
        mode: NameSearch,
        cancel: &CancelToken,
    ) -> Result<Card> {
        cancel.check(name)?;

        if let Some(card) = self
            .store
            .load_card_by_name(name)
            .map_err(|e| Error::store(name, e))?
        {
            log::info!("Card cache hit for '{}'", name);
            return Ok(card);
        }

        log::info!("Card cache miss for '{}', searching Scryfall", name);
        let exact = match cancel
            .guard(name, self.client.search_by_exact_name(name))
            .await?
        {
            Ok(results) => results,
            Err(e) if mode == NameSearch::Lenient => {
                log::warn!("Exact search for '{}' failed, trying a broader search: {}", name, e);
                Vec::new()
            }
            Err(e) => return Err(Error::remote(name, e)),
        };

        let candidates = if exact.is_empty() {
            log::debug!("No exact match for '{}', trying a broader search", name);
            cancel
                .guard(name, self.client.search_by_query(name))
                .await?
                .map_err(|e| Error::remote(name, e))?
        } else {
            exact
        };

        let chosen = pick_candidate(name, candidates)?;
        Ok(self.insert_card(&chosen, cancel).await?.card)
    }

    /// Insert `representative` with its printing history. `extras` are other
    /// records of the same card seen alongside it; they are stored as
    /// printings too.
    async fn insert_group(
        &self,
        representative: &RemoteCard,
        extras: &[RemoteCard],
        cancel: &CancelToken,
    ) -> Result<Insertion> {
        let input = representative.name.as_str();
        let (Some(record), Some(own_printing)) = (
            CardRecord::from_remote(representative),
            PrintingRecord::from_remote(representative),
        ) else {
            return Err(Error::MalformedRecord(representative.name.clone()));
        };
        let oracle_id = record.oracle_id.clone();

        self.store
            .upsert_card(&record)
            .map_err(|e| Error::store(input, e))?;
        self.store
            .upsert_printing(&own_printing)
            .map_err(|e| Error::store(input, e))?;

        let mut warnings = Vec::new();
        for extra in extras {
            self.store_printing(extra, &oracle_id, &mut warnings);
        }

        match cancel
            .guard(input, self.client.fetch_all_printings(representative))
            .await?
        {
            Ok(history) => {
                log::debug!("Fetched {} printing(s) of {}", history.len(), input);
                for printing in &history {
                    self.store_printing(printing, &oracle_id, &mut warnings);
                }
            }
            Err(e) => {
                log::warn!("Printing history of {} unavailable: {}", input, e);
                warnings.push(InsertWarning::HistoryUnavailable {
                    reason: e.to_string(),
                });
            }
        }

        let card = self
            .store
            .load_card(&oracle_id)
            .map_err(|e| Error::store(input, e))?
            .ok_or_else(|| Error::CacheInconsistent {
                input: input.to_string(),
                oracle_id: oracle_id.to_string(),
            })?;

        if warnings.is_empty() {
            log::info!("Stored {} with {} printing(s)", card.name(), card.printings().len());
        } else {
            log::warn!(
                "Stored {} with {} printing(s), {} warning(s)",
                card.name(),
                card.printings().len(),
                warnings.len()
            );
        }

        Ok(Insertion { card, warnings })
    }

    /// Upsert one printing of `oracle_id`, recording a warning instead of failing
    fn store_printing(
        &self,
        remote: &RemoteCard,
        oracle_id: &OracleId,
        warnings: &mut Vec<InsertWarning>,
    ) {
        let skipped = |reason: String| InsertWarning::PrintingSkipped {
            printing_id: remote.id.clone(),
            reason,
        };

        let warning = match PrintingRecord::from_remote(remote) {
            None => skipped("missing oracle_id".to_string()),
            Some(printing) if printing.oracle_id != *oracle_id => {
                skipped(format!("belongs to oracle_id {}", printing.oracle_id))
            }
            Some(printing) => match self.store.upsert_printing(&printing) {
                Ok(()) => return,
                Err(e) => skipped(e.to_string()),
            },
        };

        log::warn!("{}", warning);
        warnings.push(warning);
    }
}

/// Partition records by oracle id, groups in order of first appearance.
/// Records without an oracle id are dropped.
fn group_by_oracle_id(records: Vec<RemoteCard>) -> Vec<Vec<RemoteCard>> {
    let mut groups: Vec<Vec<RemoteCard>> = Vec::new();
    let mut index: HashMap<OracleId, usize> = HashMap::new();

    for record in records {
        let Some(oracle_id) = record.oracle_id().map(OracleId::new) else {
            log::debug!("Dropping {} ({}): no oracle_id", record.name, record.id);
            continue;
        };
        match index.get(&oracle_id) {
            Some(&slot) => groups[slot].push(record),
            None => {
                index.insert(oracle_id, groups.len());
                groups.push(vec![record]);
            }
        }
    }
    groups
}

/// Pick the card a name refers to: an exact case-insensitive match, else
/// the only candidate, else `Ambiguous`
fn pick_candidate(name: &str, candidates: Vec<RemoteCard>) -> Result<RemoteCard> {
    if candidates.is_empty() {
        return Err(Error::NotFound(name.to_string()));
    }

    let mut seen = HashSet::new();
    let mut unique: Vec<RemoteCard> = Vec::new();
    let mut malformed = None;
    for candidate in candidates {
        match candidate.oracle_id().map(OracleId::new) {
            Some(oracle_id) => {
                if seen.insert(oracle_id) {
                    unique.push(candidate);
                }
            }
            None => {
                malformed.get_or_insert(candidate.name);
            }
        }
    }

    if unique.is_empty() {
        return Err(Error::MalformedRecord(
            malformed.unwrap_or_else(|| name.to_string()),
        ));
    }

    let wanted = name.trim().to_lowercase();
    if let Some(pos) = unique.iter().position(|c| c.name.to_lowercase() == wanted) {
        return Ok(unique.swap_remove(pos));
    }

    if unique.len() == 1 {
        return Ok(unique.swap_remove(0));
    }

    Err(Error::Ambiguous {
        name: name.to_string(),
        candidates: unique.into_iter().map(|c| c.name).collect(),
    })
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
