//! In-memory search client and record builders for unit tests.

use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Barrier;

use crate::models::{Card, CardRecord, PrintingRecord};
use crate::scryfall::{ClientError, ClientResult, RemoteCard, SearchClient};

/// Remote card with enough fields filled in to be stored
pub fn remote_card(printing_id: &str, oracle_id: &str, name: &str) -> RemoteCard {
    RemoteCard {
        id: printing_id.to_string(),
        oracle_id: Some(oracle_id.to_string()),
        name: name.to_string(),
        type_line: Some("Instant".to_string()),
        cmc: 1.0,
        layout: "normal".to_string(),
        set: "lea".to_string(),
        set_name: "Limited Edition Alpha".to_string(),
        rarity: "common".to_string(),
        collector_number: "1".to_string(),
        games: vec!["paper".to_string()],
        released_at: "1993-08-05".to_string(),
        scryfall_uri: format!("https://scryfall.com/card/{printing_id}"),
        ..Default::default()
    }
}

/// Card aggregate with a single printing, bypassing store and client
pub fn card(oracle_id: &str, name: &str) -> Card {
    let remote = remote_card(&format!("{oracle_id}-print"), oracle_id, name);
    let record = CardRecord::from_remote(&remote).unwrap();
    let printing = PrintingRecord::from_remote(&remote).unwrap();
    Card::new(record, vec![printing]).unwrap()
}

/// Another printing of `card` in a different set
pub fn reprint(card: &RemoteCard, printing_id: &str, set: &str, released_at: &str) -> RemoteCard {
    RemoteCard {
        id: printing_id.to_string(),
        set: set.to_string(),
        set_name: set.to_uppercase(),
        released_at: released_at.to_string(),
        prints_search_uri: None,
        ..card.clone()
    }
}

/// Stub operations, for call counting and failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Query,
    ExactName,
    Identifier,
    Printings,
}

const OPS: [Op; 4] = [Op::Query, Op::ExactName, Op::Identifier, Op::Printings];

/// Scripted [`SearchClient`].
///
/// Exact-name, identifier and printing lookups answer from a catalog of
/// printings; free-text queries answer from explicitly registered results.
#[derive(Default)]
pub struct StubClient {
    catalog: Vec<RemoteCard>,
    queries: HashMap<String, Vec<RemoteCard>>,
    exact_overrides: HashMap<String, Vec<RemoteCard>>,
    failing: Mutex<HashSet<Op>>,
    calls: [AtomicUsize; 4],
    query_barrier: Option<Arc<Barrier>>,
}

impl StubClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add printings to the catalog
    pub fn with_cards(mut self, cards: impl IntoIterator<Item = RemoteCard>) -> Self {
        self.catalog.extend(cards);
        self
    }

    /// Results for one free-text query
    pub fn with_query(mut self, query: &str, results: Vec<RemoteCard>) -> Self {
        self.queries.insert(query.to_string(), results);
        self
    }

    /// Replace the catalog answer for an exact-name search
    pub fn with_exact(mut self, name: &str, results: Vec<RemoteCard>) -> Self {
        self.exact_overrides.insert(name.to_lowercase(), results);
        self
    }

    /// Make every free-text search wait on `barrier` before answering
    pub fn with_query_barrier(mut self, barrier: Arc<Barrier>) -> Self {
        self.query_barrier = Some(barrier);
        self
    }

    pub fn fail(&self, op: Op) {
        self.lock_failing().insert(op);
    }

    pub fn recover(&self, op: Op) {
        self.lock_failing().remove(&op);
    }

    pub fn calls(&self, op: Op) -> usize {
        self.calls[Self::slot(op)].load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        OPS.iter().map(|op| self.calls(*op)).sum()
    }

    fn slot(op: Op) -> usize {
        OPS.iter().position(|o| *o == op).unwrap()
    }

    fn lock_failing(&self) -> std::sync::MutexGuard<'_, HashSet<Op>> {
        self.failing.lock().unwrap()
    }

    fn record(&self, op: Op) -> ClientResult<()> {
        self.calls[Self::slot(op)].fetch_add(1, Ordering::SeqCst);
        if self.lock_failing().contains(&op) {
            return Err(ClientError::HttpStatus(StatusCode::SERVICE_UNAVAILABLE));
        }
        Ok(())
    }

    /// First catalog printing per oracle id, filtered by `keep`
    fn representatives(&self, keep: impl Fn(&RemoteCard) -> bool) -> Vec<RemoteCard> {
        let mut seen = HashSet::new();
        self.catalog
            .iter()
            .filter(|c| keep(c))
            .filter(|c| seen.insert(c.oracle_id().map(str::to_lowercase)))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl SearchClient for StubClient {
    async fn search_by_query(&self, query: &str) -> ClientResult<Vec<RemoteCard>> {
        self.record(Op::Query)?;
        if let Some(barrier) = &self.query_barrier {
            barrier.wait().await;
        }
        Ok(self.queries.get(query).cloned().unwrap_or_default())
    }

    async fn search_by_exact_name(&self, name: &str) -> ClientResult<Vec<RemoteCard>> {
        self.record(Op::ExactName)?;
        if let Some(results) = self.exact_overrides.get(&name.to_lowercase()) {
            return Ok(results.clone());
        }
        Ok(self.representatives(|c| c.name.eq_ignore_ascii_case(name)))
    }

    async fn search_by_identifier(&self, oracle_id: &str) -> ClientResult<Vec<RemoteCard>> {
        self.record(Op::Identifier)?;
        Ok(self.representatives(|c| {
            c.oracle_id()
                .is_some_and(|id| id.eq_ignore_ascii_case(oracle_id))
        }))
    }

    async fn fetch_all_printings(&self, card: &RemoteCard) -> ClientResult<Vec<RemoteCard>> {
        self.record(Op::Printings)?;
        let Some(oracle_id) = card.oracle_id() else {
            return Ok(Vec::new());
        };
        Ok(self
            .catalog
            .iter()
            .filter(|c| {
                c.oracle_id()
                    .is_some_and(|id| id.eq_ignore_ascii_case(oracle_id))
            })
            .cloned()
            .collect())
    }
}
