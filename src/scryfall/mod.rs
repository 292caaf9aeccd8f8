//! Remote search client for the Scryfall API

mod client;
mod types;

pub use client::ScryfallClient;
pub use types::{CardFace, ImageUris, RemoteCard, ScryfallError, ScryfallList};

use async_trait::async_trait;
use thiserror::Error;

/// Remote client failures
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    /// Failed to parse JSON response
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),
    /// Scryfall returned an error object
    #[error("{code} ({status}): {details}")]
    Api {
        status: u16,
        code: String,
        details: String,
    },
    /// HTTP error status without a readable error object
    #[error("HTTP error: {0}")]
    HttpStatus(reqwest::StatusCode),
}

/// Result alias for remote client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Source of remote card records.
///
/// Every method exhausts pagination and returns one logical sequence.
/// Calls are independent, so a sequence can be fetched again at any time.
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Full-text Scryfall search
    async fn search_by_query(&self, query: &str) -> ClientResult<Vec<RemoteCard>>;

    /// Quoted exact-name search (`!"name"`)
    async fn search_by_exact_name(&self, name: &str) -> ClientResult<Vec<RemoteCard>>;

    /// Records sharing one oracle id
    async fn search_by_identifier(&self, oracle_id: &str) -> ClientResult<Vec<RemoteCard>>;

    /// Every printing of `card`, across all sets
    async fn fetch_all_printings(&self, card: &RemoteCard) -> ClientResult<Vec<RemoteCard>>;
}
