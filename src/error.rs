//! Error types for scryfall_cache

use thiserror::Error;

use crate::decklist::{ParseErrorKind, ValidationError};
use crate::scryfall::ClientError;

/// Unified error type for resolver, store and decklist operations.
///
/// Remote and store failures carry the input (query text, card name or
/// oracle id) of the operation that hit them.
#[derive(Debug, Error)]
pub enum Error {
    /// Query, name or identifier has never been resolved into the local store
    #[error("not cached: {0}")]
    NotCached(String),

    /// The remote source has no such card
    #[error("card not found: {0}")]
    NotFound(String),

    /// Several candidates match a name and none of them matches exactly
    #[error("ambiguous card name '{name}', could be: {}", .candidates.join(", "))]
    Ambiguous {
        name: String,
        candidates: Vec<String>,
    },

    /// A cached oracle id no longer resolves to a complete card in the store
    #[error("cache entry for '{input}' references oracle_id {oracle_id}, which is missing from the card store")]
    CacheInconsistent { input: String, oracle_id: String },

    /// Network or API failure while fetching the primary record
    #[error("remote search failed for '{input}': {source}")]
    RemoteUnavailable {
        input: String,
        #[source]
        source: ClientError,
    },

    /// The primary remote record cannot be stored (no oracle id)
    #[error("remote card '{0}' has no oracle_id")]
    MalformedRecord(String),

    /// Underlying persistence failure
    #[error("card store error for '{input}': {source}")]
    Store {
        input: String,
        #[source]
        source: StoreError,
    },

    /// Malformed decklist structure or card line
    #[error("decklist line {line}: {kind}")]
    Parse { line: usize, kind: ParseErrorKind },

    /// A decklist card line could not be resolved to a card
    #[error("decklist line {line} ('{text}'): {source}")]
    DeckLine {
        line: usize,
        text: String,
        #[source]
        source: Box<Error>,
    },

    /// Format legality violation
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The caller's cancellation token fired or its deadline passed
    #[error("operation cancelled: {0}")]
    Cancelled(String),

    /// The process-wide resolver was configured twice
    #[error("the default resolver is already initialized")]
    AlreadyInitialized,

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn remote(input: impl Into<String>, source: ClientError) -> Self {
        Error::RemoteUnavailable {
            input: input.into(),
            source,
        }
    }

    pub(crate) fn store(input: impl Into<String>, source: StoreError) -> Self {
        Error::Store {
            input: input.into(),
            source,
        }
    }

    /// Strip the decklist line annotation, if any
    pub fn root(&self) -> &Error {
        match self {
            Error::DeckLine { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Card store failures
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("column encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for resolver and decklist operations
pub type Result<T> = std::result::Result<T, Error>;

/// Result alias for card store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;
