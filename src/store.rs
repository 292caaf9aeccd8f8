//! SQLite card store.
//!
//! Three tables: `cards` (oracle-level data), `printings` (one row per
//! physical printing, referencing `cards`) and `query_cache` (query text to
//! the oracle ids it resolved to).
//!
//! Every write goes through one mutex per store; reads take a pooled
//! connection and never wait for that lock.

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use crate::config::DbLocation;
use crate::error::StoreResult;
use crate::models::{Card, CardRecord, OracleId, PrintingRecord, QueryCacheEntry};

/// Type alias for the connection pool
pub type ConnectionPool = Pool<SqliteConnectionManager>;

/// Type alias for a pooled connection
pub type PooledConn = PooledConnection<SqliteConnectionManager>;

/// Row counts per table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreStats {
    pub cards: u64,
    pub printings: u64,
    pub queries: u64,
}

/// Persistent card store
pub struct CardStore {
    pool: ConnectionPool,
    write_lock: Mutex<()>,
}

impl std::fmt::Debug for CardStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.pool.state();
        f.debug_struct("CardStore")
            .field("connections", &state.connections)
            .field("idle_connections", &state.idle_connections)
            .finish()
    }
}

/// Create tables if they don't exist
fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS cards (
            oracle_id       TEXT NOT NULL PRIMARY KEY,
            name            TEXT NOT NULL,
            type_line       TEXT NOT NULL,
            mana_cost       TEXT,
            oracle_text     TEXT,
            power           TEXT,
            toughness       TEXT,
            cmc             REAL NOT NULL,
            colors          TEXT NOT NULL,
            color_identity  TEXT NOT NULL,
            layout          TEXT NOT NULL,
            updated_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_cards_name ON cards(name COLLATE NOCASE);

        CREATE TABLE IF NOT EXISTS printings (
            printing_id      TEXT NOT NULL PRIMARY KEY,
            oracle_id        TEXT NOT NULL REFERENCES cards(oracle_id),
            set_code         TEXT NOT NULL,
            set_name         TEXT NOT NULL,
            rarity           TEXT NOT NULL,
            collector_number TEXT NOT NULL,
            image_uri        TEXT,
            scryfall_uri     TEXT NOT NULL,
            games            TEXT NOT NULL,
            released_at      TEXT NOT NULL,
            updated_at       TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_printings_oracle ON printings(oracle_id, released_at DESC);

        CREATE TABLE IF NOT EXISTS query_cache (
            query_text      TEXT NOT NULL PRIMARY KEY,
            oracle_ids      TEXT NOT NULL,
            cached_at       TEXT NOT NULL,
            last_accessed   TEXT NOT NULL,
            hit_count       INTEGER NOT NULL DEFAULT 0
        );
        ",
    )?;

    log::debug!("Card store schema initialized");
    Ok(())
}

/// Decode a JSON-encoded TEXT column
fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn card_from_row(row: &Row<'_>) -> rusqlite::Result<CardRecord> {
    Ok(CardRecord {
        oracle_id: OracleId::new(row.get::<_, String>(0)?),
        name: row.get(1)?,
        type_line: row.get(2)?,
        mana_cost: row.get(3)?,
        oracle_text: row.get(4)?,
        power: row.get(5)?,
        toughness: row.get(6)?,
        cmc: row.get(7)?,
        colors: json_column(row, 8)?,
        color_identity: json_column(row, 9)?,
        layout: row.get(10)?,
    })
}

fn printing_from_row(row: &Row<'_>) -> rusqlite::Result<PrintingRecord> {
    Ok(PrintingRecord {
        printing_id: row.get(0)?,
        oracle_id: OracleId::new(row.get::<_, String>(1)?),
        set_code: row.get(2)?,
        set_name: row.get(3)?,
        rarity: row.get(4)?,
        collector_number: row.get(5)?,
        image_uri: row.get(6)?,
        scryfall_uri: row.get(7)?,
        games: json_column(row, 8)?,
        released_at: row.get(9)?,
    })
}

const CARD_COLUMNS: &str = "oracle_id, name, type_line, mana_cost, oracle_text, power, toughness,
     cmc, colors, color_identity, layout";

impl CardStore {
    pub fn open(location: &DbLocation) -> StoreResult<Self> {
        match location {
            DbLocation::Memory => Self::open_in_memory(),
            DbLocation::File(path) => Self::open_file(path),
        }
    }

    /// Private in-memory database, alive as long as the store.
    ///
    /// Uses a single connection that is never recycled, since every new
    /// in-memory connection would be an empty database.
    pub fn open_in_memory() -> StoreResult<Self> {
        let manager = SqliteConnectionManager::memory().with_init(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            Ok(())
        });

        let pool = Pool::builder()
            .max_size(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .build(manager)?;

        Self::from_pool(pool)
    }

    /// File database in WAL mode, so readers proceed while a write is in progress
    pub fn open_file(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
                log::info!("Created directory: {}", parent.display());
            }
        }

        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.execute_batch(
                "PRAGMA foreign_keys = ON;
                 PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA busy_timeout = 5000;",
            )?;
            Ok(())
        });

        let pool = Pool::builder().max_size(8).build(manager)?;
        log::info!("Opened card store: {}", path.display());
        Self::from_pool(pool)
    }

    fn from_pool(pool: ConnectionPool) -> StoreResult<Self> {
        init_schema(&*pool.get()?)?;
        Ok(Self {
            pool,
            write_lock: Mutex::new(()),
        })
    }

    fn conn(&self) -> StoreResult<PooledConn> {
        Ok(self.pool.get()?)
    }

    /// Run `f` holding the store-wide write lock
    fn write<T>(&self, f: impl FnOnce(&Connection) -> StoreResult<T>) -> StoreResult<T> {
        // The lock guards no data, so a poisoned lock is still usable
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let conn = self.conn()?;
        f(&*conn)
    }

    // Writes

    /// Insert or overwrite a card record (last write wins)
    pub fn upsert_card(&self, card: &CardRecord) -> StoreResult<()> {
        let colors = serde_json::to_string(&card.colors)?;
        let color_identity = serde_json::to_string(&card.color_identity)?;

        self.write(|conn| {
            conn.execute(
                "INSERT INTO cards (
                    oracle_id, name, type_line, mana_cost, oracle_text, power, toughness,
                    cmc, colors, color_identity, layout, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                ON CONFLICT(oracle_id) DO UPDATE SET
                    name           = excluded.name,
                    type_line      = excluded.type_line,
                    mana_cost      = excluded.mana_cost,
                    oracle_text    = excluded.oracle_text,
                    power          = excluded.power,
                    toughness      = excluded.toughness,
                    cmc            = excluded.cmc,
                    colors         = excluded.colors,
                    color_identity = excluded.color_identity,
                    layout         = excluded.layout,
                    updated_at     = excluded.updated_at",
                params![
                    card.oracle_id.as_str(),
                    card.name,
                    card.type_line,
                    card.mana_cost,
                    card.oracle_text,
                    card.power,
                    card.toughness,
                    card.cmc,
                    colors,
                    color_identity,
                    card.layout,
                    Utc::now(),
                ],
            )?;
            Ok(())
        })?;

        log::debug!("Upserted card {} ({})", card.name, card.oracle_id);
        Ok(())
    }

    /// Insert or overwrite a printing. Its card record must already exist.
    pub fn upsert_printing(&self, printing: &PrintingRecord) -> StoreResult<()> {
        let games = serde_json::to_string(&printing.games)?;

        self.write(|conn| {
            conn.execute(
                "INSERT INTO printings (
                    printing_id, oracle_id, set_code, set_name, rarity, collector_number,
                    image_uri, scryfall_uri, games, released_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                ON CONFLICT(printing_id) DO UPDATE SET
                    oracle_id        = excluded.oracle_id,
                    set_code         = excluded.set_code,
                    set_name         = excluded.set_name,
                    rarity           = excluded.rarity,
                    collector_number = excluded.collector_number,
                    image_uri        = excluded.image_uri,
                    scryfall_uri     = excluded.scryfall_uri,
                    games            = excluded.games,
                    released_at      = excluded.released_at,
                    updated_at       = excluded.updated_at",
                params![
                    printing.printing_id,
                    printing.oracle_id.as_str(),
                    printing.set_code,
                    printing.set_name,
                    printing.rarity,
                    printing.collector_number,
                    printing.image_uri,
                    printing.scryfall_uri,
                    games,
                    printing.released_at,
                    Utc::now(),
                ],
            )?;
            Ok(())
        })
    }

    /// Record the oracle ids a query resolved to, replacing any previous entry
    pub fn cache_query(&self, query: &str, oracle_ids: &[OracleId]) -> StoreResult<()> {
        let ids: Vec<&str> = oracle_ids.iter().map(OracleId::as_str).collect();
        let encoded = serde_json::to_string(&ids)?;
        let now = Utc::now();

        self.write(|conn| {
            conn.execute(
                "INSERT INTO query_cache (query_text, oracle_ids, cached_at, last_accessed, hit_count)
                 VALUES (?1, ?2, ?3, ?3, 0)
                 ON CONFLICT(query_text) DO UPDATE SET
                    oracle_ids    = excluded.oracle_ids,
                    cached_at     = excluded.cached_at,
                    last_accessed = excluded.last_accessed,
                    hit_count     = 0",
                params![query, encoded, now],
            )?;
            Ok(())
        })?;

        log::debug!("Cached query '{}' -> {} card(s)", query, oracle_ids.len());
        Ok(())
    }

    /// Bump `last_accessed` and `hit_count`. Returns false if the query is not cached.
    pub fn touch_query(&self, query: &str) -> StoreResult<bool> {
        self.write(|conn| {
            let updated = conn.execute(
                "UPDATE query_cache
                 SET last_accessed = ?1, hit_count = hit_count + 1
                 WHERE query_text = ?2",
                params![Utc::now(), query],
            )?;
            Ok(updated > 0)
        })
    }

    /// Drop one cached query. Returns false if it was not cached.
    pub fn invalidate_query(&self, query: &str) -> StoreResult<bool> {
        self.write(|conn| {
            let deleted = conn.execute(
                "DELETE FROM query_cache WHERE query_text = ?1",
                params![query],
            )?;
            Ok(deleted > 0)
        })
    }

    /// Drop every cached query; card and printing data is kept
    pub fn clear_query_cache(&self) -> StoreResult<usize> {
        self.write(|conn| Ok(conn.execute("DELETE FROM query_cache", [])?))
    }

    // Reads

    /// Card record by oracle id (case-insensitive)
    pub fn card_by_oracle_id(&self, oracle_id: &OracleId) -> StoreResult<Option<CardRecord>> {
        let conn = self.conn()?;
        let card = conn
            .query_row(
                &format!("SELECT {CARD_COLUMNS} FROM cards WHERE oracle_id = ?1"),
                params![oracle_id.as_str()],
                card_from_row,
            )
            .optional()?;
        Ok(card)
    }

    /// Card record by case-insensitive exact name
    pub fn card_by_name(&self, name: &str) -> StoreResult<Option<CardRecord>> {
        let conn = self.conn()?;
        let card = conn
            .query_row(
                &format!(
                    "SELECT {CARD_COLUMNS} FROM cards
                     WHERE name = ?1 COLLATE NOCASE
                     ORDER BY oracle_id
                     LIMIT 1"
                ),
                params![name.trim()],
                card_from_row,
            )
            .optional()?;
        Ok(card)
    }

    /// All printings of a card, newest release first
    pub fn printings_for(&self, oracle_id: &OracleId) -> StoreResult<Vec<PrintingRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            "SELECT printing_id, oracle_id, set_code, set_name, rarity, collector_number,
                    image_uri, scryfall_uri, games, released_at
             FROM printings
             WHERE oracle_id = ?1
             ORDER BY released_at DESC, set_code, printing_id",
        )?;

        let printings = stmt
            .query_map(params![oracle_id.as_str()], printing_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(printings)
    }

    /// Card aggregate. `None` if the card is unknown or has no printings yet.
    pub fn load_card(&self, oracle_id: &OracleId) -> StoreResult<Option<Card>> {
        match self.card_by_oracle_id(oracle_id)? {
            Some(record) => self.assemble(record),
            None => Ok(None),
        }
    }

    /// Card aggregate by case-insensitive exact name
    pub fn load_card_by_name(&self, name: &str) -> StoreResult<Option<Card>> {
        match self.card_by_name(name)? {
            Some(record) => self.assemble(record),
            None => Ok(None),
        }
    }

    fn assemble(&self, record: CardRecord) -> StoreResult<Option<Card>> {
        let printings = self.printings_for(&record.oracle_id)?;
        if printings.is_empty() {
            log::debug!(
                "Card {} ({}) has no printings yet, treating as unresolved",
                record.name,
                record.oracle_id
            );
        }
        Ok(Card::new(record, printings))
    }

    /// Cached entry for exactly this query text
    pub fn cached_query(&self, query: &str) -> StoreResult<Option<QueryCacheEntry>> {
        let conn = self.conn()?;
        let entry = conn
            .query_row(
                "SELECT query_text, oracle_ids, cached_at, last_accessed, hit_count
                 FROM query_cache
                 WHERE query_text = ?1",
                params![query],
                |row| {
                    let ids: Vec<String> = json_column(row, 1)?;
                    let cached_at: DateTime<Utc> = row.get(2)?;
                    let last_accessed: DateTime<Utc> = row.get(3)?;
                    let hit_count: i64 = row.get(4)?;
                    Ok(QueryCacheEntry {
                        query: row.get(0)?,
                        oracle_ids: ids.into_iter().map(OracleId::from).collect(),
                        cached_at,
                        last_accessed,
                        hit_count: hit_count.max(0) as u64,
                    })
                },
            )
            .optional()?;
        Ok(entry)
    }

    pub fn stats(&self) -> StoreResult<StoreStats> {
        let conn = self.conn()?;
        let count = |table: &str| -> rusqlite::Result<u64> {
            let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })?;
            Ok(n.max(0) as u64)
        };

        Ok(StoreStats {
            cards: count("cards")?,
            printings: count("printings")?,
            queries: count("query_cache")?,
        })
    }

    /// Make every `query_cache` insert fail while reads keep working
    #[cfg(test)]
    pub(crate) fn reject_query_cache_writes(&self) -> StoreResult<()> {
        self.write(|conn| {
            conn.execute_batch(
                "CREATE TRIGGER reject_query_cache BEFORE INSERT ON query_cache
                 BEGIN
                     SELECT RAISE(ABORT, 'query cache is read-only');
                 END;",
            )?;
            Ok(())
        })
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
