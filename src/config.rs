//! Resolver configuration: where the card store lives and how the
//! Scryfall client talks to the API.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.scryfall.com";
pub const DEFAULT_USER_AGENT: &str = "ScryfallCache/1.0";
pub const DEFAULT_ACCEPT: &str = "application/json;q=0.9,*/*;q=0.8";

/// Scryfall asks for 50-100ms between requests
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_millis(100);

/// Location of the SQLite card store
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DbLocation {
    /// Lives as long as the store; nothing persists between runs
    #[default]
    Memory,
    File(PathBuf),
}

impl std::fmt::Display for DbLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DbLocation::Memory => f.write_str(":memory:"),
            DbLocation::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Settings for the HTTP search client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub user_agent: String,
    pub accept: String,
    /// Pause before every request
    pub request_delay: Duration,
    /// Optional HTTP proxy, e.g. `http://proxy:8080`
    pub proxy_url: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept: DEFAULT_ACCEPT.to_string(),
            request_delay: DEFAULT_REQUEST_DELAY,
            proxy_url: None,
        }
    }
}

/// Full resolver configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub database: DbLocation,
    pub client: ClientConfig,
}

impl Config {
    /// Defaults overlaid with `SCRYFALL_CACHE_DB`, `SCRYFALL_API_URL`,
    /// `SCRYFALL_PROXY_URL` and `SCRYFALL_USER_AGENT`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = non_empty("SCRYFALL_CACHE_DB") {
            config.database = DbLocation::File(PathBuf::from(path));
        }
        if let Some(url) = non_empty("SCRYFALL_API_URL") {
            config.client.api_url = url.trim_end_matches('/').to_string();
        }
        if let Some(proxy) = non_empty("SCRYFALL_PROXY_URL") {
            config.client.proxy_url = Some(proxy);
        }
        if let Some(agent) = non_empty("SCRYFALL_USER_AGENT") {
            config.client.user_agent = agent;
        }
        config
    }
}

/// Returns the default database path: ~/.local/share/scryfall_cache/cards.db
pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("scryfall_cache")
        .join("cards.db")
}
