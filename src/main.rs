//! Scryfall Cache - command line front end
//!
//! Resolves queries, card names, oracle ids and decklists against the
//! local card store, fetching from Scryfall on a cache miss.

use clap::{Parser, Subcommand, ValueEnum};
use scryfall_cache::config::default_db_path;
use scryfall_cache::{shared, Card, CancelToken, Config, DbLocation, Resolver};
use std::path::PathBuf;
use std::time::Duration;

/// MTG card cache - resolves Scryfall searches against a local SQLite store
#[derive(Parser, Debug)]
#[command(name = "scryfall_cache")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the SQLite card store (default: ~/.local/share/scryfall_cache/cards.db)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Use a throwaway in-memory store
    #[arg(long, global = true, conflicts_with = "database")]
    memory: bool,

    /// Scryfall API base URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Abandon remote calls after this many seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve a Scryfall search query
    Query { text: String },

    /// Resolve a card by exact name
    Card { name: String },

    /// Resolve a card by oracle id
    Oracle { id: String },

    /// Parse a decklist file, optionally validating it for a format
    Deck {
        file: PathBuf,

        /// Format rules to check
        #[arg(long, value_enum)]
        format: Option<Format>,

        /// Print the decklist in export format
        #[arg(long, default_value_t = false)]
        export: bool,
    },

    /// Forget a cached query
    Invalidate { query: String },

    /// Show card store row counts
    Stats,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum Format {
    Constructed,
    Limited,
    Singleton,
    FourOfs,
}

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = build_config(&args);

    log::info!("Starting scryfall_cache...");
    log::info!("Card store: {}", config.database);

    let resolver = match shared::init(&config) {
        Ok(resolver) => resolver,
        Err(e) => {
            log::error!("Failed to open card store: {}", e);
            std::process::exit(1);
        }
    };

    let cancel = match args.timeout_secs {
        Some(secs) => CancelToken::none().with_timeout(Duration::from_secs(secs)),
        None => CancelToken::none(),
    };

    if let Err(e) = run(args.command, resolver, &cancel).await {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

/// Environment first, then command line flags. Without either, the CLI
/// keeps its store on disk.
fn build_config(args: &Args) -> Config {
    let mut config = Config::from_env();

    if args.memory {
        config.database = DbLocation::Memory;
    } else if let Some(ref path) = args.database {
        config.database = DbLocation::File(path.clone());
    } else if config.database == DbLocation::Memory {
        config.database = DbLocation::File(default_db_path());
    }

    if let Some(ref url) = args.api_url {
        config.client.api_url = url.trim_end_matches('/').to_string();
    }
    config
}

async fn run(command: Command, resolver: &Resolver, cancel: &CancelToken) -> scryfall_cache::Result<()> {
    match command {
        Command::Query { text } => {
            let cards = resolver.resolve_query(&text, cancel).await?;
            println!("{} card(s) for '{}'", cards.len(), text);
            for card in &cards {
                print_card(card);
            }
        }
        Command::Card { name } => {
            let card = resolver.resolve_name(&name, cancel).await?;
            print_card(&card);
        }
        Command::Oracle { id } => {
            let card = resolver.resolve_identity(&id, cancel).await?;
            print_card(&card);
        }
        Command::Deck {
            file,
            format,
            export,
        } => {
            let text = std::fs::read_to_string(&file).map_err(|e| {
                scryfall_cache::Error::Config(format!("cannot read {}: {}", file.display(), e))
            })?;
            let deck = resolver.parse_decklist(&text, cancel).await?;
            println!(
                "{}: {} maindeck, {} sideboard card(s)",
                file.display(),
                deck.count_main(),
                deck.count_sideboard()
            );

            if let Some(format) = format {
                match format {
                    Format::Constructed => deck.validate_constructed(),
                    Format::Limited => deck.validate_limited(),
                    Format::Singleton => deck.validate_singleton(),
                    Format::FourOfs => deck.validate_four_ofs(),
                }?;
                println!("Legal for {:?}", format);
            }

            if export {
                print!("{}", deck);
            }
        }
        Command::Invalidate { query } => {
            if resolver.invalidate_query(&query)? {
                println!("Removed cached query '{}'", query);
            } else {
                println!("Query '{}' was not cached", query);
            }
        }
        Command::Stats => {
            let stats = resolver
                .store()
                .stats()
                .map_err(|e| scryfall_cache::Error::Store {
                    input: "stats".to_string(),
                    source: e,
                })?;
            println!("Cards:     {}", stats.cards);
            println!("Printings: {}", stats.printings);
            println!("Queries:   {}", stats.queries);
        }
    }
    Ok(())
}

fn print_card(card: &Card) {
    let latest = card.latest_printing();
    println!(
        "{} {} - {} [{}]",
        card.name(),
        card.mana_cost.as_deref().unwrap_or(""),
        card.type_line,
        card.oracle_id()
    );
    println!(
        "    {} printing(s), latest {} ({}) {}",
        card.printings().len(),
        latest.set_name,
        latest.set_code.to_uppercase(),
        latest.released_at
    );
}
