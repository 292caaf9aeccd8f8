//! Decklist parsing, accumulation and export tests.

use std::sync::Arc;

use super::*;
use crate::cancel::{CancelSource, CancelToken};
use crate::error::Error;
use crate::resolver::Resolver;
use crate::scryfall::SearchClient;
use crate::store::CardStore;
use crate::test_support::{card, remote_card, Op, StubClient};

const CARDS: &[(&str, &str)] = &[
    ("bolt-id", "Lightning Bolt"),
    ("mountain-id", "Mountain"),
    ("island-id", "Island"),
    ("pyro-id", "Pyroblast"),
    ("reb-id", "Red Elemental Blast"),
    ("moon-id", "Blood Moon"),
    ("alpine-id", "Alpine Moon"),
    ("counter-id", "Counterspell"),
    ("erase-id", "Erase (Not the Urza's Legacy One)"),
];

fn setup() -> (Resolver, Arc<StubClient>) {
    let stub = Arc::new(
        StubClient::new().with_cards(
            CARDS
                .iter()
                .map(|(id, name)| remote_card(&format!("{id}-p"), id, name)),
        ),
    );
    let client: Arc<dyn SearchClient> = stub.clone();
    let store = Arc::new(CardStore::open_in_memory().unwrap());
    (Resolver::new(store, client), stub)
}

async fn parse(text: &str) -> crate::Result<Decklist> {
    let (resolver, _stub) = setup();
    resolver.parse_decklist(text, &CancelToken::none()).await
}

fn parse_kind(result: crate::Result<Decklist>) -> (usize, ParseErrorKind) {
    match result {
        Err(Error::Parse { line, kind }) => (line, kind),
        other => panic!("Expected a parse error, got: {other:?}"),
    }
}

fn quantities(entries: &[DeckEntry]) -> Vec<(&str, u32)> {
    entries
        .iter()
        .map(|e| (e.card.name(), e.quantity))
        .collect()
}

// ── parse_card_line ──────────────────────────────────────────────────

#[test]
fn test_card_line_plain() {
    let line = parse_card_line("4 Lightning Bolt").unwrap();
    assert_eq!(line.quantity, 4);
    assert_eq!(line.name, "Lightning Bolt");
    assert_eq!(line.set_code, None);
    assert_eq!(line.collector_number, None);
}

#[test]
fn test_card_line_with_printing() {
    let line = parse_card_line("4 Lightning Bolt (2ED) 161").unwrap();
    assert_eq!(line.name, "Lightning Bolt");
    assert_eq!(line.set_code.as_deref(), Some("2ED"));
    assert_eq!(line.collector_number.as_deref(), Some("161"));

    let line = parse_card_line("1 Thoughtcast (J25)").unwrap();
    assert_eq!(line.name, "Thoughtcast");
    assert_eq!(line.set_code.as_deref(), Some("J25"));
    assert_eq!(line.collector_number, None);

    let line = parse_card_line("4 Lightning Bolt (2ED) 161 *F*").unwrap();
    assert_eq!(line.name, "Lightning Bolt");
    assert_eq!(line.set_code.as_deref(), Some("2ED"));
    assert_eq!(line.collector_number.as_deref(), Some("161"));
}

#[test]
fn test_card_line_keeps_parentheses_in_name() {
    let line = parse_card_line("1 Erase (Not the Urza's Legacy One)").unwrap();
    assert_eq!(line.name, "Erase (Not the Urza's Legacy One)");
    assert_eq!(line.set_code, None);

    let line = parse_card_line("1 Erase (Not the Urza's Legacy One) (UNH) 23").unwrap();
    assert_eq!(line.name, "Erase (Not the Urza's Legacy One)");
    assert_eq!(line.set_code.as_deref(), Some("UNH"));
    assert_eq!(line.collector_number.as_deref(), Some("23"));
}

#[test]
fn test_card_line_errors() {
    let cases = [
        ("Lightning Bolt", ParseErrorKind::InvalidQuantity("Lightning".to_string())),
        ("4", ParseErrorKind::MissingName),
        ("", ParseErrorKind::InvalidQuantity(String::new())),
        ("0 Lightning Bolt", ParseErrorKind::InvalidQuantity("0".to_string())),
        ("-2 Lightning Bolt", ParseErrorKind::InvalidQuantity("-2".to_string())),
        ("not a number", ParseErrorKind::InvalidQuantity("not".to_string())),
    ];
    for (input, expected) in cases {
        assert_eq!(parse_card_line(input), Err(expected), "input: {input:?}");
    }
}

// ── parsing ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_parse_maindeck_and_sideboard() {
    let deck = parse("4 Lightning Bolt\n20 Mountain\n\nSideboard\n3 Pyroblast\n")
        .await
        .unwrap();

    assert_eq!(deck.count_main(), 24);
    assert_eq!(deck.count_sideboard(), 3);
    assert_eq!(
        quantities(deck.maindeck()),
        vec![("Lightning Bolt", 4), ("Mountain", 20)]
    );
    assert_eq!(quantities(deck.sideboard()), vec![("Pyroblast", 3)]);
}

#[tokio::test]
async fn test_printing_suffix_merges_into_one_entry() {
    let deck = parse("4 Lightning Bolt\n4 Lightning Bolt (2ED) 161\n")
        .await
        .unwrap();
    assert_eq!(quantities(deck.maindeck()), vec![("Lightning Bolt", 8)]);
}

#[tokio::test]
async fn test_same_card_in_both_sections_stays_separate() {
    let deck = parse("2 Pyroblast\nSideboard\n2 Pyroblast\n1 pyroblast\n")
        .await
        .unwrap();
    assert_eq!(quantities(deck.maindeck()), vec![("Pyroblast", 2)]);
    assert_eq!(quantities(deck.sideboard()), vec![("Pyroblast", 3)]);
}

#[tokio::test]
async fn test_full_arena_layout() {
    let text = "About\nName Mono Red\n\nDeck\n4 Lightning Bolt (2ED) 161\n20 Mountain\n\nSideboard\n2 Pyroblast (ICE) 213\n";
    let deck = parse(text).await.unwrap();
    assert_eq!(deck.count_main(), 24);
    assert_eq!(deck.count_sideboard(), 2);
}

#[tokio::test]
async fn test_empty_input_is_empty_deck() {
    let deck = parse("").await.unwrap();
    assert!(deck.is_empty());
    assert_eq!(deck.count_main(), 0);
    assert_eq!(deck.count_sideboard(), 0);
}

#[tokio::test]
async fn test_blank_lines_are_skipped_in_every_section() {
    let text = "\n\nAbout\n";
    // "About" only counts on the first line; elsewhere it is a card line
    assert!(matches!(
        parse_kind(parse(text).await),
        (3, ParseErrorKind::InvalidQuantity(_))
    ));

    // before Deck, after Deck, inside maindeck, between sections,
    // inside sideboard, trailing
    let text = "\n  \nDeck\n\n4 Lightning Bolt\n\n20 Mountain\n\n\nSideboard\n\n1 Pyroblast\n\n2 Blood Moon\n\n\n";
    let deck = parse(text).await.unwrap();
    assert_eq!(deck.count_main(), 24);
    assert_eq!(deck.count_sideboard(), 3);

    // blank line right after the About/Name preamble
    let deck = parse("About\nName Burn\n\n\n4 Lightning Bolt\n").await.unwrap();
    assert_eq!(deck.count_main(), 4);
}

#[tokio::test]
async fn test_markers_ignore_case_and_padding() {
    let deck = parse("  deck \n4 Lightning Bolt\n SIDEBOARD\n1 Pyroblast\n")
        .await
        .unwrap();
    assert_eq!(deck.count_main(), 4);
    assert_eq!(deck.count_sideboard(), 1);
}

// ── structural errors ────────────────────────────────────────────────

#[tokio::test]
async fn test_about_requires_name() {
    assert_eq!(
        parse_kind(parse("About\n4 Lightning Bolt\n").await),
        (2, ParseErrorKind::MissingDeckName)
    );
    assert_eq!(
        parse_kind(parse("About\n\nName Burn\n").await),
        (2, ParseErrorKind::MissingDeckName)
    );
    assert_eq!(
        parse_kind(parse("about").await),
        (2, ParseErrorKind::MissingDeckName)
    );
}

#[tokio::test]
async fn test_duplicate_sections_are_rejected() {
    assert_eq!(
        parse_kind(parse("Deck\n4 Lightning Bolt\nDeck\n").await),
        (3, ParseErrorKind::DuplicateDeck)
    );
    assert_eq!(
        parse_kind(parse("4 Lightning Bolt\nSideboard\n1 Pyroblast\nDeck\n").await),
        (4, ParseErrorKind::DeckAfterSideboard)
    );
    assert_eq!(
        parse_kind(parse("Sideboard\n1 Pyroblast\n\nSideboard\n").await),
        (4, ParseErrorKind::DuplicateSideboard)
    );
}

#[tokio::test]
async fn test_sideboard_limit_fails_at_crossing_line() {
    let text = "4 Lightning Bolt\n\nSideboard\n4 Pyroblast\n4 Red Elemental Blast\n4 Blood Moon\n4 Alpine Moon\n1 Nonexistent Card\n";
    let (line, kind) = parse_kind(parse(text).await);
    assert_eq!(line, 7);
    assert_eq!(
        kind,
        ParseErrorKind::SideboardTooLarge {
            total: 16,
            limit: 15
        }
    );
    assert!(kind.to_string().contains("exceeds 15 cards"));
}

#[tokio::test]
async fn test_fifteen_card_sideboard_is_accepted() {
    let text = "Sideboard\n4 Pyroblast\n4 Red Elemental Blast\n4 Blood Moon\n3 Alpine Moon\n";
    let deck = parse(text).await.unwrap();
    assert_eq!(deck.count_sideboard(), 15);
}

#[tokio::test]
async fn test_bad_card_line_names_the_line() {
    let (line, kind) = parse_kind(parse("4 Lightning Bolt\nx Mountain\n").await);
    assert_eq!(line, 2);
    assert_eq!(kind, ParseErrorKind::InvalidQuantity("x".to_string()));
}

#[tokio::test]
async fn test_quantity_overflow_is_a_parse_error() {
    let (line, kind) = parse_kind(parse("4000000000 Mountain\n4000000000 Mountain\n").await);
    assert_eq!(line, 2);
    assert_eq!(kind, ParseErrorKind::QuantityOverflow { quantity: 4_000_000_000 });

    // Different cards still share one section total
    let (line, kind) = parse_kind(parse("3000000000 Mountain\n2000000000 Island\n").await);
    assert_eq!(line, 2);
    assert_eq!(kind, ParseErrorKind::QuantityOverflow { quantity: 2_000_000_000 });
}

#[tokio::test]
async fn test_marked_printing_line_resolves() {
    let deck = parse("4 Lightning Bolt (2ED) 161 *F*\n").await.unwrap();
    assert_eq!(quantities(deck.maindeck()), vec![("Lightning Bolt", 4)]);
}

// ── resolution ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_unresolvable_card_aborts_parse() {
    let err = parse("4 Lightning Bolt\n1 Blightning Bolt\n")
        .await
        .unwrap_err();
    match &err {
        Error::DeckLine { line, text, .. } => {
            assert_eq!(*line, 2);
            assert_eq!(text, "1 Blightning Bolt");
        }
        other => panic!("Expected DeckLine error, got: {other:?}"),
    }
    assert!(matches!(err.root(), Error::NotFound(name) if name == "Blightning Bolt"));
}

#[tokio::test]
async fn test_ambiguous_line_lists_candidates() {
    let stub = Arc::new(StubClient::new().with_query(
        "Moon",
        vec![
            remote_card("moon-p", "moon-id", "Blood Moon"),
            remote_card("alpine-p", "alpine-id", "Alpine Moon"),
        ],
    ));
    let client: Arc<dyn SearchClient> = stub.clone();
    let resolver = Resolver::new(Arc::new(CardStore::open_in_memory().unwrap()), client);

    let err = resolver
        .parse_decklist("1 Moon\n", &CancelToken::none())
        .await
        .unwrap_err();
    match err.root() {
        Error::Ambiguous { candidates, .. } => {
            assert_eq!(candidates, &vec!["Blood Moon".to_string(), "Alpine Moon".to_string()]);
        }
        other => panic!("Expected Ambiguous, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_known_cards_resolve_from_store() {
    let (resolver, stub) = setup();
    let text = "4 Lightning Bolt\n20 Mountain\n";

    resolver
        .parse_decklist(text, &CancelToken::none())
        .await
        .unwrap();
    let before = stub.total_calls();

    let deck = resolver
        .parse_decklist(text, &CancelToken::none())
        .await
        .unwrap();
    assert_eq!(deck.count_main(), 24);
    assert_eq!(stub.total_calls(), before);
    assert_eq!(stub.calls(Op::ExactName), 2);
}

#[tokio::test]
async fn test_cancelled_parse_is_not_a_line_error() {
    let (resolver, _stub) = setup();
    let source = CancelSource::new();
    source.cancel();

    let result = resolver
        .parse_decklist("4 Lightning Bolt\n", &source.token())
        .await;
    assert!(matches!(result, Err(Error::Cancelled(_))));
}

// ── export and accessors ─────────────────────────────────────────────

#[tokio::test]
async fn test_export_round_trip() {
    let (resolver, _stub) = setup();
    let text = "Deck\n4 Lightning Bolt (2ED) 161\n10 Island\n10 Mountain\n4 Counterspell\n1 Erase (Not the Urza's Legacy One)\n\nSideboard\n2 Pyroblast (ICE) 213\n2 Blood Moon\n";
    let deck = resolver
        .parse_decklist(text, &CancelToken::none())
        .await
        .unwrap();

    let exported = deck.to_string();
    assert_eq!(
        exported,
        "4 Lightning Bolt\n10 Island\n10 Mountain\n4 Counterspell\n1 Erase (Not the Urza's Legacy One)\n\nSideboard\n2 Pyroblast\n2 Blood Moon\n"
    );

    let reparsed = resolver
        .parse_decklist(&exported, &CancelToken::none())
        .await
        .unwrap();
    assert_eq!(reparsed.count_main(), deck.count_main());
    assert_eq!(reparsed.count_sideboard(), deck.count_sideboard());
    assert_eq!(reparsed, deck);
}

#[test]
fn test_export_omits_empty_sideboard() {
    let deck = Decklist::builder()
        .maindeck(card("bolt-id", "Lightning Bolt"), 4)
        .build();
    assert_eq!(deck.to_string(), "4 Lightning Bolt\n");
}

#[test]
fn test_builder_merges_by_oracle_id() {
    let mut builder = DecklistBuilder::new();
    assert_eq!(builder.add(Section::Maindeck, card("bolt-id", "Lightning Bolt"), 4), Some(4));
    assert_eq!(builder.add(Section::Maindeck, card("BOLT-ID", "Lightning Bolt"), 2), Some(6));
    assert_eq!(builder.add(Section::Maindeck, card("guide-id", "Goblin Guide"), 0), Some(6));
    assert_eq!(builder.add(Section::Sideboard, card("bolt-id", "Lightning Bolt"), 1), Some(1));

    let deck = builder.build();
    assert_eq!(deck.maindeck().len(), 1);
    let bolt = OracleId::new("bolt-id");
    assert_eq!(deck.quantity_of(Section::Maindeck, &bolt), 6);
    assert_eq!(deck.quantity_of(Section::Sideboard, &bolt), 1);
    assert_eq!(deck.quantity_of(Section::Sideboard, &OracleId::new("guide-id")), 0);
    assert_eq!(deck.entries(Section::Sideboard).len(), 1);
}

#[test]
fn test_builder_refuses_overflowing_total() {
    let mut builder = DecklistBuilder::new();
    let mountain = card("mountain-id", "Mountain");
    assert_eq!(builder.add(Section::Maindeck, mountain, u32::MAX - 1), Some(u32::MAX - 1));
    assert_eq!(builder.add(Section::Maindeck, card("island-id", "Island"), 2), None);
    assert_eq!(builder.add(Section::Maindeck, card("mountain-id", "Mountain"), 2), None);
    assert_eq!(builder.add(Section::Maindeck, card("island-id", "Island"), 1), Some(u32::MAX));

    let deck = builder.maindeck(card("bolt-id", "Lightning Bolt"), 4).build();
    assert_eq!(deck.count_main(), u32::MAX);
    assert_eq!(
        quantities(deck.maindeck()),
        vec![("Mountain", u32::MAX - 1), ("Island", 1)]
    );
}

#[test]
fn test_expanded_card_lists() {
    let deck = Decklist::builder()
        .maindeck(card("bolt-id", "Lightning Bolt"), 2)
        .maindeck(card("mountain-id", "Mountain"), 3)
        .sideboard(card("pyro-id", "Pyroblast"), 1)
        .build();

    let main: Vec<&str> = deck.maindeck_cards().iter().map(|c| c.name()).collect();
    assert_eq!(
        main,
        vec!["Lightning Bolt", "Lightning Bolt", "Mountain", "Mountain", "Mountain"]
    );
    assert_eq!(deck.sideboard_cards().len(), 1);
}
