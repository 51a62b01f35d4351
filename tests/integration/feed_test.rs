//! Integration tests for the JSON-lines quote feed

use parity_arb::feed::{FeedError, FeedEvent, JsonLinesFeed, QuoteFeed};
use parity_arb::market::Side;
use rust_decimal_macros::dec;
use std::io::Write;
use tokio::io::BufReader;

#[tokio::test]
async fn test_file_feed_delivers_quotes_and_errors() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "# captured 2026-10-19").unwrap();
    writeln!(
        file,
        r#"{{"market":"btc-15m","side":"yes","bid":"0.44","ask":"0.45","size":"120"}}"#
    )
    .unwrap();
    writeln!(file).unwrap();
    writeln!(file, r#"{{"market":"btc-15m","side":"no","ask":"1.20"}}"#).unwrap();
    writeln!(file, r#"{{"market":"btc-15m","side":"no","ask":"0.52","size":"80"}}"#).unwrap();

    let reader = BufReader::new(tokio::fs::File::open(file.path()).await.unwrap());
    let feed = JsonLinesFeed::new(reader, "capture");
    let mut rx = feed.subscribe().await.unwrap();

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    assert_eq!(events.len(), 3);

    match &events[0] {
        FeedEvent::Quote(update) => {
            assert_eq!(update.side, Side::Yes);
            assert_eq!(update.ask, Some(dec!(0.45)));
            assert_eq!(update.size, dec!(120));
        }
        other => panic!("expected quote, got {:?}", other),
    }
    assert!(matches!(
        &events[1],
        FeedEvent::Malformed(FeedError::PriceOutOfRange { field: "ask", .. })
    ));
    assert!(matches!(&events[2], FeedEvent::Quote(u) if u.side == Side::No));
}

#[tokio::test]
async fn test_feed_subscribes_once() {
    let feed = JsonLinesFeed::new(BufReader::new(tokio::io::empty()), "empty");
    let mut rx = feed.subscribe().await.unwrap();
    assert!(rx.recv().await.is_none());
    assert!(feed.subscribe().await.is_err());
}
