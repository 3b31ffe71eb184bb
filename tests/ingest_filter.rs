// tests/ingest_filter.rs
//
// Ingestion filter properties: empty-text, no-keyword, and duplicate-title
// messages never write; qualifying messages write exactly one Post with the
// matched keyword subset.

use chrono::{DateTime, Duration, TimeZone, Utc};
use news_digest_bot::ingest::types::InboundMessage;
use news_digest_bot::{process_message, IngestOutcome, KeywordConfig, PostStore};

fn msg(text: Option<&str>, ts: DateTime<Utc>) -> InboundMessage {
    InboundMessage {
        chat_id: -1001,
        message_id: 42,
        date: ts,
        text: text.map(|s| s.to_string()),
    }
}

async fn stored_count(store: &PostStore) -> usize {
    let epoch = Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap();
    store.fetch_since(epoch, false).await.unwrap().len()
}

#[tokio::test]
async fn message_without_text_writes_nothing() {
    let store = PostStore::open_in_memory().await.unwrap();
    let kw = KeywordConfig::builtin();
    let ts = Utc.with_ymd_and_hms(2026, 8, 7, 10, 0, 0).unwrap();

    let out = process_message(&store, &kw, &msg(None, ts)).await.unwrap();
    assert_eq!(out, IngestOutcome::EmptyText);

    let out = process_message(&store, &kw, &msg(Some("   \n \n"), ts))
        .await
        .unwrap();
    assert_eq!(out, IngestOutcome::EmptyText);

    assert_eq!(stored_count(&store).await, 0);
}

#[tokio::test]
async fn message_without_keywords_writes_nothing() {
    let store = PostStore::open_in_memory().await.unwrap();
    let kw = KeywordConfig::builtin();
    let ts = Utc.with_ymd_and_hms(2026, 8, 7, 10, 0, 0).unwrap();

    let out = process_message(&store, &kw, &msg(Some("Погода сегодня отличная"), ts))
        .await
        .unwrap();
    assert_eq!(out, IngestOutcome::NoKeywordMatch);
    assert_eq!(stored_count(&store).await, 0);
}

#[tokio::test]
async fn qualifying_message_writes_one_post_with_matched_subset() {
    let store = PostStore::open_in_memory().await.unwrap();
    let kw = KeywordConfig::builtin();
    let ts = Utc.with_ymd_and_hms(2026, 8, 7, 10, 0, 0).unwrap();

    let text = "Газпром и нефть: экспорт растёт";
    let out = process_message(&store, &kw, &msg(Some(text), ts))
        .await
        .unwrap();
    let IngestOutcome::Saved { keywords } = out else {
        panic!("expected Saved, got {out:?}");
    };
    assert_eq!(keywords, vec!["газпром".to_string(), "нефть".to_string()]);

    let epoch = Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap();
    let rows = store.fetch_since(epoch, false).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].title, "Газпром и нефть: экспорт растёт");
    assert_eq!(rows[0].content, text);
    assert_eq!(rows[0].keywords, keywords);
    assert_eq!(rows[0].source_channel.as_deref(), Some("-1001"));
    assert_eq!(rows[0].message_id, 42);
}

#[tokio::test]
async fn duplicate_title_within_window_is_skipped() {
    let store = PostStore::open_in_memory().await.unwrap();
    let kw = KeywordConfig::builtin();
    let ts = Utc.with_ymd_and_hms(2026, 8, 7, 10, 0, 0).unwrap();

    let text = "Рубль укрепился к доллару\nподробности в статье";
    let first = process_message(&store, &kw, &msg(Some(text), ts))
        .await
        .unwrap();
    assert!(matches!(first, IngestOutcome::Saved { .. }));

    // Same title two days later, different body: still a duplicate.
    let again = "Рубль укрепился к доллару\nсовсем другой текст";
    let out = process_message(&store, &kw, &msg(Some(again), ts + Duration::days(2)))
        .await
        .unwrap();
    assert_eq!(out, IngestOutcome::DuplicateTitle);
    assert_eq!(stored_count(&store).await, 1);
}

#[tokio::test]
async fn title_conflict_outside_lookback_window_stays_a_silent_skip() {
    // The 7-day pre-check no longer sees the old post, so the filter reaches
    // the insert; the UNIQUE(title) constraint absorbs it without error.
    let store = PostStore::open_in_memory().await.unwrap();
    let kw = KeywordConfig::builtin();
    let ts = Utc.with_ymd_and_hms(2026, 8, 1, 10, 0, 0).unwrap();

    let text = "Санкции против банков расширены";
    process_message(&store, &kw, &msg(Some(text), ts))
        .await
        .unwrap();

    let out = process_message(&store, &kw, &msg(Some(text), ts + Duration::days(30)))
        .await
        .unwrap();
    assert_eq!(out, IngestOutcome::DuplicateTitle);
    assert_eq!(stored_count(&store).await, 1);
}

#[tokio::test]
async fn title_is_first_line_truncated() {
    let store = PostStore::open_in_memory().await.unwrap();
    let kw = KeywordConfig::builtin();
    let ts = Utc.with_ymd_and_hms(2026, 8, 7, 10, 0, 0).unwrap();

    let long_first_line = format!("рубль {}", "я".repeat(300));
    let text = format!("{long_first_line}\nвторая строка");
    process_message(&store, &kw, &msg(Some(&text), ts))
        .await
        .unwrap();

    let epoch = Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap();
    let rows = store.fetch_since(epoch, false).await.unwrap();
    assert_eq!(rows[0].title.chars().count(), 150);
    assert!(long_first_line.starts_with(&rows[0].title));
}
