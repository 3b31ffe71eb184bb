// tests/e2e_pipeline.rs
//
// End-to-end scenarios through filter -> store -> aggregator, matching the
// behavior the digest channels have always seen.

use chrono::{Duration, TimeZone, Utc};
use news_digest_bot::digest::{build_report, DigestPeriod};
use news_digest_bot::ingest::types::InboundMessage;
use news_digest_bot::store::NewPost;
use news_digest_bot::{process_message, IngestOutcome, KeywordConfig, PostStore};

#[tokio::test]
async fn sanctions_message_is_stored_once_with_its_keywords() {
    let store = PostStore::open_in_memory().await.unwrap();
    let kw = KeywordConfig::builtin();
    let ts = Utc.with_ymd_and_hms(2026, 8, 7, 9, 0, 0).unwrap();

    let text = "Россия вводит новые санкции против экспорта";
    let msg = InboundMessage {
        chat_id: -1001,
        message_id: 1,
        date: ts,
        text: Some(text.to_string()),
    };

    let out = process_message(&store, &kw, &msg).await.unwrap();
    let IngestOutcome::Saved { keywords } = out else {
        panic!("expected Saved, got {out:?}");
    };
    assert!(keywords.contains(&"россия".to_string()));
    assert!(keywords.contains(&"санкци".to_string()));

    // The identical text again: no second Post.
    let again = InboundMessage {
        message_id: 2,
        date: ts + Duration::minutes(5),
        ..msg.clone()
    };
    let out = process_message(&store, &kw, &again).await.unwrap();
    assert_eq!(out, IngestOutcome::DuplicateTitle);

    let epoch = Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap();
    assert_eq!(store.fetch_since(epoch, false).await.unwrap().len(), 1);
}

#[tokio::test]
async fn daily_digest_ranks_ruble_over_china() {
    let store = PostStore::open_in_memory().await.unwrap();
    let kw = KeywordConfig::builtin();
    let now = Utc.with_ymd_and_hms(2026, 8, 7, 21, 0, 0).unwrap();

    // 3 posts in the last 24h: "рубль" twice, "китай" once, no other topics.
    let posts = [
        ("Пост первый", "курс: рубль стабилен"),
        ("Пост второй", "эксперты ждут, что рубль окрепнет"),
        ("Пост третий", "Китай подписал контракт"),
    ];
    for (i, (title, content)) in posts.iter().enumerate() {
        store
            .insert_post(NewPost {
                title: title.to_string(),
                content: content.to_string(),
                source_channel: None,
                message_id: i as i64,
                keywords: Vec::new(),
                created_at: now - Duration::hours(i as i64 + 1),
            })
            .await
            .unwrap();
    }

    let report = build_report(&store, kw.topics(), DigestPeriod::Day, now)
        .await
        .unwrap();

    assert!(report.text.contains("Уникальных постов: 3"));
    let ruble = report.text.find("• Рубль (2)").expect("ruble bullet");
    let china = report.text.find("• Китай (1)").expect("china bullet");
    assert!(ruble < china, "ruble must rank above china:\n{}", report.text);
}

#[tokio::test]
async fn digest_without_recent_posts_reports_no_data() {
    let store = PostStore::open_in_memory().await.unwrap();
    let kw = KeywordConfig::builtin();
    let now = Utc.with_ymd_and_hms(2026, 8, 7, 21, 0, 0).unwrap();

    // Only an old post, far outside every cutoff under a day.
    store
        .insert_post(NewPost {
            title: "Старый пост".to_string(),
            content: "рубль".to_string(),
            source_channel: None,
            message_id: 1,
            keywords: Vec::new(),
            created_at: now - Duration::days(10),
        })
        .await
        .unwrap();

    let report = build_report(&store, kw.topics(), DigestPeriod::Day, now)
        .await
        .unwrap();
    assert_eq!(report.post_count, 0);
    assert!(report.text.contains("Нет данных за указанный период."));
}
