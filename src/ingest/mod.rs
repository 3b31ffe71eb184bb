// src/ingest/mod.rs
pub mod poller;
pub mod telegram;
pub mod types;

use anyhow::Result;
use chrono::Duration;
use metrics::{counter, describe_counter, describe_gauge};
use once_cell::sync::OnceCell;

use crate::ingest::types::InboundMessage;
use crate::keywords::{match_keywords, KeywordConfig};
use crate::store::{NewPost, PostStore};

/// Dedupe key length: first line of the message, truncated.
pub const MAX_TITLE_LEN: usize = 150;

/// Titles older than this no longer block ingestion. The UNIQUE(title)
/// constraint still guards the insert itself.
pub const DEDUP_LOOKBACK_DAYS: i64 = 7;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_messages_total", "Messages seen by the filter.");
        describe_counter!("ingest_saved_total", "Posts written to the store.");
        describe_counter!(
            "ingest_duplicate_total",
            "Messages dropped as duplicate titles."
        );
        describe_counter!(
            "ingest_no_keyword_total",
            "Messages dropped with no keyword match."
        );
        describe_counter!("ingest_empty_total", "Messages dropped with no text body.");
        describe_counter!("ingest_errors_total", "Store/transport errors while ingesting.");
        describe_counter!("ingest_runs_total", "Completed poll rounds.");
        describe_gauge!(
            "ingest_last_run_ts",
            "Unix ts when the ingest poller last ran."
        );
    });
}

/// Why a message did or did not land in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    Saved { keywords: Vec<String> },
    DuplicateTitle,
    NoKeywordMatch,
    EmptyText,
}

/// Dedupe key: first non-empty line, trimmed, truncated to [`MAX_TITLE_LEN`]
/// characters. `None` when the text has no usable line.
pub fn derive_title(text: &str) -> Option<String> {
    let line = text.lines().map(str::trim).find(|l| !l.is_empty())?;
    Some(line.chars().take(MAX_TITLE_LEN).collect())
}

/// The ingestion filter: empty-text check, title dedupe within the lookback
/// window, keyword matching, conflict-safe insert. Store errors propagate to
/// the caller; the poller logs them and moves on.
pub async fn process_message(
    store: &PostStore,
    keywords: &KeywordConfig,
    msg: &InboundMessage,
) -> Result<IngestOutcome> {
    ensure_metrics_described();
    counter!("ingest_messages_total").increment(1);

    let Some(text) = msg.text.as_deref() else {
        counter!("ingest_empty_total").increment(1);
        return Ok(IngestOutcome::EmptyText);
    };
    let Some(title) = derive_title(text) else {
        counter!("ingest_empty_total").increment(1);
        return Ok(IngestOutcome::EmptyText);
    };

    let cutoff = msg.date - Duration::days(DEDUP_LOOKBACK_DAYS);
    if store.title_exists_since(&title, cutoff).await? {
        counter!("ingest_duplicate_total").increment(1);
        return Ok(IngestOutcome::DuplicateTitle);
    }

    let matched = match_keywords(text, keywords.ingest_keywords());
    if matched.is_empty() {
        counter!("ingest_no_keyword_total").increment(1);
        return Ok(IngestOutcome::NoKeywordMatch);
    }

    let inserted = store
        .insert_post(NewPost {
            title,
            content: text.to_string(),
            source_channel: Some(msg.chat_id.to_string()),
            message_id: msg.message_id,
            keywords: matched.clone(),
            created_at: msg.date,
        })
        .await?;

    // A lost insert race is a duplicate, not an error.
    if !inserted {
        counter!("ingest_duplicate_total").increment(1);
        return Ok(IngestOutcome::DuplicateTitle);
    }

    counter!("ingest_saved_total").increment(1);
    Ok(IngestOutcome::Saved { keywords: matched })
}

/// Per-round tallies, mostly for logs and tests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestStats {
    pub seen: usize,
    pub saved: usize,
    pub duplicates: usize,
    pub no_keyword: usize,
    pub empty: usize,
    pub errors: usize,
}

/// Run one ingest round over the given sources. A failing source or message
/// is logged and skipped; the round always completes.
pub async fn run_once(
    sources: &[Box<dyn types::MessageSource>],
    store: &PostStore,
    keywords: &KeywordConfig,
) -> IngestStats {
    ensure_metrics_described();

    let mut stats = IngestStats::default();
    for src in sources {
        let batch = match src.fetch_latest().await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = ?e, source = src.name(), "source fetch error");
                counter!("ingest_errors_total").increment(1);
                stats.errors += 1;
                continue;
            }
        };

        for msg in &batch {
            stats.seen += 1;
            match process_message(store, keywords, msg).await {
                Ok(IngestOutcome::Saved { keywords }) => {
                    stats.saved += 1;
                    tracing::info!(
                        chat = msg.chat_id,
                        message = msg.message_id,
                        keywords = ?keywords,
                        "post saved"
                    );
                }
                Ok(IngestOutcome::DuplicateTitle) => stats.duplicates += 1,
                Ok(IngestOutcome::NoKeywordMatch) => stats.no_keyword += 1,
                Ok(IngestOutcome::EmptyText) => stats.empty += 1,
                Err(e) => {
                    tracing::warn!(
                        error = ?e,
                        chat = msg.chat_id,
                        message = msg.message_id,
                        "ingest error, message skipped"
                    );
                    counter!("ingest_errors_total").increment(1);
                    stats.errors += 1;
                }
            }
        }
    }
    stats
}
