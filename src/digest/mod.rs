// src/digest/mod.rs
//! Digest aggregation: fetch posts since a cutoff, count topic occurrences
//! over the concatenated text, rank the top topics, and format the report
//! that goes out to the digest channels.

pub mod scheduler;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;

use crate::keywords::count_occurrences;
use crate::notify::TelegramNotifier;
use crate::store::{Post, PostStore};

/// How many topics the report lists.
const TOP_TOPICS: usize = 5;

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("digest_runs_total", "Digest builds, by period.");
        describe_counter!("digest_posts_total", "Posts swept into dispatched digests.");
        describe_counter!(
            "digest_delivery_failures_total",
            "Destinations a digest could not be delivered to."
        );
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestPeriod {
    Day,
    Week,
    Month,
    HalfYear,
    Year,
}

impl DigestPeriod {
    pub const ALL: [DigestPeriod; 5] = [
        DigestPeriod::Day,
        DigestPeriod::Week,
        DigestPeriod::Month,
        DigestPeriod::HalfYear,
        DigestPeriod::Year,
    ];

    /// Russian header label, as the reports have always read.
    pub fn label(&self) -> &'static str {
        match self {
            DigestPeriod::Day => "Аналитическая записка за сутки",
            DigestPeriod::Week => "Аналитическая записка за неделю",
            DigestPeriod::Month => "Аналитическая записка за месяц",
            DigestPeriod::HalfYear => "Аналитическая записка за 6 месяцев",
            DigestPeriod::Year => "Аналитическая записка за год",
        }
    }

    pub fn duration(&self) -> Duration {
        match self {
            DigestPeriod::Day => Duration::hours(24),
            DigestPeriod::Week => Duration::days(7),
            DigestPeriod::Month => Duration::days(30),
            DigestPeriod::HalfYear => Duration::days(180),
            DigestPeriod::Year => Duration::days(365),
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "day" => Some(DigestPeriod::Day),
            "week" => Some(DigestPeriod::Week),
            "month" => Some(DigestPeriod::Month),
            "halfyear" | "half-year" => Some(DigestPeriod::HalfYear),
            "year" => Some(DigestPeriod::Year),
            _ => None,
        }
    }
}

/// A built digest: the outgoing text plus the ids it covers, so the
/// dispatcher can flip their `processed` flags after delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestReport {
    pub period: DigestPeriod,
    pub text: String,
    pub post_ids: Vec<i64>,
    pub post_count: usize,
}

/// Build the report for one period: unprocessed posts in [cutoff, now),
/// newest first.
pub async fn build_report(
    store: &PostStore,
    topics: &[String],
    period: DigestPeriod,
    now: DateTime<Utc>,
) -> Result<DigestReport> {
    ensure_metrics_described();
    counter!("digest_runs_total").increment(1);

    let cutoff = now - period.duration();
    let posts = store.fetch_since(cutoff, true).await?;

    if posts.is_empty() {
        return Ok(DigestReport {
            period,
            text: format_empty(period.label()),
            post_ids: Vec::new(),
            post_count: 0,
        });
    }

    let ranked = rank_topics(&posts, topics);
    let text = format_report(period.label(), &posts, &ranked);
    let post_ids = posts.iter().map(|p| p.id).collect();

    Ok(DigestReport {
        period,
        text,
        post_ids,
        post_count: posts.len(),
    })
}

/// Count each topic as a substring over the lower-cased title+content blob,
/// drop zero counts, rank by count descending (topic name breaks ties), and
/// keep the top five.
pub fn rank_topics(posts: &[Post], topics: &[String]) -> Vec<(String, usize)> {
    let blob = posts
        .iter()
        .map(|p| format!("{} {}", p.title, p.content))
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    let mut ranked: Vec<(String, usize)> = topics
        .iter()
        .map(|t| (t.clone(), count_occurrences(&blob, t)))
        .filter(|(_, n)| *n > 0)
        .collect();

    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(TOP_TOPICS);
    ranked
}

/// The fixed report shape. `posts` must be non-empty and newest-first.
pub fn format_report(label: &str, posts: &[Post], ranked: &[(String, usize)]) -> String {
    let mut text = format!("📊 *{label}*\n\n");

    let first = posts
        .last()
        .map(|p| p.created_at.format("%d.%m.%Y").to_string())
        .unwrap_or_default();
    let last = posts
        .first()
        .map(|p| p.created_at.format("%d.%m.%Y").to_string())
        .unwrap_or_default();
    text.push_str(&format!("Период: {first} – {last}\n"));
    text.push_str(&format!("Уникальных постов: {}\n\n", posts.len()));

    if ranked.is_empty() {
        text.push_str("Ключевые темы не выявлены.\n");
    } else {
        text.push_str("Ключевые темы:\n");
        for (topic, count) in ranked {
            text.push_str(&format!("• {} ({count})\n", capitalize(topic)));
        }
    }

    text.push_str("\n— Аналитика подготовлена автоматически.");
    text
}

pub fn format_empty(label: &str) -> String {
    format!("📊 *{label}*\n\nНет данных за указанный период.")
}

/// First char upper, rest lower.
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().collect::<String>() + chars.as_str().to_lowercase().as_str(),
        None => String::new(),
    }
}

/// Build, broadcast, and on any successful delivery mark the covered posts
/// processed. At-least-once: a failed flag update is logged, not retried, so
/// the same posts may appear in a later digest.
pub async fn run_and_dispatch(
    store: &PostStore,
    notifier: &TelegramNotifier,
    topics: &[String],
    period: DigestPeriod,
) -> Result<DigestReport> {
    let report = build_report(store, topics, period, Utc::now()).await?;
    dispatch(store, notifier, &report).await;
    Ok(report)
}

/// The multi-period sweep: Day through Year, skipping empty periods.
pub async fn run_all_periods(
    store: &PostStore,
    notifier: &TelegramNotifier,
    topics: &[String],
) -> Result<()> {
    let now = Utc::now();
    for period in DigestPeriod::ALL {
        let report = build_report(store, topics, period, now).await?;
        if report.post_count == 0 {
            continue;
        }
        dispatch(store, notifier, &report).await;
    }
    Ok(())
}

async fn dispatch(store: &PostStore, notifier: &TelegramNotifier, report: &DigestReport) {
    let delivery = notifier.broadcast(&report.text).await;
    counter!("digest_delivery_failures_total").increment(delivery.failed as u64);

    if delivery.delivered == 0 {
        tracing::warn!(period = ?report.period, "digest not delivered to any destination");
        return;
    }

    counter!("digest_posts_total").increment(report.post_count as u64);
    if !report.post_ids.is_empty() {
        if let Err(e) = store.mark_processed(report.post_ids.clone()).await {
            tracing::warn!(
                error = ?e,
                period = ?report.period,
                "processed-flag update failed; posts may be re-summarized"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn post(id: i64, title: &str, content: &str, ts: DateTime<Utc>) -> Post {
        Post {
            id,
            title: title.to_string(),
            content: content.to_string(),
            source_channel: None,
            message_id: id,
            keywords: Vec::new(),
            created_at: ts,
            processed: false,
        }
    }

    #[test]
    fn ranking_sorts_by_count_then_name() {
        let ts = Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap();
        let posts = vec![
            post(1, "Рубль растёт", "рубль и снова рубль", ts),
            post(2, "Китай про торговлю", "торговля есть торговля", ts),
        ];
        let topics: Vec<String> = vec![
            "рубль".into(),
            "китай".into(),
            "торговля".into(),
            "санкции".into(),
        ];
        let ranked = rank_topics(&posts, &topics);
        assert_eq!(
            ranked,
            vec![
                ("рубль".to_string(), 3),
                ("торговля".to_string(), 2),
                ("китай".to_string(), 1),
            ]
        );
    }

    #[test]
    fn ranking_caps_at_five_topics() {
        let ts = Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap();
        let posts = vec![post(1, "t", "а б в г д е ж", ts)];
        let topics: Vec<String> = ["а", "б", "в", "г", "д", "е", "ж"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let ranked = rank_topics(&posts, &topics);
        assert_eq!(ranked.len(), 5);
    }

    #[test]
    fn report_carries_count_range_and_topics() {
        let early = Utc.with_ymd_and_hms(2026, 7, 30, 9, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2026, 8, 1, 18, 30, 0).unwrap();
        // newest first, as fetch_since returns them
        let posts = vec![
            post(2, "Китай и рубль", "рубль", late),
            post(1, "Рубль укрепился", "подробности", early),
        ];
        let ranked = rank_topics(
            &posts,
            &["рубль".to_string(), "китай".to_string()],
        );
        let text = format_report("Аналитическая записка за сутки", &posts, &ranked);

        assert!(text.contains("Период: 30.07.2026 – 01.08.2026"));
        assert!(text.contains("Уникальных постов: 2"));
        assert!(text.contains("• Рубль (3)"));
        assert!(text.contains("• Китай (1)"));
        assert!(text.ends_with("— Аналитика подготовлена автоматически."));
    }

    #[test]
    fn empty_report_uses_fixed_no_data_text() {
        let text = format_empty("Аналитическая записка за сутки");
        assert!(text.contains("Нет данных за указанный период."));
    }

    #[test]
    fn capitalize_is_first_upper_rest_lower() {
        assert_eq!(capitalize("рубль"), "Рубль");
        assert_eq!(capitalize("КИТАЙ"), "Китай");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn period_parse_round_trips() {
        assert_eq!(DigestPeriod::parse("day"), Some(DigestPeriod::Day));
        assert_eq!(DigestPeriod::parse("HALF-YEAR"), Some(DigestPeriod::HalfYear));
        assert_eq!(DigestPeriod::parse("quarter"), None);
    }
}
