// src/digest/scheduler.rs
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::task::JoinHandle;

use crate::digest::{run_and_dispatch, DigestPeriod};
use crate::keywords::KeywordConfig;
use crate::notify::TelegramNotifier;
use crate::store::PostStore;

/// Next dispatch instant strictly after `now`: today at `hour`:00 UTC, or
/// tomorrow if that has already passed.
pub fn next_dispatch_after(now: DateTime<Utc>, hour: u32) -> DateTime<Utc> {
    let today = now
        .date_naive()
        .and_hms_opt(hour, 0, 0)
        .expect("hour validated at startup")
        .and_utc();
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}

/// Spawn the daily digest worker: sleep until the next fixed dispatch time,
/// send the Day digest (including the no-data message when the store is
/// quiet), repeat. Failures are logged; the loop never exits.
pub fn spawn_daily_scheduler(
    store: PostStore,
    notifier: Arc<TelegramNotifier>,
    keywords: Arc<KeywordConfig>,
    hour_utc: u32,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let now = Utc::now();
            let next = next_dispatch_after(now, hour_utc);
            let wait = (next - now).to_std().unwrap_or_default();
            tracing::info!(target: "digest", next = %next, "scheduler sleeping until next dispatch");
            tokio::time::sleep(wait).await;

            match run_and_dispatch(&store, &notifier, keywords.topics(), DigestPeriod::Day).await
            {
                Ok(report) => {
                    tracing::info!(
                        target: "digest",
                        posts = report.post_count,
                        "daily digest dispatched"
                    );
                }
                Err(e) => {
                    tracing::warn!(target: "digest", error = ?e, "daily digest failed");
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn next_dispatch_is_today_when_hour_ahead() {
        let now = Utc.with_ymd_and_hms(2026, 8, 7, 10, 0, 0).unwrap();
        let next = next_dispatch_after(now, 21);
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 8, 7, 21, 0, 0).unwrap());
    }

    #[test]
    fn next_dispatch_rolls_to_tomorrow_when_hour_passed() {
        let now = Utc.with_ymd_and_hms(2026, 8, 7, 21, 0, 0).unwrap();
        let next = next_dispatch_after(now, 21);
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 8, 8, 21, 0, 0).unwrap());
    }
}
