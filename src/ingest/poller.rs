// src/ingest/poller.rs
use std::sync::Arc;

use metrics::{counter, gauge};
use tokio::task::JoinHandle;

use crate::ingest::types::MessageSource;
use crate::keywords::KeywordConfig;
use crate::store::PostStore;

/// Spawn the ingest worker: poll the sources on a fixed interval and run
/// every message through the filter. Individual failures never stop the loop.
pub fn spawn_poller(
    sources: Vec<Box<dyn MessageSource>>,
    store: PostStore,
    keywords: Arc<KeywordConfig>,
    interval_secs: u64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
        loop {
            ticker.tick().await;
            let now = chrono::Utc::now().timestamp().max(0) as u64;

            let stats = crate::ingest::run_once(&sources, &store, &keywords).await;

            counter!("ingest_runs_total").increment(1);
            gauge!("ingest_last_run_ts").set(now as f64);

            tracing::info!(
                target: "ingest",
                seen = stats.seen,
                saved = stats.saved,
                duplicates = stats.duplicates,
                no_keyword = stats.no_keyword,
                errors = stats.errors,
                "ingest tick"
            );
        }
    })
}
