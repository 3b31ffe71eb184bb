//! Channel News Digest — Binary Entrypoint
//! Boots the ingest poller, the daily digest scheduler, and the Axum HTTP
//! server for the on-demand digest trigger and metrics.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use news_digest_bot::ingest::telegram::TelegramSource;
use news_digest_bot::ingest::types::MessageSource;
use news_digest_bot::metrics::Metrics;
use news_digest_bot::{
    api, digest, ingest, AppConfig, AppState, KeywordConfig, PostStore, TelegramNotifier,
};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    // Configuration errors are fatal: the process refuses to start.
    let cfg = AppConfig::from_env().context("loading configuration")?;
    let keywords = Arc::new(KeywordConfig::load_default().context("loading keywords")?);

    let store = PostStore::open(&cfg.database_path).await?;
    let notifier = Arc::new(TelegramNotifier::new(
        cfg.bot_token.clone(),
        cfg.digest_chat_ids.clone(),
    ));

    let metrics = Metrics::init(cfg.poll_interval_secs);

    // Ingest poller and digest scheduler run as independent workers that
    // share nothing but the store.
    let sources: Vec<Box<dyn MessageSource>> = vec![Box::new(TelegramSource::new(
        cfg.bot_token.clone(),
        cfg.source_chat_ids.clone(),
    ))];
    ingest::poller::spawn_poller(
        sources,
        store.clone(),
        keywords.clone(),
        cfg.poll_interval_secs,
    );
    digest::scheduler::spawn_daily_scheduler(
        store.clone(),
        notifier.clone(),
        keywords.clone(),
        cfg.digest_hour_utc,
    );

    let state = AppState {
        store,
        notifier,
        keywords,
    };
    let router = api::create_router(state).merge(metrics.router());

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    tracing::info!(%addr, "starting http server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
