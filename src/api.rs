use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use crate::digest::{self, DigestPeriod};
use crate::keywords::KeywordConfig;
use crate::notify::TelegramNotifier;
use crate::store::PostStore;

#[derive(Clone)]
pub struct AppState {
    pub store: PostStore,
    pub notifier: Arc<TelegramNotifier>,
    pub keywords: Arc<KeywordConfig>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/digest/run", post(run_digest))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(serde::Deserialize)]
struct RunDigestQuery {
    period: Option<String>,
}

/// External trigger: build and dispatch the digest for the requested period
/// (default: day), synchronously. Plain-text success/failure body.
async fn run_digest(
    State(state): State<AppState>,
    Query(q): Query<RunDigestQuery>,
) -> (StatusCode, &'static str) {
    let period = match q.period.as_deref() {
        None => DigestPeriod::Day,
        Some(raw) => match DigestPeriod::parse(raw) {
            Some(p) => p,
            None => return (StatusCode::BAD_REQUEST, "unknown period"),
        },
    };

    match digest::run_and_dispatch(
        &state.store,
        &state.notifier,
        state.keywords.topics(),
        period,
    )
    .await
    {
        Ok(report) => {
            tracing::info!(period = ?report.period, posts = report.post_count, "digest triggered over http");
            (StatusCode::OK, "ok")
        }
        Err(e) => {
            tracing::error!(error = ?e, "http-triggered digest failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "digest failed")
        }
    }
}
