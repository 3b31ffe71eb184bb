// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod config;
pub mod digest;
pub mod ingest;
pub mod keywords;
pub mod metrics;
pub mod notify;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::config::AppConfig;
pub use crate::digest::{DigestPeriod, DigestReport};
pub use crate::ingest::{process_message, IngestOutcome};
pub use crate::keywords::KeywordConfig;
pub use crate::notify::{DeliveryReport, TelegramNotifier};
pub use crate::store::{NewPost, Post, PostStore};
