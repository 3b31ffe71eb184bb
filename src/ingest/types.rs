// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};

/// A raw message pulled from a channel, before filtering.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct InboundMessage {
    pub chat_id: i64,
    pub message_id: i64,
    pub date: DateTime<Utc>,
    /// Absent for media-only posts.
    pub text: Option<String>,
}

#[async_trait::async_trait]
pub trait MessageSource: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<InboundMessage>>;
    fn name(&self) -> &'static str;
}
