// src/ingest/telegram.rs
//! Telegram Bot API message source: `getUpdates` long polling restricted to
//! channel posts, with in-process offset tracking.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use crate::ingest::types::{InboundMessage, MessageSource};

const DEFAULT_API_BASE: &str = "https://api.telegram.org";
const HTTP_TIMEOUT_SECS: u64 = 10;

pub struct TelegramSource {
    api_base: String,
    token: String,
    client: reqwest::Client,
    /// Chats to accept posts from; empty = accept all.
    source_chats: Vec<i64>,
    /// Next update offset; getUpdates confirms everything below it.
    offset: AtomicI64,
}

// ---- Bot API wire types (the subset we read) ----

#[derive(Debug, Deserialize)]
struct UpdatesResponse {
    ok: bool,
    #[serde(default)]
    result: Vec<TgUpdate>,
}

#[derive(Debug, Deserialize)]
struct TgUpdate {
    update_id: i64,
    channel_post: Option<TgMessage>,
}

#[derive(Debug, Deserialize)]
struct TgMessage {
    message_id: i64,
    date: i64,
    text: Option<String>,
    chat: TgChat,
}

#[derive(Debug, Deserialize)]
struct TgChat {
    id: i64,
}

impl TelegramSource {
    pub fn new(token: String, source_chats: Vec<i64>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            token,
            client,
            source_chats,
            offset: AtomicI64::new(0),
        }
    }

    /// Point at a different API host (tests).
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    fn accepts(&self, chat_id: i64) -> bool {
        self.source_chats.is_empty() || self.source_chats.contains(&chat_id)
    }
}

#[async_trait]
impl MessageSource for TelegramSource {
    async fn fetch_latest(&self) -> Result<Vec<InboundMessage>> {
        let url = format!("{}/bot{}/getUpdates", self.api_base, self.token);
        let body = serde_json::json!({
            "offset": self.offset.load(Ordering::SeqCst),
            "timeout": 0,
            "allowed_updates": ["channel_post"],
        });

        let resp: UpdatesResponse = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("getUpdates request")?
            .error_for_status()
            .context("getUpdates non-2xx")?
            .json()
            .await
            .context("getUpdates body")?;

        if !resp.ok {
            anyhow::bail!("getUpdates returned ok=false");
        }

        let mut out = Vec::with_capacity(resp.result.len());
        for upd in resp.result {
            // Confirm every update, including ones we drop.
            let next = upd.update_id + 1;
            self.offset.fetch_max(next, Ordering::SeqCst);

            let Some(post) = upd.channel_post else {
                continue;
            };
            if !self.accepts(post.chat.id) {
                continue;
            }
            out.push(InboundMessage {
                chat_id: post.chat.id,
                message_id: post.message_id,
                date: DateTime::from_timestamp(post.date, 0).unwrap_or_else(Utc::now),
                text: post.text,
            });
        }
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "telegram"
    }
}
