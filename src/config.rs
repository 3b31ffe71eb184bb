// src/config.rs
//! Application configuration from the environment. Required values are
//! checked at startup and the process refuses to boot without them.

use anyhow::{anyhow, Context, Result};

const DEFAULT_POLL_INTERVAL_SECS: u64 = 900; // 15 min
const DEFAULT_DIGEST_HOUR_UTC: u32 = 21;
const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Telegram Bot API token.
    pub bot_token: String,
    /// SQLite database file path.
    pub database_path: String,
    /// Chats the ingest poller accepts posts from. Empty = accept all.
    pub source_chat_ids: Vec<i64>,
    /// Chats the digest is delivered to. At least one required.
    pub digest_chat_ids: Vec<String>,
    pub poll_interval_secs: u64,
    pub digest_hour_utc: u32,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let bot_token = required("BOT_TOKEN")?;
        let database_path = required("DATABASE_PATH")?;

        let digest_chat_ids = split_list(&required("DIGEST_CHAT_IDS")?);
        if digest_chat_ids.is_empty() {
            return Err(anyhow!("DIGEST_CHAT_IDS must contain at least one chat id"));
        }

        let source_chat_ids = match std::env::var("SOURCE_CHAT_IDS") {
            Ok(v) => split_list(&v)
                .iter()
                .map(|s| {
                    s.parse::<i64>()
                        .with_context(|| format!("SOURCE_CHAT_IDS entry '{s}' is not an integer"))
                })
                .collect::<Result<Vec<_>>>()?,
            Err(_) => Vec::new(),
        };

        let poll_interval_secs = optional_parse("POLL_INTERVAL_SECS")?
            .unwrap_or(DEFAULT_POLL_INTERVAL_SECS);
        let digest_hour_utc: u32 =
            optional_parse("DIGEST_HOUR_UTC")?.unwrap_or(DEFAULT_DIGEST_HOUR_UTC);
        if digest_hour_utc >= 24 {
            return Err(anyhow!("DIGEST_HOUR_UTC must be in 0..24"));
        }
        let port = optional_parse("PORT")?.unwrap_or(DEFAULT_PORT);

        Ok(Self {
            bot_token,
            database_path,
            source_chat_ids,
            digest_chat_ids,
            poll_interval_secs,
            digest_hour_utc,
            port,
        })
    }
}

fn required(name: &str) -> Result<String> {
    let v = std::env::var(name).map_err(|_| anyhow!("missing required env var {name}"))?;
    let v = v.trim().to_string();
    if v.is_empty() {
        return Err(anyhow!("env var {name} must not be empty"));
    }
    Ok(v)
}

fn optional_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => {
            let parsed = v
                .trim()
                .parse::<T>()
                .with_context(|| format!("invalid value for {name}: '{v}'"))?;
            Ok(Some(parsed))
        }
        _ => Ok(None),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
