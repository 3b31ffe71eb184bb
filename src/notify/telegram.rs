use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::DeliveryReport;

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

#[derive(Clone)]
pub struct TelegramNotifier {
    api_base: String,
    token: String,
    client: Client,
    destinations: Vec<String>,
    timeout: Duration,
}

impl TelegramNotifier {
    pub fn new(token: String, destinations: Vec<String>) -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            token,
            client: Client::new(),
            destinations,
            timeout: Duration::from_secs(10),
        }
    }

    /// Point at a different API host (tests).
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn destinations(&self) -> &[String] {
        &self.destinations
    }

    /// One `sendMessage` call: Markdown formatting, link previews off.
    pub async fn send_text(&self, chat_id: &str, text: &str) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.token);
        let payload = SendMessagePayload {
            chat_id,
            text,
            parse_mode: "Markdown",
            disable_web_page_preview: true,
        };

        self.client
            .post(&url)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .context("sendMessage request")?
            .error_for_status()
            .context("sendMessage non-2xx")?;
        Ok(())
    }

    /// Fan the text out to every configured destination. A failure on one
    /// destination is logged and does not block the others.
    pub async fn broadcast(&self, text: &str) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        for dest in &self.destinations {
            match self.send_text(dest, text).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    tracing::warn!(error = ?e, chat = %dest, "digest delivery failed");
                    report.failed += 1;
                }
            }
        }
        report
    }
}

#[derive(Serialize)]
struct SendMessagePayload<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
    disable_web_page_preview: bool,
}
