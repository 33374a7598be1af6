// src/telegram.rs
//! Telegram Bot API transport. Retries are the transport's own concern; the
//! pipeline treats any error coming out of here as permanent for the item.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde_json::json;

use crate::compose::{rune_len, trim_to_word_boundary};
use crate::retry::{with_retry, RetryConfig};

const CAPTION_HARD_LIMIT: usize = 1024;

pub struct TelegramClient {
    http: reqwest::Client,
    token: String,
    chat_id: String,
}

impl TelegramClient {
    pub fn new(token: &str, chat_id: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .build()
            .context("building telegram http client")?;
        Ok(Self {
            http,
            token: token.to_string(),
            chat_id: chat_id.to_string(),
        })
    }

    fn api_url(&self, method: &str) -> String {
        format!("https://api.telegram.org/bot{}/{method}", self.token)
    }

    async fn post(&self, method: &str, payload: serde_json::Value) -> Result<()> {
        let resp = self
            .http
            .post(self.api_url(method))
            .json(&payload)
            .send()
            .await
            .context("telegram request")?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("telegram api error: status {status}, body {body}");
        }
        Ok(())
    }

    /// Send an HTML-formatted text message. `allow_preview` controls the
    /// link preview under the message.
    pub async fn send_text(&self, text: &str, allow_preview: bool) -> Result<()> {
        let payload = json!({
            "chat_id": self.chat_id,
            "text": text,
            "parse_mode": "HTML",
            "disable_web_page_preview": !allow_preview,
        });
        with_retry(RetryConfig::default(), || {
            let payload = payload.clone();
            async move { self.post("sendMessage", payload).await }
        })
        .await
    }

    /// Send a photo by URL with a caption. The caption is trimmed to
    /// Telegram's 1024-character limit as a last guard.
    pub async fn send_photo(&self, photo_url: &str, caption: &str) -> Result<()> {
        let caption = if rune_len(caption) > CAPTION_HARD_LIMIT {
            trim_to_word_boundary(caption, CAPTION_HARD_LIMIT - 1)
        } else {
            caption.to_string()
        };
        let payload = json!({
            "chat_id": self.chat_id,
            "photo": photo_url,
            "caption": caption,
            "parse_mode": "HTML",
        });
        with_retry(RetryConfig::default(), || {
            let payload = payload.clone();
            async move { self.post("sendPhoto", payload).await }
        })
        .await
    }
}
