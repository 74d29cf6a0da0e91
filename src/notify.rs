//! Outbound notifications
//!
//! Session messages go to the chat that owns the session. Only the Telegram
//! `sendMessage` call is used; no updates are polled.

use crate::config::TelegramConfig;
use crate::error::{BotError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

#[async_trait]
pub trait Notify: Send + Sync {
    async fn send(&self, chat_id: i64, text: &str) -> Result<()>;
}

/// Telegram notifier (or a log-only stand-in when Telegram is not configured)
#[derive(Clone)]
pub struct Notifier {
    http: Client,
    bot_token: Option<String>,
    notify_trades: bool,
    notify_errors: bool,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
    disable_web_page_preview: bool,
}

impl Notifier {
    /// Telegram notifier; an empty token gives a log-only notifier
    pub fn new(config: &TelegramConfig) -> Self {
        let token = config.bot_token.trim();
        if token.is_empty() {
            tracing::warn!("Telegram bot_token is empty, notifications go to the log");
            return Self::disabled();
        }
        Self {
            http: Client::new(),
            bot_token: Some(token.to_string()),
            notify_trades: config.notify_trades,
            notify_errors: config.notify_errors,
        }
    }

    /// Notifier that only writes to the log
    pub fn disabled() -> Self {
        Self {
            http: Client::new(),
            bot_token: None,
            notify_trades: false,
            notify_errors: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.bot_token.is_some()
    }

    fn wants(&self, text: &str) -> bool {
        if is_error_message(text) {
            self.notify_errors
        } else {
            self.notify_trades
        }
    }
}

/// Error-class messages carry the warning marker
fn is_error_message(text: &str) -> bool {
    text.starts_with('⚠')
}

#[async_trait]
impl Notify for Notifier {
    async fn send(&self, chat_id: i64, text: &str) -> Result<()> {
        let token = match &self.bot_token {
            Some(token) if self.wants(text) => token,
            _ => {
                tracing::info!(chat_id, "{}", text.replace('\n', " | "));
                return Ok(());
            }
        };

        let url = format!("https://api.telegram.org/bot{}/sendMessage", token);
        let request = SendMessageRequest {
            chat_id,
            text,
            disable_web_page_preview: true,
        };

        let response = self.http.post(&url).json(&request).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(BotError::Api(format!("Telegram sendMessage {}: {}", status, body)));
        }
        Ok(())
    }
}
