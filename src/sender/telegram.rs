//! Telegram Bot API sender
//!
//! Delivers reminders with `sendMessage` in HTML parse mode and attaches an
//! inline "Done" button whose callback data is `done:<task_id>`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use super::{ReminderSender, SendError};

/// Telegram Bot API base URL
pub const TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Configuration for the Telegram sender
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub api_base: String,
    pub timeout: Duration,
}

impl TelegramConfig {
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            api_base: TELEGRAM_API_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Sends reminders through the Telegram Bot API
pub struct TelegramSender {
    client: Client,
    config: TelegramConfig,
}

impl TelegramSender {
    pub fn new(config: TelegramConfig) -> Result<Self, SendError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.bot_token,
            method
        )
    }

    /// Build the `sendMessage` payload
    fn build_message(chat_id: i64, text: &str, task_id: i64) -> Value {
        json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "HTML",
            "reply_markup": {
                "inline_keyboard": [[
                    { "text": "Done", "callback_data": format!("done:{}", task_id) }
                ]]
            }
        })
    }

    /// Interpret a Bot API reply. The API answers `{"ok": false, "description": ...}`
    /// on failure, sometimes with a 200 status.
    fn check_reply(status: u16, body: &Value) -> Result<(), SendError> {
        if body["ok"].as_bool() == Some(true) {
            return Ok(());
        }

        let description = body["description"]
            .as_str()
            .unwrap_or("unknown error")
            .to_string();
        let code = body["error_code"]
            .as_u64()
            .and_then(|c| u16::try_from(c).ok())
            .unwrap_or(status);

        if (200..300).contains(&code) {
            Err(SendError::Rejected(description))
        } else {
            Err(SendError::Api { status: code, description })
        }
    }
}

#[async_trait]
impl ReminderSender for TelegramSender {
    async fn send_reminder(&self, chat_id: i64, text: &str, task_id: i64) -> Result<(), SendError> {
        let body = Self::build_message(chat_id, text, task_id);
        let response = self.client.post(self.method_url("sendMessage")).json(&body).send().await?;

        let status = response.status().as_u16();
        let reply: Value = response.json().await.unwrap_or(Value::Null);
        Self::check_reply(status, &reply)
    }
}

impl std::fmt::Debug for TelegramSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramSender")
            .field("api_base", &self.config.api_base)
            .field("timeout", &self.config.timeout)
            .finish()
    }
}
