//! Reminder delivery
//!
//! The poller only knows the `ReminderSender` trait. A failed send is
//! reported back as `SendError`, never as a panic, so one bad chat cannot stop
//! a reminder cycle.

mod console;
mod telegram;

use async_trait::async_trait;

pub use console::ConsoleSender;
pub use telegram::{TELEGRAM_API_URL, TelegramConfig, TelegramSender};

/// Delivers a rendered reminder to a chat
#[async_trait]
pub trait ReminderSender: Send + Sync {
    /// Send `text` to `chat_id`. `task_id` lets the transport attach actions
    /// (e.g. a "done" button) to the message.
    async fn send_reminder(&self, chat_id: i64, text: &str, task_id: i64) -> Result<(), SendError>;
}

/// Errors that can occur while delivering a reminder
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error {status}: {description}")]
    Api { status: u16, description: String },

    #[error("Rejected by chat platform: {0}")]
    Rejected(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SendError {
    /// Whether the next polling cycle has a chance of succeeding
    pub fn is_retryable(&self) -> bool {
        match self {
            SendError::Network(_) => true,
            SendError::Api { status, .. } => *status == 429 || *status >= 500,
            SendError::Rejected(_) => false,
            SendError::Io(_) => true,
        }
    }
}
