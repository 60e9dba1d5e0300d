//! Dry-run sender: prints reminders instead of delivering them.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use colored::*;
use log::info;

use super::{ReminderSender, SendError};

/// Most recent deliveries kept by a long-running dry-run daemon
const HISTORY_LIMIT: usize = 256;

/// Writes every reminder to stdout and the log, and remembers the latest sends.
#[derive(Debug, Default)]
pub struct ConsoleSender {
    sent: Mutex<VecDeque<(i64, i64)>>,
}

impl ConsoleSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(chat_id, task_id)` pairs delivered recently, oldest first
    pub fn sent(&self) -> Vec<(i64, i64)> {
        self.sent
            .lock()
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ReminderSender for ConsoleSender {
    async fn send_reminder(&self, chat_id: i64, text: &str, task_id: i64) -> Result<(), SendError> {
        info!("[dry-run] reminder for task {} to chat {}", task_id, chat_id);
        println!("{} chat {} task {}\n{}\n", "Reminder:".cyan(), chat_id, task_id, text);
        if let Ok(mut sent) = self.sent.lock() {
            if sent.len() == HISTORY_LIMIT {
                sent.pop_front();
            }
            sent.push_back((chat_id, task_id));
        }
        Ok(())
    }
}
