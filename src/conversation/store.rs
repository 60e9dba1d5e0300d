//! Per-user conversation state, shared across handlers.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::RwLock;

use super::draft::{Step, TaskDraft};
use crate::error::{RemindrError, Result};

/// Result of feeding one answer into a user's draft
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    /// Waiting for the answer to this step
    Next(Step),
    /// All answers collected; the draft has been removed from the store
    Ready(TaskDraft),
}

/// At most one draft per user; the latest `set` wins.
#[derive(Debug, Clone, Default)]
pub struct ConversationStore {
    drafts: Arc<RwLock<HashMap<i64, TaskDraft>>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, user_id: i64) -> Option<TaskDraft> {
        self.drafts.read().await.get(&user_id).cloned()
    }

    pub async fn set(&self, user_id: i64, draft: TaskDraft) {
        self.drafts.write().await.insert(user_id, draft);
    }

    pub async fn delete(&self, user_id: i64) -> Option<TaskDraft> {
        self.drafts.write().await.remove(&user_id)
    }

    pub async fn len(&self) -> usize {
        self.drafts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Begin a fresh draft, replacing any unfinished one.
    pub async fn start(&self, user_id: i64) -> Step {
        let draft = TaskDraft::new();
        let step = draft.step();
        self.set(user_id, draft).await;
        step
    }

    /// Drop the user's draft. Returns whether there was one.
    pub async fn cancel(&self, user_id: i64) -> bool {
        self.delete(user_id).await.is_some()
    }

    /// Apply `input` to the user's draft under one write lock.
    pub async fn advance(&self, user_id: i64, input: &str, today: NaiveDate) -> Result<Progress> {
        let mut drafts = self.drafts.write().await;
        let draft = drafts
            .get_mut(&user_id)
            .ok_or_else(|| RemindrError::InvalidInput("no task in progress".to_string()))?;

        let step = draft.apply(input, today)?;
        if step == Step::Complete {
            let finished = drafts.remove(&user_id).unwrap_or_default();
            return Ok(Progress::Ready(finished));
        }
        Ok(Progress::Next(step))
    }
}
