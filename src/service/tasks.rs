//! Task operations shared by the CLI and the reminder daemon.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::{Frequency, MAX_IMPORTANCE, MIN_IMPORTANCE, NewTask, Task};
use crate::error::{RemindrError, Result};
use crate::store::TaskRepository;

/// Validated task lifecycle on top of a `TaskRepository`
pub struct TaskService<R> {
    repo: Arc<R>,
}

impl<R> Clone for TaskService<R> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
        }
    }
}

impl<R: TaskRepository> TaskService<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Create a task. Importance must be 1..=5, the description non-blank and
    /// the deadline not before `today`.
    pub fn create(&self, task: NewTask, today: NaiveDate, now: DateTime<Utc>) -> Result<Task> {
        validate_importance(task.importance)?;
        if task.description.trim().is_empty() {
            return Err(RemindrError::InvalidTask("description must not be empty".to_string()));
        }
        if task.deadline < today {
            return Err(RemindrError::InvalidTask(format!(
                "deadline {} is in the past",
                task.deadline
            )));
        }
        if let Frequency::Unknown(raw) = &task.frequency {
            return Err(RemindrError::InvalidTask(format!("unknown frequency: {}", raw)));
        }

        let task = NewTask {
            description: task.description.trim().to_string(),
            ..task
        };
        self.repo.create_task(task, now)
    }

    pub fn get(&self, id: i64) -> Result<Task> {
        self.repo.get_task(id)?.ok_or(RemindrError::TaskNotFound(id))
    }

    pub fn list_active(&self, user_id: i64) -> Result<Vec<Task>> {
        self.repo.list_active_by_user(user_id)
    }

    /// Candidates for a reminder cycle: open tasks due on or after the date.
    pub fn list_for_reminder(&self, on_or_after: NaiveDate) -> Result<Vec<Task>> {
        self.repo.list_due_candidates(on_or_after)
    }

    pub fn complete(&self, id: i64, now: DateTime<Utc>) -> Result<Task> {
        let mut task = self.get(id)?;
        task.complete(now);
        self.repo.save_task(&task)?;
        Ok(task)
    }

    pub fn delete(&self, id: i64) -> Result<()> {
        self.repo.delete_task(id)
    }

    /// Count a delivered reminder and persist it.
    pub fn increment_reminder_count(&self, task: &mut Task, now: DateTime<Utc>) -> Result<()> {
        task.record_reminder_sent(now);
        self.repo.save_task(task)
    }

    /// Start a new reminder day for every open task.
    pub fn reset_daily_reminders(&self) -> Result<usize> {
        self.repo.reset_daily_counters()
    }
}

/// Importance must lie in 1..=5
pub fn validate_importance(importance: u32) -> Result<()> {
    if !(MIN_IMPORTANCE..=MAX_IMPORTANCE).contains(&importance) {
        return Err(RemindrError::InvalidTask(format!(
            "importance must be between {} and {}, got {}",
            MIN_IMPORTANCE, MAX_IMPORTANCE, importance
        )));
    }
    Ok(())
}
