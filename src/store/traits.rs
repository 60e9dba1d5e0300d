//! Repository traits the reminder engine and services are written against.

use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::{NewTask, Task, User};
use crate::error::Result;

/// Persistence for tasks.
pub trait TaskRepository: Send + Sync {
    /// Insert a new task and return it with its assigned ID.
    fn create_task(&self, task: NewTask, now: DateTime<Utc>) -> Result<Task>;

    /// Get a task by ID.
    fn get_task(&self, id: i64) -> Result<Option<Task>>;

    /// Non-completed tasks of one user, soonest deadline first.
    fn list_active_by_user(&self, user_id: i64) -> Result<Vec<Task>>;

    /// Non-completed tasks whose deadline is on or after the given date.
    fn list_due_candidates(&self, on_or_after: NaiveDate) -> Result<Vec<Task>>;

    /// Overwrite the mutable fields of an existing task.
    fn save_task(&self, task: &Task) -> Result<()>;

    /// Delete a task by ID.
    fn delete_task(&self, id: i64) -> Result<()>;

    /// Zero every non-completed task's daily counter and clear its last
    /// reminder time. Returns the number of tasks touched.
    fn reset_daily_counters(&self) -> Result<usize>;
}

/// Persistence for users.
pub trait UserRepository: Send + Sync {
    /// Insert a new user and return it with its assigned ID.
    fn create_user(&self, user: &User) -> Result<User>;

    /// Get a user by ID.
    fn get_user(&self, id: i64) -> Result<Option<User>>;

    /// Get a user by chat-platform identity.
    fn get_user_by_chat_id(&self, chat_id: i64) -> Result<Option<User>>;

    /// Overwrite an existing user's settings.
    fn update_user(&self, user: &User) -> Result<()>;

    /// Delete a user together with all of their tasks.
    fn delete_user(&self, id: i64) -> Result<()>;
}
