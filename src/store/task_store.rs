//! SQLite-backed store for users and tasks.
//!
//! A single `rusqlite::Connection` behind a `Mutex`. Dates are stored as ISO
//! text (so `deadline >= ?` compares correctly), timestamps as Unix
//! milliseconds. Deleting a user cascades to their tasks.

use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::traits::{TaskRepository, UserRepository};
use crate::domain::{Frequency, MAX_IMPORTANCE, NewTask, Task, User};
use crate::error::{RemindrError, Result};

const DATE_FORMAT: &str = "%Y-%m-%d";

const TASK_COLUMNS: &str = "id, user_id, description, deadline, importance, frequency, is_completed, \
                            reminders_sent_today, last_reminder_at, created_at, updated_at";

const USER_COLUMNS: &str = "id, chat_id, username, timezone, work_hours_per_day, work_start_hour, \
                            work_end_hour, created_at, updated_at";

/// TaskStore persists users and tasks in one SQLite database.
pub struct TaskStore {
    db: Mutex<Connection>,
}

impl std::fmt::Debug for TaskStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskStore").finish_non_exhaustive()
    }
}

impl TaskStore {
    /// Open or create a store at the given database path, creating parent
    /// directories as needed.
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let db = Connection::open(db_path)?;
        Self::from_connection(db)
    }

    /// Open a throwaway in-memory store.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(db: Connection) -> Result<Self> {
        Self::init_schema(&db)?;
        Ok(Self { db: Mutex::new(db) })
    }

    /// Initialize the SQLite schema.
    fn init_schema(db: &Connection) -> Result<()> {
        db.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                chat_id INTEGER NOT NULL UNIQUE,
                username TEXT NOT NULL DEFAULT '',
                timezone TEXT NOT NULL,
                work_hours_per_day INTEGER NOT NULL,
                work_start_hour INTEGER NOT NULL,
                work_end_hour INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                description TEXT NOT NULL,
                deadline TEXT NOT NULL,
                importance INTEGER NOT NULL,
                frequency TEXT NOT NULL,
                is_completed INTEGER NOT NULL DEFAULT 0,
                reminders_sent_today INTEGER NOT NULL DEFAULT 0,
                last_reminder_at INTEGER,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_tasks_user ON tasks(user_id);
            CREATE INDEX IF NOT EXISTS idx_tasks_due ON tasks(is_completed, deadline);
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.db.lock().map_err(|e| RemindrError::Storage(e.to_string()))
    }

    #[cfg(test)]
    pub(crate) fn execute_raw(&self, sql: &str) -> Result<()> {
        self.conn()?.execute_batch(sql)?;
        Ok(())
    }

    fn query_tasks(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Task>> {
        let db = self.conn()?;
        let mut stmt = db.prepare(sql)?;
        let rows = stmt.query_map(params, task_from_row)?;

        // A row that cannot be mapped is skipped so it cannot hide the others
        let mut tasks = Vec::new();
        for row in rows {
            match row {
                Ok(task) => tasks.push(task),
                Err(e) => log::warn!("Skipping unreadable task row: {}", e),
            }
        }
        Ok(tasks)
    }

    fn query_user(&self, sql: &str, params: impl rusqlite::Params) -> Result<Option<User>> {
        let db = self.conn()?;
        Ok(db.query_row(sql, params, user_from_row).optional()?)
    }
}

impl TaskRepository for TaskStore {
    fn create_task(&self, task: NewTask, now: DateTime<Utc>) -> Result<Task> {
        let db = self.conn()?;
        db.execute(
            r#"
            INSERT INTO tasks (user_id, description, deadline, importance, frequency, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            "#,
            params![
                task.user_id,
                task.description,
                task.deadline.format(DATE_FORMAT).to_string(),
                task.importance,
                task.frequency.as_str(),
                now.timestamp_millis(),
            ],
        )?;
        let id = db.last_insert_rowid();
        Ok(task.into_task(id, from_millis(now.timestamp_millis())))
    }

    fn get_task(&self, id: i64) -> Result<Option<Task>> {
        let db = self.conn()?;
        let sql = format!("SELECT {} FROM tasks WHERE id = ?1", TASK_COLUMNS);
        Ok(db.query_row(&sql, [id], task_from_row).optional()?)
    }

    fn list_active_by_user(&self, user_id: i64) -> Result<Vec<Task>> {
        let sql = format!(
            "SELECT {} FROM tasks WHERE user_id = ?1 AND is_completed = 0 ORDER BY deadline ASC, id ASC",
            TASK_COLUMNS
        );
        self.query_tasks(&sql, [user_id])
    }

    fn list_due_candidates(&self, on_or_after: NaiveDate) -> Result<Vec<Task>> {
        let sql = format!(
            "SELECT {} FROM tasks WHERE is_completed = 0 AND deadline >= ?1 ORDER BY id ASC",
            TASK_COLUMNS
        );
        self.query_tasks(&sql, [on_or_after.format(DATE_FORMAT).to_string()])
    }

    fn save_task(&self, task: &Task) -> Result<()> {
        let db = self.conn()?;
        let changed = db.execute(
            r#"
            UPDATE tasks
            SET description = ?2, deadline = ?3, importance = ?4, frequency = ?5, is_completed = ?6,
                reminders_sent_today = ?7, last_reminder_at = ?8, updated_at = ?9
            WHERE id = ?1
            "#,
            params![
                task.id,
                task.description,
                task.deadline.format(DATE_FORMAT).to_string(),
                task.importance,
                task.frequency.as_str(),
                task.is_completed,
                task.reminders_sent_today,
                task.last_reminder_at.map(|t| t.timestamp_millis()),
                task.updated_at.timestamp_millis(),
            ],
        )?;
        if changed == 0 {
            return Err(RemindrError::TaskNotFound(task.id));
        }
        Ok(())
    }

    fn delete_task(&self, id: i64) -> Result<()> {
        let db = self.conn()?;
        if db.execute("DELETE FROM tasks WHERE id = ?1", [id])? == 0 {
            return Err(RemindrError::TaskNotFound(id));
        }
        Ok(())
    }

    fn reset_daily_counters(&self) -> Result<usize> {
        let db = self.conn()?;
        let changed = db.execute(
            "UPDATE tasks SET reminders_sent_today = 0, last_reminder_at = NULL WHERE is_completed = 0",
            [],
        )?;
        Ok(changed)
    }
}

impl UserRepository for TaskStore {
    fn create_user(&self, user: &User) -> Result<User> {
        let db = self.conn()?;
        db.execute(
            r#"
            INSERT INTO users
            (chat_id, username, timezone, work_hours_per_day, work_start_hour, work_end_hour, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                user.chat_id,
                user.username,
                user.timezone,
                user.work_hours_per_day,
                user.work_start_hour,
                user.work_end_hour,
                user.created_at.timestamp_millis(),
                user.updated_at.timestamp_millis(),
            ],
        )?;

        let mut created = user.clone();
        created.id = db.last_insert_rowid();
        created.created_at = from_millis(user.created_at.timestamp_millis());
        created.updated_at = from_millis(user.updated_at.timestamp_millis());
        Ok(created)
    }

    fn get_user(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS);
        self.query_user(&sql, [id])
    }

    fn get_user_by_chat_id(&self, chat_id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE chat_id = ?1", USER_COLUMNS);
        self.query_user(&sql, [chat_id])
    }

    fn update_user(&self, user: &User) -> Result<()> {
        let db = self.conn()?;
        let changed = db.execute(
            r#"
            UPDATE users
            SET username = ?2, timezone = ?3, work_hours_per_day = ?4, work_start_hour = ?5,
                work_end_hour = ?6, updated_at = ?7
            WHERE id = ?1
            "#,
            params![
                user.id,
                user.username,
                user.timezone,
                user.work_hours_per_day,
                user.work_start_hour,
                user.work_end_hour,
                user.updated_at.timestamp_millis(),
            ],
        )?;
        if changed == 0 {
            return Err(RemindrError::UserNotFound(user.id));
        }
        Ok(())
    }

    fn delete_user(&self, id: i64) -> Result<()> {
        let db = self.conn()?;
        if db.execute("DELETE FROM users WHERE id = ?1", [id])? == 0 {
            return Err(RemindrError::UserNotFound(id));
        }
        Ok(())
    }
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    let deadline: String = row.get(3)?;
    let deadline = NaiveDate::parse_from_str(&deadline, DATE_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;
    let frequency: String = row.get(5)?;
    let last_reminder_at: Option<i64> = row.get(8)?;
    // Counters are clamped rather than rejected when the stored value is out of range
    let importance: i64 = row.get(4)?;
    let reminders_sent_today: i64 = row.get(7)?;

    Ok(Task {
        id: row.get(0)?,
        user_id: row.get(1)?,
        description: row.get(2)?,
        deadline,
        importance: importance.clamp(0, i64::from(MAX_IMPORTANCE)) as u32,
        frequency: Frequency::from_stored(&frequency),
        is_completed: row.get(6)?,
        reminders_sent_today: reminders_sent_today.clamp(0, i64::from(u32::MAX)) as u32,
        last_reminder_at: last_reminder_at.map(from_millis),
        created_at: from_millis(row.get(9)?),
        updated_at: from_millis(row.get(10)?),
    })
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        chat_id: row.get(1)?,
        username: row.get(2)?,
        timezone: row.get(3)?,
        work_hours_per_day: row.get(4)?,
        work_start_hour: row.get(5)?,
        work_end_hour: row.get(6)?,
        created_at: from_millis(row.get(7)?),
        updated_at: from_millis(row.get(8)?),
    })
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserDefaults;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap()
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn store_with_user(chat_id: i64) -> (TaskStore, User) {
        let store = TaskStore::open_in_memory().unwrap();
        let user = store
            .create_user(&User::new(chat_id, "alice", &UserDefaults::default(), now()))
            .unwrap();
        (store, user)
    }

    fn add_task(store: &TaskStore, user_id: i64, deadline: NaiveDate, importance: u32) -> Task {
        store
            .create_task(NewTask::new(user_id, "Ship it", deadline, importance, Frequency::Daily), now())
            .unwrap()
    }

    #[test]
    fn test_open_creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("nested").join("remindr.db");
        let _store = TaskStore::open(&db_path).unwrap();
        assert!(db_path.exists());
    }

    #[test]
    fn test_create_and_get_user() {
        let (store, user) = store_with_user(100);
        assert!(user.id > 0);

        let by_id = store.get_user(user.id).unwrap().unwrap();
        assert_eq!(by_id, user);

        let by_chat = store.get_user_by_chat_id(100).unwrap().unwrap();
        assert_eq!(by_chat.id, user.id);

        assert!(store.get_user_by_chat_id(999).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_chat_id_rejected() {
        let (store, _user) = store_with_user(100);
        let dup = User::new(100, "bob", &UserDefaults::default(), now());
        assert!(store.create_user(&dup).is_err());
    }

    #[test]
    fn test_update_user() {
        let (store, mut user) = store_with_user(100);
        user.timezone = "Asia/Tokyo".to_string();
        user.work_start_hour = 10;
        user.work_end_hour = 19;
        store.update_user(&user).unwrap();

        let loaded = store.get_user(user.id).unwrap().unwrap();
        assert_eq!(loaded.timezone, "Asia/Tokyo");
        assert_eq!(loaded.work_start_hour, 10);
        assert_eq!(loaded.work_end_hour, 19);
    }

    #[test]
    fn test_update_missing_user() {
        let store = TaskStore::open_in_memory().unwrap();
        let mut ghost = User::new(1, "", &UserDefaults::default(), now());
        ghost.id = 77;
        assert!(matches!(store.update_user(&ghost), Err(RemindrError::UserNotFound(77))));
    }

    #[test]
    fn test_create_and_get_task() {
        let (store, user) = store_with_user(100);
        let task = add_task(&store, user.id, day(2024, 1, 20), 3);

        let loaded = store.get_task(task.id).unwrap().unwrap();
        assert_eq!(loaded, task);
        assert_eq!(loaded.deadline, day(2024, 1, 20));
        assert_eq!(loaded.frequency, Frequency::Daily);
        assert_eq!(loaded.created_at, now());
    }

    #[test]
    fn test_get_missing_task() {
        let store = TaskStore::open_in_memory().unwrap();
        assert!(store.get_task(12345).unwrap().is_none());
    }

    #[test]
    fn test_task_requires_existing_user() {
        let store = TaskStore::open_in_memory().unwrap();
        let result = store.create_task(NewTask::new(404, "orphan", day(2024, 1, 20), 1, Frequency::Daily), now());
        assert!(result.is_err());
    }

    #[test]
    fn test_save_task_round_trips_runtime_state() {
        let (store, user) = store_with_user(100);
        let mut task = add_task(&store, user.id, day(2024, 1, 20), 3);

        let sent_at = Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap();
        task.record_reminder_sent(sent_at);
        store.save_task(&task).unwrap();

        let loaded = store.get_task(task.id).unwrap().unwrap();
        assert_eq!(loaded.reminders_sent_today, 1);
        assert_eq!(loaded.last_reminder_at, Some(sent_at));
    }

    #[test]
    fn test_unknown_stored_frequency_survives_load() {
        let (store, user) = store_with_user(100);
        let task = add_task(&store, user.id, day(2024, 1, 20), 3);
        store
            .conn()
            .unwrap()
            .execute("UPDATE tasks SET frequency = 'monthly' WHERE id = ?1", [task.id])
            .unwrap();

        let loaded = store.get_task(task.id).unwrap().unwrap();
        assert_eq!(loaded.frequency, Frequency::Unknown("monthly".to_string()));
    }

    #[test]
    fn test_out_of_range_counters_are_clamped() {
        let (store, user) = store_with_user(100);
        let negative = add_task(&store, user.id, day(2024, 1, 20), 3);
        let oversized = add_task(&store, user.id, day(2024, 1, 20), 3);
        store
            .execute_raw(&format!(
                "UPDATE tasks SET importance = -1, reminders_sent_today = -4 WHERE id = {};
                 UPDATE tasks SET importance = 99999999999 WHERE id = {};",
                negative.id, oversized.id
            ))
            .unwrap();

        let negative = store.get_task(negative.id).unwrap().unwrap();
        assert_eq!(negative.importance, 0);
        assert_eq!(negative.reminders_sent_today, 0);
        assert_eq!(store.get_task(oversized.id).unwrap().unwrap().importance, MAX_IMPORTANCE);
    }

    #[test]
    fn test_unreadable_row_does_not_hide_others() {
        let (store, user) = store_with_user(100);
        let broken = add_task(&store, user.id, day(2024, 1, 20), 3);
        let good = add_task(&store, user.id, day(2024, 1, 20), 3);
        store
            .execute_raw(&format!("UPDATE tasks SET deadline = 'someday' WHERE id = {}", broken.id))
            .unwrap();

        let candidates = store.list_due_candidates(day(2024, 1, 15)).unwrap();
        assert_eq!(candidates.iter().map(|t| t.id).collect::<Vec<_>>(), vec![good.id]);
        assert_eq!(store.list_active_by_user(user.id).unwrap().len(), 1);
    }

    #[test]
    fn test_list_due_candidates_filters_completed_and_past() {
        let (store, user) = store_with_user(100);
        let past = add_task(&store, user.id, day(2024, 1, 14), 1);
        let today = add_task(&store, user.id, day(2024, 1, 15), 1);
        let future = add_task(&store, user.id, day(2024, 2, 1), 1);
        let mut done = add_task(&store, user.id, day(2024, 2, 1), 1);
        done.complete(now());
        store.save_task(&done).unwrap();

        let ids: Vec<i64> = store
            .list_due_candidates(day(2024, 1, 15))
            .unwrap()
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![today.id, future.id]);
        assert!(!ids.contains(&past.id));
    }

    #[test]
    fn test_list_active_by_user_orders_by_deadline() {
        let (store, user) = store_with_user(100);
        let other = store
            .create_user(&User::new(200, "bob", &UserDefaults::default(), now()))
            .unwrap();
        let later = add_task(&store, user.id, day(2024, 3, 1), 2);
        let sooner = add_task(&store, user.id, day(2024, 2, 1), 2);
        add_task(&store, other.id, day(2024, 1, 20), 2);

        let ids: Vec<i64> = store.list_active_by_user(user.id).unwrap().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![sooner.id, later.id]);
    }

    #[test]
    fn test_delete_task() {
        let (store, user) = store_with_user(100);
        let task = add_task(&store, user.id, day(2024, 1, 20), 2);
        store.delete_task(task.id).unwrap();
        assert!(store.get_task(task.id).unwrap().is_none());
        assert!(matches!(store.delete_task(task.id), Err(RemindrError::TaskNotFound(_))));
    }

    #[test]
    fn test_reset_daily_counters_skips_completed() {
        let (store, user) = store_with_user(100);
        let sent_at = Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap();

        let mut open = add_task(&store, user.id, day(2024, 1, 20), 5);
        open.reminders_sent_today = 3;
        open.last_reminder_at = Some(sent_at);
        store.save_task(&open).unwrap();

        let mut done = add_task(&store, user.id, day(2024, 1, 20), 5);
        done.reminders_sent_today = 2;
        done.complete(sent_at);
        store.save_task(&done).unwrap();

        assert_eq!(store.reset_daily_counters().unwrap(), 1);

        let open = store.get_task(open.id).unwrap().unwrap();
        assert_eq!(open.reminders_sent_today, 0);
        assert!(open.last_reminder_at.is_none());

        let done = store.get_task(done.id).unwrap().unwrap();
        assert_eq!(done.reminders_sent_today, 2);
    }

    #[test]
    fn test_delete_user_cascades_to_tasks() {
        let (store, user) = store_with_user(100);
        let task = add_task(&store, user.id, day(2024, 1, 20), 2);

        store.delete_user(user.id).unwrap();

        assert!(store.get_user(user.id).unwrap().is_none());
        assert!(store.get_task(task.id).unwrap().is_none());
    }

    #[test]
    fn test_persistence_across_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("remindr.db");

        let task_id = {
            let store = TaskStore::open(&db_path).unwrap();
            let user = store
                .create_user(&User::new(100, "alice", &UserDefaults::default(), now()))
                .unwrap();
            add_task(&store, user.id, day(2024, 1, 20), 4).id
        };

        let store = TaskStore::open(&db_path).unwrap();
        let task = store.get_task(task_id).unwrap().unwrap();
        assert_eq!(task.importance, 4);
        assert_eq!(task.description, "Ship it");
    }
}
