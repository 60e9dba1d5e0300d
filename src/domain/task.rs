//! Task record and the eligibility rules that decide whether a task takes part
//! in a given day's reminder cycle.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::frequency::Frequency;

/// Lowest importance a task may be created with
pub const MIN_IMPORTANCE: u32 = 1;

/// Highest importance; also the most reminders a task can receive per day
pub const MAX_IMPORTANCE: u32 = 5;

/// Attributes collected when a task is created, before it has an identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    pub user_id: i64,
    pub description: String,
    pub deadline: NaiveDate,
    pub importance: u32,
    pub frequency: Frequency,
}

impl NewTask {
    pub fn new(
        user_id: i64,
        description: impl Into<String>,
        deadline: NaiveDate,
        importance: u32,
        frequency: Frequency,
    ) -> Self {
        Self {
            user_id,
            description: description.into(),
            deadline,
            importance,
            frequency,
        }
    }

    /// Materialize the task once storage has assigned an ID.
    pub fn into_task(self, id: i64, created_at: DateTime<Utc>) -> Task {
        Task {
            id,
            user_id: self.user_id,
            description: self.description,
            deadline: self.deadline,
            importance: self.importance,
            frequency: self.frequency,
            is_completed: false,
            reminders_sent_today: 0,
            last_reminder_at: None,
            created_at,
            updated_at: created_at,
        }
    }
}

/// A tracked task with a deadline and a daily reminder quota
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    //=== Identity ===
    pub id: i64,
    pub user_id: i64,
    pub description: String,

    //=== Reminder policy ===
    /// Calendar date only; time of day never matters
    pub deadline: NaiveDate,
    /// 1..=5, number of slots per day and the daily cap
    pub importance: u32,
    pub frequency: Frequency,

    //=== Runtime state ===
    pub is_completed: bool,
    /// Reset to zero by the daily reset job
    pub reminders_sent_today: u32,
    /// Informational only
    pub last_reminder_at: Option<DateTime<Utc>>,

    //=== Timestamps ===
    /// Reference day for the every-other-day parity
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Whether this task takes part in the reminder cycle on `today`.
    ///
    /// Every-other-day counts from the creation day (which is itself active);
    /// weekly fires on the weekday of the deadline, not of the creation date.
    pub fn participates_on(&self, today: NaiveDate) -> bool {
        if self.is_completed || today > self.deadline {
            return false;
        }

        match &self.frequency {
            Frequency::Daily => true,
            Frequency::EveryOtherDay => {
                let days_since_creation = (today - self.created_at.date_naive()).num_days();
                days_since_creation.rem_euclid(2) == 0
            }
            Frequency::Weekly => today.weekday() == self.deadline.weekday(),
            Frequency::Unknown(_) => true,
        }
    }

    /// Eligible today and still under the daily quota
    pub fn can_send(&self, today: NaiveDate) -> bool {
        self.participates_on(today) && self.reminders_sent_today < self.importance
    }

    /// Importance clamped to the supported range for slot computation
    pub fn effective_importance(&self) -> u32 {
        self.importance.min(MAX_IMPORTANCE)
    }

    /// Whole days from `today` to the deadline; negative once it has passed
    pub fn days_until_deadline(&self, today: NaiveDate) -> i64 {
        (self.deadline - today).num_days()
    }

    /// Rough working-hour budget left before the deadline
    pub fn work_hours_remaining(&self, today: NaiveDate, work_hours_per_day: u32) -> i64 {
        let days = self.days_until_deadline(today);
        if days < 0 {
            return 0;
        }
        days * i64::from(work_hours_per_day)
    }

    /// Five stars, the first `importance` of them filled
    pub fn importance_stars(&self) -> String {
        (0..MAX_IMPORTANCE)
            .map(|i| if i < self.importance { '★' } else { '☆' })
            .collect()
    }

    /// Count a delivered reminder
    pub fn record_reminder_sent(&mut self, at: DateTime<Utc>) {
        self.reminders_sent_today += 1;
        self.last_reminder_at = Some(at);
        self.updated_at = at;
    }

    /// Start a fresh day
    pub fn reset_daily(&mut self) {
        self.reminders_sent_today = 0;
        self.last_reminder_at = None;
    }

    /// Mark the task done; it never participates again
    pub fn complete(&mut self, at: DateTime<Utc>) {
        self.is_completed = true;
        self.updated_at = at;
    }
}
