//! User lookup and settings.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::domain::{User, UserDefaults};
use crate::error::{RemindrError, Result};
use crate::store::UserRepository;

/// Partial settings change; `None` leaves a field as is
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsUpdate {
    pub timezone: Option<String>,
    pub work_start_hour: Option<u32>,
    pub work_end_hour: Option<u32>,
    pub work_hours_per_day: Option<u32>,
}

impl SettingsUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

pub struct UserService<R> {
    repo: Arc<R>,
    defaults: UserDefaults,
}

impl<R: UserRepository> UserService<R> {
    pub fn new(repo: Arc<R>, defaults: UserDefaults) -> Self {
        Self { repo, defaults }
    }

    /// Fetch the user behind a chat, creating them with default settings on
    /// first contact.
    pub fn get_or_create(&self, chat_id: i64, username: &str, now: DateTime<Utc>) -> Result<User> {
        if let Some(user) = self.repo.get_user_by_chat_id(chat_id)? {
            return Ok(user);
        }

        let user = self.repo.create_user(&User::new(chat_id, username, &self.defaults, now))?;
        log::info!("Created user {} for chat {}", user.id, chat_id);
        Ok(user)
    }

    pub fn get(&self, id: i64) -> Result<User> {
        self.repo.get_user(id)?.ok_or(RemindrError::UserNotFound(id))
    }

    /// Apply and persist a settings change after validating the result.
    pub fn update_settings(&self, user: &User, update: &SettingsUpdate, now: DateTime<Utc>) -> Result<User> {
        let mut updated = user.clone();
        if let Some(timezone) = &update.timezone {
            let timezone = timezone.trim();
            timezone
                .parse::<Tz>()
                .map_err(|_| RemindrError::InvalidSettings(format!("unknown timezone: {}", timezone)))?;
            updated.timezone = timezone.to_string();
        }
        if let Some(start) = update.work_start_hour {
            updated.work_start_hour = start;
        }
        if let Some(end) = update.work_end_hour {
            updated.work_end_hour = end;
        }
        if let Some(hours) = update.work_hours_per_day {
            updated.work_hours_per_day = hours;
        }

        validate_work_window(updated.work_start_hour, updated.work_end_hour)?;
        if !(1..=24).contains(&updated.work_hours_per_day) {
            return Err(RemindrError::InvalidSettings(format!(
                "work_hours_per_day must be between 1 and 24, got {}",
                updated.work_hours_per_day
            )));
        }

        updated.updated_at = now;
        self.repo.update_user(&updated)?;
        Ok(updated)
    }
}

/// Work window must satisfy 0 <= start < end <= 23, so every slot stays on
/// the same calendar day
pub fn validate_work_window(start: u32, end: u32) -> Result<()> {
    if start > 22 || end > 23 {
        return Err(RemindrError::InvalidSettings(format!(
            "work hours out of range: {}-{}",
            start, end
        )));
    }
    if start >= end {
        return Err(RemindrError::InvalidSettings(format!(
            "work_start_hour ({}) must be before work_end_hour ({})",
            start, end
        )));
    }
    Ok(())
}
