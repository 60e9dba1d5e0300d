//! User record: chat identity, timezone and working-hour window.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Timezone assigned to users that never set one
pub const DEFAULT_TIMEZONE: &str = "Europe/Moscow";
pub const DEFAULT_WORK_START_HOUR: u32 = 9;
pub const DEFAULT_WORK_END_HOUR: u32 = 18;
pub const DEFAULT_WORK_HOURS_PER_DAY: u32 = 8;

/// Settings applied to lazily created users
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserDefaults {
    pub timezone: String,
    pub work_start_hour: u32,
    pub work_end_hour: u32,
    pub work_hours_per_day: u32,
}

impl Default for UserDefaults {
    fn default() -> Self {
        Self {
            timezone: DEFAULT_TIMEZONE.to_string(),
            work_start_hour: DEFAULT_WORK_START_HOUR,
            work_end_hour: DEFAULT_WORK_END_HOUR,
            work_hours_per_day: DEFAULT_WORK_HOURS_PER_DAY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    /// Chat-platform identity reminders are delivered to
    pub chat_id: i64,
    pub username: String,
    /// IANA name such as "Europe/Moscow"
    pub timezone: String,
    /// Display only; feeds the "hours remaining" estimate
    pub work_hours_per_day: u32,
    pub work_start_hour: u32,
    pub work_end_hour: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Build an unsaved user (id 0) from the given defaults.
    pub fn new(chat_id: i64, username: impl Into<String>, defaults: &UserDefaults, now: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            chat_id,
            username: username.into(),
            timezone: defaults.timezone.clone(),
            work_hours_per_day: defaults.work_hours_per_day,
            work_start_hour: defaults.work_start_hour,
            work_end_hour: defaults.work_end_hour,
            created_at: now,
            updated_at: now,
        }
    }

    /// Resolve the configured timezone. An empty name means the default zone;
    /// anything that does not resolve falls back to UTC.
    pub fn tz(&self) -> Tz {
        resolve_timezone(&self.timezone)
    }
}

/// Resolve an IANA timezone name, never failing.
pub fn resolve_timezone(name: &str) -> Tz {
    let name = name.trim();
    let name = if name.is_empty() { DEFAULT_TIMEZONE } else { name };
    name.parse::<Tz>().unwrap_or_else(|_| {
        log::debug!("Unknown timezone {:?}, using UTC", name);
        Tz::UTC
    })
}
