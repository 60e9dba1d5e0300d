//! Reminder text rendering (Telegram HTML subset).

use chrono::NaiveDate;

use crate::domain::{Task, User};

/// Everything a reminder message shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderMessage {
    pub description: String,
    pub days_left: i64,
    pub work_hours_left: i64,
    pub stars: String,
    /// 1-based number of this reminder today
    pub ordinal: u32,
    /// Reminders planned for today
    pub total: u32,
}

impl ReminderMessage {
    /// Collect the data for the next reminder of `task` as seen on `today`.
    pub fn for_task(task: &Task, user: &User, today: NaiveDate) -> Self {
        Self {
            description: task.description.clone(),
            days_left: task.days_until_deadline(today),
            work_hours_left: task.work_hours_remaining(today, user.work_hours_per_day),
            stars: task.importance_stars(),
            ordinal: task.reminders_sent_today + 1,
            total: task.effective_importance(),
        }
    }

    pub fn render(&self) -> String {
        format!(
            "🔔 <b>Reminder</b> ({}/{} today)\n\n📋 {}\n\n⏰ Until deadline: <b>{}</b>\n⏱ Working hours: <b>{}</b>\n⚡ Importance: {}",
            self.ordinal,
            self.total,
            escape_html(&self.description),
            plural(self.days_left, "day", "days"),
            plural(self.work_hours_left, "hour", "hours"),
            self.stars,
        )
    }
}

/// Render a task summary line for listings.
pub fn render_task_summary(task: &Task, today: NaiveDate) -> String {
    format!(
        "#{} {} | due {} ({}) | {} | {}",
        task.id,
        task.description,
        task.deadline.format("%d.%m.%Y"),
        plural(task.days_until_deadline(today), "day", "days"),
        task.importance_stars(),
        task.frequency.display_name(),
    )
}

fn plural(n: i64, one: &str, many: &str) -> String {
    if n.abs() == 1 {
        format!("{} {}", n, one)
    } else {
        format!("{} {}", n, many)
    }
}

/// Escape the characters Telegram's HTML parse mode treats as markup.
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}
