//! Reminder timing engine
//!
//! Pure functions deciding when a task's reminders fire within a day and
//! whether the next one is due, plus the clock abstraction they run against.

pub mod clock;
pub mod slots;

pub use clock::{Clock, ManualClock, SystemClock, until_next_local};
pub use slots::{compute_schedule, is_due, is_within_work_hours};
