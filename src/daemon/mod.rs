//! Reminder daemon
//!
//! The long-running half of remindr:
//! - `poller` performs one reminder check or one daily reset
//! - `runner` schedules both on tokio timers with a start/stop lifecycle
//! - `tick` holds the timing config and cycle statistics

pub mod poller;
pub mod runner;
pub mod tick;

pub use poller::ReminderPoller;
pub use runner::Daemon;
pub use tick::{CycleReport, DEFAULT_CHECK_INTERVAL, SkipReason, TickConfig, TickState};
