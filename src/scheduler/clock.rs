//! Injectable time source for the reminder daemon.

use std::sync::Mutex;

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};

/// Source of "now" for everything that schedules
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to. Used by tests and replays.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(start) }
    }

    pub fn set(&self, to: DateTime<Utc>) {
        if let Ok(mut now) = self.now.lock() {
            *now = to;
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.lock() {
            Ok(now) => *now,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// Time left until the next occurrence of wall-clock time `at` in `now`'s
/// timezone. Never zero: if `now` is exactly `at`, the next day is chosen.
pub fn until_next_local<Tz: TimeZone>(now: &DateTime<Tz>, at: NaiveTime) -> Duration {
    let tz = now.timezone();
    let mut date = now.date_naive();
    if now.time() >= at {
        date = date.succ_opt().unwrap_or(date);
    }

    // DST gaps can swallow `at`; retry a day later, then settle for 24h.
    for _ in 0..2 {
        if let Some(next) = tz.from_local_datetime(&date.and_time(at)).earliest() {
            let wait = next - now.clone();
            if wait > Duration::zero() {
                return wait;
            }
        }
        date = date.succ_opt().unwrap_or(date);
    }
    Duration::days(1)
}
