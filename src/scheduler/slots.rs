//! Reminder slots: when within a day a task's reminders fire, and whether the
//! next one is due.
//!
//! Slots are consumed in order. With `k` reminders already sent today, the
//! next candidate is `schedule[k]`.

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Timelike};

/// Compute the reminder instants for the calendar day of `reference`, in
/// `reference`'s timezone.
///
/// - importance 0 yields no slots
/// - importance 1 yields the midpoint of the work window
/// - importance n >= 2 yields n instants evenly spaced over the closed window
///   `[work_start, work_end]`, the first on work start and the last on work end
pub fn compute_schedule<Tz: TimeZone>(
    importance: u32,
    work_start_hour: u32,
    work_end_hour: u32,
    reference: &DateTime<Tz>,
) -> Vec<DateTime<Tz>> {
    if importance == 0 {
        return Vec::new();
    }

    let midnight = start_of_day(reference);
    let work_start = midnight.clone() + Duration::hours(i64::from(work_start_hour));
    let work_end = midnight + Duration::hours(i64::from(work_end_hour));
    let window = work_end.clone() - work_start.clone();

    if importance == 1 {
        return vec![work_start + window / 2];
    }

    let gaps = i32::try_from(importance - 1).unwrap_or(i32::MAX);
    let interval = window / gaps;

    let mut times: Vec<DateTime<Tz>> = (0..gaps).map(|i| work_start.clone() + interval * i).collect();
    times.push(work_end);
    times
}

/// True when the next unfired slot has arrived (inclusive).
pub fn is_due<Tz: TimeZone>(schedule: &[DateTime<Tz>], sent_count: u32, now: &DateTime<Tz>) -> bool {
    match schedule.get(sent_count as usize) {
        Some(next) => now >= next,
        None => false,
    }
}

/// Half-open work-hour gate: the end hour itself is outside.
pub fn is_within_work_hours<Tz: TimeZone>(work_start_hour: u32, work_end_hour: u32, now: &DateTime<Tz>) -> bool {
    let hour = now.hour();
    hour >= work_start_hour && hour < work_end_hour
}

/// Local midnight of `reference`'s calendar day. Zones whose midnight is
/// skipped by a DST jump fall back to subtracting the elapsed seconds.
fn start_of_day<Tz: TimeZone>(reference: &DateTime<Tz>) -> DateTime<Tz> {
    let local_midnight = reference.date_naive().and_time(NaiveTime::MIN);
    reference
        .timezone()
        .from_local_datetime(&local_midnight)
        .earliest()
        .unwrap_or_else(|| reference.clone() - Duration::seconds(i64::from(reference.num_seconds_from_midnight())))
}
