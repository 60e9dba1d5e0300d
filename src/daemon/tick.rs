//! Tick bookkeeping for the reminder daemon
//!
//! Each reminder check produces a `CycleReport`; the daemon folds the reports
//! into a `TickState` that lives as long as the process.

use std::time::Duration;

use chrono::NaiveTime;

/// Default interval between reminder checks
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(300);

/// Timing of the two periodic triggers
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Interval between reminder checks
    pub check_interval: Duration,
    /// Local wall-clock time of the daily counter reset
    pub reset_at: NaiveTime,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            check_interval: DEFAULT_CHECK_INTERVAL,
            reset_at: NaiveTime::MIN,
        }
    }
}

impl TickConfig {
    pub fn new(check_interval: Duration) -> Self {
        Self {
            check_interval,
            ..Self::default()
        }
    }

    /// Set the daily reset time; out-of-range values fall back to midnight
    pub fn with_reset_at(mut self, hour: u32, minute: u32) -> Self {
        self.reset_at = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN);
        self
    }
}

/// Why a candidate task got no reminder this cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Completed, past deadline, off-cadence day or quota used up
    NotEligible,
    /// Local time outside the owner's work window
    OutsideWorkHours,
    /// Next slot not reached yet
    NotDue,
}

/// Outcome of one reminder check
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub candidates: usize,
    pub sent: usize,
    /// Sender refused or could not deliver
    pub failed: usize,
    /// Store or lookup errors
    pub errors: usize,
    pub not_eligible: usize,
    pub outside_work_hours: usize,
    pub not_due: usize,
    /// Cycle stopped early because shutdown was requested
    pub interrupted: bool,
}

impl CycleReport {
    pub fn skip(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::NotEligible => self.not_eligible += 1,
            SkipReason::OutsideWorkHours => self.outside_work_hours += 1,
            SkipReason::NotDue => self.not_due += 1,
        }
    }

    pub fn skipped(&self) -> usize {
        self.not_eligible + self.outside_work_hours + self.not_due
    }
}

/// Running totals across the daemon's lifetime
#[derive(Debug, Clone, Default)]
pub struct TickState {
    /// Reminder checks performed
    pub cycles: u64,
    /// Daily resets performed
    pub resets: u64,
    pub total_sent: u64,
    pub total_failed: u64,
    pub total_errors: u64,
    pub shutdown_requested: bool,
}

impl TickState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a finished cycle into the totals
    pub fn record_cycle(&mut self, report: &CycleReport) {
        self.cycles += 1;
        self.total_sent += report.sent as u64;
        self.total_failed += report.failed as u64;
        self.total_errors += report.errors as u64;
    }

    pub fn record_reset(&mut self) {
        self.resets += 1;
    }

    pub fn request_shutdown(&mut self) {
        self.shutdown_requested = true;
    }
}
