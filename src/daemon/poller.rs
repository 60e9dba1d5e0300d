//! Reminder poller - one pass over every open task
//!
//! For each candidate the poller resolves the owner, moves "now" into the
//! owner's timezone, and walks the gates in order: eligibility, work hours,
//! due slot. A task that clears all three gets one reminder; the count is only
//! incremented after the sender reports success.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use tokio::sync::watch;

use super::tick::{CycleReport, SkipReason};
use crate::domain::{Task, User};
use crate::error::{RemindrError, Result};
use crate::render::ReminderMessage;
use crate::scheduler::{Clock, compute_schedule, is_due, is_within_work_hours};
use crate::sender::ReminderSender;
use crate::service::TaskService;
use crate::store::{TaskRepository, UserRepository};

/// What happened to a single task during a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskOutcome {
    Sent,
    SendFailed,
    Skipped(SkipReason),
}

/// Runs reminder checks and daily resets against a store and a sender
pub struct ReminderPoller<S> {
    tasks: TaskService<S>,
    users: Arc<S>,
    sender: Arc<dyn ReminderSender>,
    clock: Arc<dyn Clock>,
    shutdown: Option<watch::Receiver<bool>>,
}

impl<S> ReminderPoller<S>
where
    S: TaskRepository + UserRepository + 'static,
{
    pub fn new(store: Arc<S>, sender: Arc<dyn ReminderSender>, clock: Arc<dyn Clock>) -> Self {
        Self {
            tasks: TaskService::new(Arc::clone(&store)),
            users: store,
            sender,
            clock,
            shutdown: None,
        }
    }

    /// Stop between tasks once `shutdown` flips to true
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// One reminder check over all candidate tasks.
    ///
    /// Errors are contained per task: a missing user or a failed write is
    /// counted and logged, and the remaining tasks are still processed.
    pub async fn check_reminders(&self) -> CycleReport {
        let now = self.clock.now();
        let mut report = CycleReport::default();

        // Owners west of UTC may still be on yesterday's date; eligibility
        // re-checks the deadline against each owner's local day.
        let utc_today = now.date_naive();
        let floor = utc_today.pred_opt().unwrap_or(utc_today);

        let candidates = match self.tasks.list_for_reminder(floor) {
            Ok(tasks) => tasks,
            Err(e) => {
                error!("Failed to load reminder candidates: {}", e);
                report.errors += 1;
                return report;
            }
        };
        report.candidates = candidates.len();

        let mut owners: HashMap<i64, Option<User>> = HashMap::new();
        for task in candidates {
            if self.shutdown_requested() {
                info!("Shutdown requested, stopping reminder check early");
                report.interrupted = true;
                break;
            }

            let task_id = task.id;
            match self.process_task(task, now, &mut owners).await {
                Ok(TaskOutcome::Sent) => report.sent += 1,
                Ok(TaskOutcome::SendFailed) => report.failed += 1,
                Ok(TaskOutcome::Skipped(reason)) => report.skip(reason),
                Err(e) => {
                    warn!("Skipping task {} this cycle: {}", task_id, e);
                    report.errors += 1;
                }
            }
        }

        if report.sent > 0 || report.failed > 0 || report.errors > 0 {
            info!(
                "Reminder check: {} candidates, {} sent, {} failed, {} errors",
                report.candidates, report.sent, report.failed, report.errors
            );
        } else {
            debug!(
                "Reminder check: {} candidates, nothing due ({} skipped)",
                report.candidates,
                report.skipped()
            );
        }
        report
    }

    async fn process_task(
        &self,
        mut task: Task,
        now: DateTime<Utc>,
        owners: &mut HashMap<i64, Option<User>>,
    ) -> Result<TaskOutcome> {
        if !owners.contains_key(&task.user_id) {
            let owner = self.users.get_user(task.user_id)?;
            owners.insert(task.user_id, owner);
        }
        let user = owners
            .get(&task.user_id)
            .and_then(Option::as_ref)
            .ok_or(RemindrError::UserNotFound(task.user_id))?;

        let local_now = now.with_timezone(&user.tz());
        let today = local_now.date_naive();

        if !task.can_send(today) {
            return Ok(TaskOutcome::Skipped(SkipReason::NotEligible));
        }
        if !is_within_work_hours(user.work_start_hour, user.work_end_hour, &local_now) {
            return Ok(TaskOutcome::Skipped(SkipReason::OutsideWorkHours));
        }

        let schedule = compute_schedule(
            task.effective_importance(),
            user.work_start_hour,
            user.work_end_hour,
            &local_now,
        );
        if !is_due(&schedule, task.reminders_sent_today, &local_now) {
            return Ok(TaskOutcome::Skipped(SkipReason::NotDue));
        }

        let text = ReminderMessage::for_task(&task, user, today).render();
        if let Err(e) = self.sender.send_reminder(user.chat_id, &text, task.id).await {
            warn!(
                "Failed to send reminder for task {} to chat {}: {} (retryable: {})",
                task.id,
                user.chat_id,
                e,
                e.is_retryable()
            );
            return Ok(TaskOutcome::SendFailed);
        }

        self.tasks.increment_reminder_count(&mut task, now)?;
        info!(
            "Sent reminder {}/{} for task {} (user {}, chat {})",
            task.reminders_sent_today,
            schedule.len(),
            task.id,
            task.user_id,
            user.chat_id
        );
        Ok(TaskOutcome::Sent)
    }

    /// Zero every open task's daily counter.
    pub fn reset_daily(&self) -> Result<usize> {
        let count = self.tasks.reset_daily_reminders()?;
        info!("Daily reset: cleared reminder counters on {} tasks", count);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Frequency, NewTask, UserDefaults};
    use crate::scheduler::ManualClock;
    use crate::sender::SendError;
    use crate::store::TaskStore;
    use async_trait::async_trait;
    use chrono::{Duration, NaiveDate, TimeZone};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSender {
        sent: Mutex<Vec<(i64, i64, String)>>,
    }

    impl RecordingSender {
        fn sent(&self) -> Vec<(i64, i64, String)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ReminderSender for RecordingSender {
        async fn send_reminder(&self, chat_id: i64, text: &str, task_id: i64) -> std::result::Result<(), SendError> {
            self.sent.lock().unwrap().push((chat_id, task_id, text.to_string()));
            Ok(())
        }
    }

    struct FailingSender;

    #[async_trait]
    impl ReminderSender for FailingSender {
        async fn send_reminder(&self, _chat_id: i64, _text: &str, _task_id: i64) -> std::result::Result<(), SendError> {
            Err(SendError::Api {
                status: 502,
                description: "Bad Gateway".to_string(),
            })
        }
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, h, m, 0).unwrap()
    }

    fn utc_defaults() -> UserDefaults {
        UserDefaults {
            timezone: "UTC".to_string(),
            ..UserDefaults::default()
        }
    }

    struct Fixture {
        store: Arc<TaskStore>,
        clock: Arc<ManualClock>,
        user: User,
    }

    impl Fixture {
        fn new(start: DateTime<Utc>, defaults: &UserDefaults) -> Self {
            let store = Arc::new(TaskStore::open_in_memory().unwrap());
            let user = store.create_user(&User::new(777, "alice", defaults, start)).unwrap();
            Self {
                store,
                clock: Arc::new(ManualClock::new(start)),
                user,
            }
        }

        fn add_task(&self, importance: u32, deadline: NaiveDate, frequency: Frequency) -> Task {
            self.store
                .create_task(
                    NewTask::new(self.user.id, "Prepare slides", deadline, importance, frequency),
                    self.clock.now(),
                )
                .unwrap()
        }

        fn poller(&self, sender: Arc<dyn ReminderSender>) -> ReminderPoller<TaskStore> {
            ReminderPoller::new(Arc::clone(&self.store), sender, self.clock.clone())
        }

        fn reload(&self, id: i64) -> Task {
            self.store.get_task(id).unwrap().unwrap()
        }
    }

    fn tomorrow() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 16).unwrap()
    }

    #[tokio::test]
    async fn test_sends_at_first_slot_and_increments() {
        let fx = Fixture::new(at(9, 0), &utc_defaults());
        let task = fx.add_task(5, tomorrow(), Frequency::Daily);
        let sender = Arc::new(RecordingSender::default());
        let poller = fx.poller(sender.clone());

        let report = poller.check_reminders().await;

        assert_eq!(report.candidates, 1);
        assert_eq!(report.sent, 1);
        let sent = sender.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, 777);
        assert_eq!(sent[0].1, task.id);
        assert!(sent[0].2.contains("(1/5 today)"));

        let reloaded = fx.reload(task.id);
        assert_eq!(reloaded.reminders_sent_today, 1);
        assert_eq!(reloaded.last_reminder_at, Some(at(9, 0)));
    }

    #[tokio::test]
    async fn test_waits_for_next_slot() {
        let fx = Fixture::new(at(9, 0), &utc_defaults());
        let task = fx.add_task(5, tomorrow(), Frequency::Daily);
        let sender = Arc::new(RecordingSender::default());
        let poller = fx.poller(sender.clone());

        poller.check_reminders().await;

        fx.clock.set(at(10, 0));
        let report = poller.check_reminders().await;
        assert_eq!(report.sent, 0);
        assert_eq!(report.not_due, 1);

        fx.clock.set(at(11, 15));
        let report = poller.check_reminders().await;
        assert_eq!(report.sent, 1);
        assert_eq!(fx.reload(task.id).reminders_sent_today, 2);
        assert_eq!(sender.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_late_start_sends_one_reminder_per_cycle() {
        let fx = Fixture::new(at(16, 0), &utc_defaults());
        let task = fx.add_task(5, tomorrow(), Frequency::Daily);
        let sender = Arc::new(RecordingSender::default());
        let poller = fx.poller(sender.clone());

        // Four slots have passed, but each cycle only catches up by one.
        poller.check_reminders().await;
        poller.check_reminders().await;
        assert_eq!(fx.reload(task.id).reminders_sent_today, 2);
        assert_eq!(sender.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_outside_work_hours_is_skipped() {
        let fx = Fixture::new(at(8, 59), &utc_defaults());
        fx.add_task(5, tomorrow(), Frequency::Daily);
        let sender = Arc::new(RecordingSender::default());
        let poller = fx.poller(sender.clone());

        let report = poller.check_reminders().await;
        assert_eq!(report.outside_work_hours, 1);

        fx.clock.set(at(18, 0));
        let report = poller.check_reminders().await;
        assert_eq!(report.outside_work_hours, 1);
        assert!(sender.sent().is_empty());
    }

    #[tokio::test]
    async fn test_importance_one_fires_at_midpoint() {
        let fx = Fixture::new(at(13, 29), &utc_defaults());
        let task = fx.add_task(1, tomorrow(), Frequency::Daily);
        let sender = Arc::new(RecordingSender::default());
        let poller = fx.poller(sender.clone());

        assert_eq!(poller.check_reminders().await.not_due, 1);

        fx.clock.set(at(13, 30));
        assert_eq!(poller.check_reminders().await.sent, 1);

        fx.clock.set(at(15, 0));
        let report = poller.check_reminders().await;
        assert_eq!(report.not_eligible, 1);
        assert_eq!(fx.reload(task.id).reminders_sent_today, 1);
    }

    #[tokio::test]
    async fn test_send_failure_leaves_task_unchanged() {
        let fx = Fixture::new(at(9, 0), &utc_defaults());
        let task = fx.add_task(3, tomorrow(), Frequency::Daily);
        let poller = fx.poller(Arc::new(FailingSender));

        let report = poller.check_reminders().await;
        assert_eq!(report.failed, 1);
        assert_eq!(report.sent, 0);

        let reloaded = fx.reload(task.id);
        assert_eq!(reloaded.reminders_sent_today, 0);
        assert_eq!(reloaded.last_reminder_at, None);

        // Next cycle retries with a working sender
        let sender = Arc::new(RecordingSender::default());
        let poller = fx.poller(sender.clone());
        fx.clock.advance(Duration::minutes(5));
        assert_eq!(poller.check_reminders().await.sent, 1);
    }

    #[tokio::test]
    async fn test_uses_owner_timezone() {
        // 06:00 UTC is 09:00 in Moscow
        let fx = Fixture::new(at(6, 0), &UserDefaults::default());
        fx.add_task(5, tomorrow(), Frequency::Daily);
        let sender = Arc::new(RecordingSender::default());
        let poller = fx.poller(sender.clone());

        assert_eq!(poller.check_reminders().await.sent, 1);

        // 15:30 UTC is 18:30 in Moscow, after work
        fx.clock.set(at(15, 30));
        assert_eq!(poller.check_reminders().await.outside_work_hours, 1);
    }

    #[tokio::test]
    async fn test_ineligible_tasks_are_skipped() {
        let fx = Fixture::new(at(9, 0), &utc_defaults());
        // Monday 2024-01-15; deadline on a Wednesday
        fx.add_task(3, NaiveDate::from_ymd_opt(2024, 1, 17).unwrap(), Frequency::Weekly);
        let done = fx.add_task(3, tomorrow(), Frequency::Daily);
        let mut done = fx.reload(done.id);
        done.complete(at(9, 0));
        fx.store.save_task(&done).unwrap();

        let sender = Arc::new(RecordingSender::default());
        let report = fx.poller(sender.clone()).check_reminders().await;

        assert_eq!(report.candidates, 1);
        assert_eq!(report.not_eligible, 1);
        assert!(sender.sent().is_empty());
    }

    #[tokio::test]
    async fn test_missing_owner_does_not_stop_cycle() {
        let fx = Fixture::new(at(9, 0), &utc_defaults());
        let good = fx.add_task(2, tomorrow(), Frequency::Daily);

        let other = fx
            .store
            .create_user(&User::new(888, "bob", &utc_defaults(), at(9, 0)))
            .unwrap();
        fx.store
            .create_task(NewTask::new(other.id, "Orphan", tomorrow(), 2, Frequency::Daily), at(9, 0))
            .unwrap();
        // Drop the owner row without cascading so the task is orphaned
        fx.store.execute_raw("PRAGMA foreign_keys = OFF").unwrap();
        fx.store.delete_user(other.id).unwrap();

        let sender = Arc::new(RecordingSender::default());
        let report = fx.poller(sender.clone()).check_reminders().await;

        assert_eq!(report.candidates, 2);
        assert_eq!(report.errors, 1);
        assert_eq!(report.sent, 1);
        assert_eq!(sender.sent()[0].1, good.id);
    }

    #[tokio::test]
    async fn test_corrupted_rows_do_not_block_other_tasks() {
        let fx = Fixture::new(at(9, 0), &utc_defaults());
        let negative = fx.add_task(5, tomorrow(), Frequency::Daily);
        let unreadable = fx.add_task(5, tomorrow(), Frequency::Daily);
        let good = fx.add_task(5, tomorrow(), Frequency::Daily);
        fx.store
            .execute_raw(&format!(
                "UPDATE tasks SET importance = -1 WHERE id = {};
                 UPDATE tasks SET deadline = 'not a date' WHERE id = {};",
                negative.id, unreadable.id
            ))
            .unwrap();

        let sender = Arc::new(RecordingSender::default());
        let report = fx.poller(sender.clone()).check_reminders().await;

        assert_eq!(report.errors, 0);
        assert_eq!(report.candidates, 2);
        assert_eq!(report.not_eligible, 1);
        assert_eq!(report.sent, 1);
        let sent: Vec<i64> = sender.sent().iter().map(|(_, task_id, _)| *task_id).collect();
        assert_eq!(sent, vec![good.id]);
    }

    #[tokio::test]
    async fn test_reset_makes_task_eligible_again() {
        let fx = Fixture::new(at(14, 0), &utc_defaults());
        let task = fx.add_task(5, tomorrow(), Frequency::Daily);
        let mut loaded = fx.reload(task.id);
        loaded.reminders_sent_today = 3;
        fx.store.save_task(&loaded).unwrap();

        let sender = Arc::new(RecordingSender::default());
        let poller = fx.poller(sender.clone());
        assert_eq!(poller.check_reminders().await.not_due, 1);

        assert_eq!(poller.reset_daily().unwrap(), 1);
        assert_eq!(fx.reload(task.id).reminders_sent_today, 0);

        assert_eq!(poller.check_reminders().await.sent, 1);
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_cycle() {
        let fx = Fixture::new(at(9, 0), &utc_defaults());
        fx.add_task(5, tomorrow(), Frequency::Daily);
        fx.add_task(5, tomorrow(), Frequency::Daily);

        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();
        let sender = Arc::new(RecordingSender::default());
        let poller = fx.poller(sender.clone()).with_shutdown(rx);

        let report = poller.check_reminders().await;
        assert!(report.interrupted);
        assert!(sender.sent().is_empty());
    }
}
