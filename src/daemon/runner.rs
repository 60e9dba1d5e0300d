//! Daemon - owns the two periodic triggers
//!
//! The reminder check runs every `check_interval`; the daily reset sleeps until
//! the next `reset_at` on the process's local clock. Both are tokio tasks that
//! watch one shutdown channel. A cycle that has started runs to completion
//! (the poller itself stops between tasks), so a send is never separated from
//! its count update by shutdown.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{Local, NaiveTime};
use log::{debug, error, info};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::poller::ReminderPoller;
use super::tick::{TickConfig, TickState};
use crate::scheduler::{Clock, until_next_local};
use crate::sender::ReminderSender;
use crate::store::{TaskRepository, UserRepository};

const FALLBACK_RESET_WAIT: Duration = Duration::from_secs(24 * 60 * 60);

pub struct Daemon<S> {
    poller: Arc<ReminderPoller<S>>,
    clock: Arc<dyn Clock>,
    config: TickConfig,
    state: Arc<Mutex<TickState>>,
    shutdown_tx: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl<S> Daemon<S>
where
    S: TaskRepository + UserRepository + 'static,
{
    pub fn new(store: Arc<S>, sender: Arc<dyn ReminderSender>, clock: Arc<dyn Clock>, config: TickConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let poller = ReminderPoller::new(store, sender, Arc::clone(&clock)).with_shutdown(shutdown_rx);
        Self {
            poller: Arc::new(poller),
            clock,
            config,
            state: Arc::new(Mutex::new(TickState::new())),
            shutdown_tx,
            handles: Vec::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        !self.handles.is_empty()
    }

    /// Spawn both triggers. Calling `start` on a running daemon is a no-op.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }
        info!(
            "Starting reminder daemon: check every {}s, daily reset at {}",
            self.config.check_interval.as_secs(),
            self.config.reset_at.format("%H:%M")
        );

        self.handles.push(tokio::spawn(run_checks(
            Arc::clone(&self.poller),
            self.config.check_interval,
            Arc::clone(&self.state),
            self.shutdown_tx.subscribe(),
        )));
        self.handles.push(tokio::spawn(run_resets(
            Arc::clone(&self.poller),
            Arc::clone(&self.clock),
            self.config.reset_at,
            Arc::clone(&self.state),
            self.shutdown_tx.subscribe(),
        )));
    }

    /// Signal shutdown and wait for both triggers to finish their current work.
    pub async fn stop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.request_shutdown();
        }
        // send_replace never fails, even with no receivers left
        self.shutdown_tx.send_replace(true);

        for handle in self.handles.drain(..) {
            if let Err(e) = handle.await {
                error!("Daemon task ended abnormally: {}", e);
            }
        }

        let stats = self.stats();
        info!(
            "Reminder daemon stopped after {} checks and {} resets ({} sent, {} failed)",
            stats.cycles, stats.resets, stats.total_sent, stats.total_failed
        );
    }

    /// Snapshot of the running totals
    pub fn stats(&self) -> TickState {
        match self.state.lock() {
            Ok(state) => state.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

async fn run_checks<S>(
    poller: Arc<ReminderPoller<S>>,
    interval: Duration,
    state: Arc<Mutex<TickState>>,
    mut shutdown: watch::Receiver<bool>,
) where
    S: TaskRepository + UserRepository + 'static,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => break,
        }
        if *shutdown.borrow() {
            break;
        }

        let report = poller.check_reminders().await;
        if let Ok(mut state) = state.lock() {
            state.record_cycle(&report);
        }
    }
    debug!("Reminder check loop stopped");
}

async fn run_resets<S>(
    poller: Arc<ReminderPoller<S>>,
    clock: Arc<dyn Clock>,
    reset_at: NaiveTime,
    state: Arc<Mutex<TickState>>,
    mut shutdown: watch::Receiver<bool>,
) where
    S: TaskRepository + UserRepository + 'static,
{
    loop {
        let local_now = clock.now().with_timezone(&Local);
        let wait = until_next_local(&local_now, reset_at)
            .to_std()
            .unwrap_or(FALLBACK_RESET_WAIT);
        debug!("Next daily reset in {}s", wait.as_secs());

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = shutdown.changed() => break,
        }
        if *shutdown.borrow() {
            break;
        }

        match poller.reset_daily() {
            Ok(_) => {
                if let Ok(mut state) = state.lock() {
                    state.record_reset();
                }
            }
            Err(e) => error!("Daily reset failed: {}", e),
        }
    }
    debug!("Daily reset loop stopped");
}
