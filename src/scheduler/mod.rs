//! Drives rounds and stats reports from three independent triggers.
//!
//! - a wall-clock trigger (`*/N * * * *`, N = `cron_step_minutes`)
//! - a fixed-interval trigger (`check_interval`)
//! - a stats trigger (`stats_interval`)
//!
//! The two round triggers are not coordinated with each other: every firing spawns
//! its own round task, so rounds may overlap unless the coordinator was built with
//! `OverlapPolicy::Skip`.

pub mod cron;

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::{JoinError, JoinSet};
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::events::KeepAliveEvent;
use crate::round::RoundCoordinator;
use crate::stats::ReportReason;
use cron::CronTrigger;

#[derive(Debug, Clone)]
pub struct ScheduleSettings {
    pub check_interval: Duration,
    pub cron_step_minutes: u32,
    pub stats_interval: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Stopped,
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("scheduler cannot start from state {0:?}")]
    NotIdle(SchedulerState),

    #[error("round task failed: {0}")]
    RoundFailed(String),
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn describe(err: JoinError) -> String {
    if err.is_panic() {
        panic_message(err.into_panic().as_ref())
    } else {
        err.to_string()
    }
}

pub struct Scheduler {
    coordinator: Arc<RoundCoordinator>,
    settings: ScheduleSettings,
    state: SchedulerState,
    stop: broadcast::Receiver<()>,
}

impl Scheduler {
    /// `stop` is usually obtained from `Shutdown::subscribe`; any message on it, or the
    /// sender going away, stops the scheduler.
    pub fn new(
        coordinator: Arc<RoundCoordinator>,
        settings: ScheduleSettings,
        stop: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            coordinator,
            settings,
            state: SchedulerState::Idle,
            stop,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    fn spawn_round(&self, rounds: &mut JoinSet<()>) {
        let coordinator = Arc::clone(&self.coordinator);
        rounds.spawn(async move {
            if let Some(summary) = coordinator.run_round().await {
                tracing::debug!(
                    probed = summary.probed,
                    successful = summary.successful,
                    total = summary.total,
                    "Round task finished"
                );
            }
        });
    }

    /// Run until stopped. The first round starts immediately.
    ///
    /// On stop, pending triggers are dropped, rounds already in flight are left to
    /// finish on their own, and a final stats report is emitted before returning.
    /// A round that dies (panics) is fatal: a final report is emitted and the
    /// failure is returned.
    pub async fn run(&mut self) -> Result<(), SchedulerError> {
        if self.state != SchedulerState::Idle {
            return Err(SchedulerError::NotIdle(self.state));
        }
        self.state = SchedulerState::Running;

        tracing::info!(
            cron_step_minutes = self.settings.cron_step_minutes,
            check_interval = ?self.settings.check_interval,
            stats_interval = ?self.settings.stats_interval,
            "Scheduler starting"
        );

        let mut rounds = JoinSet::new();
        self.spawn_round(&mut rounds);

        let mut cron = CronTrigger::new(self.settings.cron_step_minutes);
        let start = Instant::now();
        let mut interval = time::interval_at(start + self.settings.check_interval, self.settings.check_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut stats = time::interval_at(start + self.settings.stats_interval, self.settings.stats_interval);
        stats.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let outcome = loop {
            tokio::select! {
                _ = self.stop.recv() => {
                    tracing::info!("Scheduler received stop signal");
                    break Ok(());
                }
                _ = time::sleep(cron.remaining()) => {
                    tracing::debug!(at = %cron.next_fire(), "Cron trigger fired");
                    cron.advance();
                    self.spawn_round(&mut rounds);
                }
                _ = interval.tick() => {
                    tracing::debug!("Interval trigger fired");
                    self.spawn_round(&mut rounds);
                }
                _ = stats.tick() => {
                    self.coordinator.report_stats(ReportReason::Periodic);
                }
                Some(joined) = rounds.join_next() => {
                    if let Err(e) = joined {
                        break Err(SchedulerError::RoundFailed(describe(e)));
                    }
                }
            }
        };

        // in-flight rounds keep running, bounded by their own request timeouts
        rounds.detach_all();
        self.state = SchedulerState::Stopped;

        match outcome {
            Ok(()) => {
                self.coordinator.report_stats(ReportReason::Shutdown);
                Ok(())
            }
            Err(e) => {
                self.coordinator.context().events.emit(KeepAliveEvent::Fatal {
                    message: e.to_string(),
                });
                self.coordinator.report_stats(ReportReason::Fatal);
                Err(e)
            }
        }
    }
}
