use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};

use crate::http_probe::result::ProbeOutcome;

/// Point-in-time read of the cumulative counters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsSnapshot {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub last_check: Option<DateTime<Local>>,
}

impl StatsSnapshot {
    /// Percentage of successful requests, rounded to two decimals. 0 when nothing was sent yet.
    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        let rate = self.successful_requests as f64 / self.total_requests as f64 * 100.0;
        (rate * 100.0).round() / 100.0
    }
}

/// Why a stats report was emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportReason {
    Periodic,
    Shutdown,
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsReport {
    pub snapshot: StatsSnapshot,
    pub success_rate: f64,
    pub uptime: Duration,
    pub reason: ReportReason,
}

/// Process-lifetime request counters, shared by every round.
/// Counters only grow; nothing here is ever reset.
#[derive(Debug)]
pub struct StatsAggregator {
    total: AtomicU64,
    successful: AtomicU64,
    failed: AtomicU64,
    last_check: Mutex<Option<DateTime<Local>>>,
    started: Instant,
}

impl Default for StatsAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self {
            total: AtomicU64::new(0),
            successful: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            last_check: Mutex::new(None),
            started: Instant::now(),
        }
    }

    /// Called once per probe, before the outcome is known.
    pub fn record_attempt(&self) {
        self.total.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_success(&self) {
        self.successful.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    /// Count one primary probe outcome.
    pub fn record(&self, outcome: &ProbeOutcome) {
        self.record_attempt();
        if outcome.is_success() {
            self.record_success();
        } else {
            self.record_failure();
        }
    }

    pub fn mark_checked(&self, at: DateTime<Local>) {
        *self.last_check.lock().unwrap_or_else(PoisonError::into_inner) = Some(at);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_requests: self.total.load(Ordering::SeqCst),
            successful_requests: self.successful.load(Ordering::SeqCst),
            failed_requests: self.failed.load(Ordering::SeqCst),
            last_check: *self.last_check.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn report(&self, reason: ReportReason) -> StatsReport {
        let snapshot = self.snapshot();
        StatsReport {
            snapshot,
            success_rate: snapshot.success_rate(),
            uptime: self.uptime(),
            reason,
        }
    }
}
