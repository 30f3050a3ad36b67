//! Structured events produced by the probing core.
//!
//! The core never formats output itself: it hands `KeepAliveEvent`s to an
//! `EventSink`. `TracingSink` renders them as `tracing` events.

pub mod tracing_sink;

pub use tracing_sink::TracingSink;

use chrono::{DateTime, Local};

use crate::http_probe::result::{FallbackReport, HealthCheckOutcome, ProbeOutcome};
use crate::stats::StatsReport;

#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    /// `url` failed this many primary attempts in a row.
    ConsecutiveFailures { url: String, count: u32 },
    /// Cumulative success rate fell under the configured threshold.
    LowSuccessRate { rate: f64, threshold: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum KeepAliveEvent {
    RoundStarted {
        at: DateTime<Local>,
        targets: usize,
    },
    /// A trigger fired while another round was running and overlap is disabled.
    RoundSkipped,
    ProbeCompleted {
        url: String,
        outcome: ProbeOutcome,
    },
    HealthChecked {
        url: String,
        outcome: HealthCheckOutcome,
    },
    FallbackAttempted {
        url: String,
        report: FallbackReport,
    },
    RoundCompleted {
        successful: u64,
        total: u64,
    },
    StatsReported(StatsReport),
    Alert(Alert),
    /// A round died unexpectedly; the scheduler is about to stop.
    Fatal {
        message: String,
    },
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: KeepAliveEvent);
}
