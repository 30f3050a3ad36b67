use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Local;

use crate::config::OverlapPolicy;
use crate::events::{Alert, EventSink, KeepAliveEvent};
use crate::http_probe::probe::Prober;
use crate::http_probe::result::ProbeReport;
use crate::stats::{ReportReason, StatsAggregator, StatsReport, StatsSnapshot};
use crate::targets::TargetRegistry;

/// State shared by every round for the whole process lifetime.
#[derive(Clone)]
pub struct KeepAliveContext {
    pub registry: Arc<TargetRegistry>,
    pub stats: Arc<StatsAggregator>,
    pub events: Arc<dyn EventSink>,
}

#[derive(Debug, Clone, Copy)]
pub struct AlertSettings {
    pub min_success_rate: f64,
    pub consecutive_errors: u32,
}

#[derive(Debug, Clone)]
pub struct RoundSettings {
    /// Pause after each probe.
    pub probe_delay: Duration,
    pub overlap: OverlapPolicy,
    /// `None` disables alerting.
    pub alerts: Option<AlertSettings>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundSummary {
    /// Number of URLs probed by this round.
    pub probed: usize,
    /// Cumulative counters read when the round finished.
    pub successful: u64,
    pub total: u64,
}

/// Releases the in-progress flag when the round ends, even by panic.
struct RoundGuard<'a>(&'a AtomicBool);

impl<'a> RoundGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RoundGuard(flag))
    }
}

impl Drop for RoundGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Probes every registered URL in order and folds the outcomes into the stats.
///
/// With `OverlapPolicy::Allow` several rounds may run at once on the same context;
/// the registry and the counters are safe for that, but the per-round summaries
/// then include requests made by the other rounds.
pub struct RoundCoordinator {
    context: KeepAliveContext,
    prober: Prober,
    settings: RoundSettings,
    in_progress: AtomicBool,
    failure_streaks: Mutex<HashMap<String, u32>>,
}

impl RoundCoordinator {
    pub fn new(context: KeepAliveContext, prober: Prober, settings: RoundSettings) -> Self {
        Self {
            context,
            prober,
            settings,
            in_progress: AtomicBool::new(false),
            failure_streaks: Mutex::new(HashMap::new()),
        }
    }

    pub fn context(&self) -> &KeepAliveContext {
        &self.context
    }

    /// Run one full round. Returns `None` when the round was skipped because another
    /// one is still running and overlap is disabled.
    ///
    /// URLs appended by a fallback during this round are only probed from the next one.
    pub async fn run_round(&self) -> Option<RoundSummary> {
        let _guard = match self.settings.overlap {
            OverlapPolicy::Allow => None,
            OverlapPolicy::Skip => match RoundGuard::acquire(&self.in_progress) {
                Some(guard) => Some(guard),
                None => {
                    self.emit(KeepAliveEvent::RoundSkipped);
                    return None;
                }
            },
        };

        let KeepAliveContext {
            registry, stats, ..
        } = &self.context;

        let urls = registry.snapshot();
        self.emit(KeepAliveEvent::RoundStarted {
            at: Local::now(),
            targets: urls.len(),
        });

        for url in &urls {
            let report = self.prober.probe(url, registry).await;
            stats.record(&report.outcome);
            self.track_failures(&report);
            self.emit_report(report);

            tokio::time::sleep(self.settings.probe_delay).await;
        }

        stats.mark_checked(Local::now());
        let snapshot = stats.snapshot();
        self.emit(KeepAliveEvent::RoundCompleted {
            successful: snapshot.successful_requests,
            total: snapshot.total_requests,
        });
        self.check_success_rate(&snapshot);

        Some(RoundSummary {
            probed: urls.len(),
            successful: snapshot.successful_requests,
            total: snapshot.total_requests,
        })
    }

    /// Emit the current cumulative statistics and return them.
    pub fn report_stats(&self, reason: ReportReason) -> StatsReport {
        let report = self.context.stats.report(reason);
        self.emit(KeepAliveEvent::StatsReported(report));
        report
    }

    fn emit(&self, event: KeepAliveEvent) {
        self.context.events.emit(event);
    }

    fn emit_report(&self, report: ProbeReport) {
        let ProbeReport {
            url,
            outcome,
            health,
            fallback,
        } = report;

        self.emit(KeepAliveEvent::ProbeCompleted {
            url: url.clone(),
            outcome,
        });
        if let Some(outcome) = health {
            self.emit(KeepAliveEvent::HealthChecked {
                url: url.clone(),
                outcome,
            });
        }
        if let Some(report) = fallback {
            self.emit(KeepAliveEvent::FallbackAttempted { url, report });
        }
    }

    fn track_failures(&self, report: &ProbeReport) {
        let Some(alerts) = self.settings.alerts else {
            return;
        };

        let count = {
            let mut streaks = self
                .failure_streaks
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if report.outcome.is_success() {
                streaks.remove(&report.url);
                return;
            }
            let streak = streaks.entry(report.url.clone()).or_insert(0);
            *streak += 1;
            *streak
        };

        // once per streak
        if count == alerts.consecutive_errors {
            self.emit(KeepAliveEvent::Alert(Alert::ConsecutiveFailures {
                url: report.url.clone(),
                count,
            }));
        }
    }

    fn check_success_rate(&self, snapshot: &StatsSnapshot) {
        let Some(alerts) = self.settings.alerts else {
            return;
        };
        let rate = snapshot.success_rate();
        if snapshot.total_requests > 0 && rate < alerts.min_success_rate {
            self.emit(KeepAliveEvent::Alert(Alert::LowSuccessRate {
                rate,
                threshold: alerts.min_success_rate,
            }));
        }
    }
}
