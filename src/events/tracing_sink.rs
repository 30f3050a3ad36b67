use std::time::Duration;

use chrono::{DateTime, Local};

use super::{Alert, EventSink, KeepAliveEvent};
use crate::http_probe::result::{HealthCheckOutcome, ProbeOutcome};
use crate::stats::ReportReason;

/// Renders every event as one structured `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
}

fn format_last_check(last_check: Option<DateTime<Local>>) -> String {
    last_check
        .map(|at| at.format("%d.%m.%Y %H:%M:%S").to_string())
        .unwrap_or_else(|| "never".to_string())
}

impl EventSink for TracingSink {
    fn emit(&self, event: KeepAliveEvent) {
        match event {
            KeepAliveEvent::RoundStarted { at, targets } => {
                tracing::info!(at = %at.format("%H:%M:%S"), targets, "🔄 Checking targets");
            }
            KeepAliveEvent::RoundSkipped => {
                tracing::info!("Round still in progress, skipping this trigger");
            }
            KeepAliveEvent::ProbeCompleted { url, outcome } => match &outcome {
                ProbeOutcome::Success { status_code, status_text } => {
                    tracing::info!(%url, status = status_code, "✅ {url}: {status_code} - {status_text}");
                }
                ProbeOutcome::Timeout => {
                    tracing::warn!(%url, kind = outcome.kind(), "⏰ {url}: timed out");
                }
                _ => {
                    tracing::warn!(%url, kind = outcome.kind(), status = ?outcome.status_code(), "❌ {url}: {outcome}");
                }
            },
            KeepAliveEvent::HealthChecked { url, outcome } => match outcome {
                HealthCheckOutcome::Items(count) => {
                    tracing::info!(%url, items = count, "   📚 Items available: {count}");
                }
                HealthCheckOutcome::NotASequence => {
                    tracing::debug!(%url, "Health endpoint did not return a list");
                }
                HealthCheckOutcome::Failed(reason) => {
                    tracing::debug!(%url, %reason, "Health check failed, ignoring");
                }
            },
            KeepAliveEvent::FallbackAttempted { url, report } => {
                if report.outcome.is_success() {
                    tracing::info!(
                        %url,
                        alternate = %report.alternate_url,
                        status = ?report.outcome.status_code(),
                        appended = report.appended,
                        "   🔄 Alternate scheme works: {}",
                        report.alternate_url
                    );
                } else {
                    tracing::warn!(
                        %url,
                        alternate = %report.alternate_url,
                        kind = report.outcome.kind(),
                        "   Alternate scheme failed as well"
                    );
                }
            }
            KeepAliveEvent::RoundCompleted { successful, total } => {
                tracing::info!(successful, total, "📊 Round done. Successful: {successful}/{total}");
            }
            KeepAliveEvent::StatsReported(report) => {
                let snapshot = report.snapshot;
                let uptime = format_uptime(report.uptime);
                let last_check = format_last_check(snapshot.last_check);
                match report.reason {
                    ReportReason::Fatal => tracing::error!(
                        total = snapshot.total_requests,
                        successful = snapshot.successful_requests,
                        failed = snapshot.failed_requests,
                        success_rate = report.success_rate,
                        uptime = %uptime,
                        last_check = %last_check,
                        "📈 Final statistics before abort"
                    ),
                    reason => tracing::info!(
                        total = snapshot.total_requests,
                        successful = snapshot.successful_requests,
                        failed = snapshot.failed_requests,
                        success_rate = report.success_rate,
                        uptime = %uptime,
                        last_check = %last_check,
                        reason = ?reason,
                        "📈 Statistics"
                    ),
                }
            }
            KeepAliveEvent::Alert(Alert::ConsecutiveFailures { url, count }) => {
                tracing::warn!(%url, count, "🚨 {url} failed {count} times in a row");
            }
            KeepAliveEvent::Alert(Alert::LowSuccessRate { rate, threshold }) => {
                tracing::warn!(rate, threshold, "🚨 Success rate {rate}% is below {threshold}%");
            }
            KeepAliveEvent::Fatal { message } => {
                tracing::error!(%message, "💥 Unrecoverable fault");
            }
        }
    }
}
