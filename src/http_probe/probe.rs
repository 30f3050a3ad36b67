use std::sync::Arc;
use std::time::Duration;

use url::Url;

use super::fetch::{Fetch, FetchError, HttpReply};
use super::report as error_chain;
use super::result::{FallbackReport, HealthCheckOutcome, ProbeOutcome, ProbeReport};
use crate::targets::TargetRegistry;

#[derive(Debug, Clone)]
pub struct HealthCheckSettings {
    /// Substring of the host that identifies the monitored application. Empty matches every host.
    pub host_marker: String,
    pub path: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ProbeSettings {
    pub request_timeout: Duration,
    pub fallback_timeout: Duration,
    /// `None` disables the secondary sub-check entirely.
    pub health_check: Option<HealthCheckSettings>,
}

/// Swap `https://` and `http://`. Other schemes have no alternate.
pub fn alternate_url(url: &str) -> Option<String> {
    if let Some(rest) = url.strip_prefix("https://") {
        Some(format!("http://{rest}"))
    } else {
        url.strip_prefix("http://").map(|rest| format!("https://{rest}"))
    }
}

fn host_matches(url: &str, marker: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(|host| host.contains(marker)))
        .unwrap_or(false)
}

fn classify_reply(reply: HttpReply) -> ProbeOutcome {
    let HttpReply {
        status_code,
        status_text,
        ..
    } = reply;
    if status_code >= 400 {
        ProbeOutcome::HttpError {
            status_code,
            status_text,
        }
    } else {
        ProbeOutcome::Success {
            status_code,
            status_text,
        }
    }
}

/// Runs the per-URL protocol: primary attempt, then either the health sub-check
/// (on success) or a single scheme-swapped retry (on failure).
pub struct Prober {
    fetch: Arc<dyn Fetch>,
    settings: ProbeSettings,
}

impl Prober {
    pub fn new(fetch: Arc<dyn Fetch>, settings: ProbeSettings) -> Self {
        Self { fetch, settings }
    }

    /// Probe `url`. A working fallback URL is appended to `registry`.
    /// The returned `outcome` is always the primary attempt's.
    pub async fn probe(&self, url: &str, registry: &TargetRegistry) -> ProbeReport {
        let outcome = self.attempt(url, self.settings.request_timeout).await;

        let mut report = ProbeReport {
            url: url.to_string(),
            outcome,
            health: None,
            fallback: None,
        };

        if report.outcome.is_success() {
            if let Some(health) = &self.settings.health_check {
                if host_matches(url, &health.host_marker) {
                    report.health = Some(self.check_health(url, health).await);
                }
            }
        } else {
            report.fallback = self.try_fallback(url, registry).await;
        }

        report
    }

    async fn attempt(&self, url: &str, timeout: Duration) -> ProbeOutcome {
        match self.fetch.get(url, timeout).await {
            Ok(reply) => classify_reply(reply),
            Err(FetchError::ConnectionRefused) => ProbeOutcome::ConnectionRefused,
            Err(FetchError::Timeout) => ProbeOutcome::Timeout,
            Err(FetchError::Transport(source)) => ProbeOutcome::OtherError {
                message: error_chain(source.as_ref()),
            },
        }
    }

    async fn check_health(&self, url: &str, health: &HealthCheckSettings) -> HealthCheckOutcome {
        let health_url = format!("{}{}", url.trim_end_matches('/'), health.path);

        let reply = match self.fetch.get(&health_url, health.timeout).await {
            Ok(reply) => reply,
            Err(e) => return HealthCheckOutcome::Failed(e.to_string()),
        };

        if reply.status_code >= 400 {
            return HealthCheckOutcome::Failed(format!("{} - {}", reply.status_code, reply.status_text));
        }

        match serde_json::from_str::<serde_json::Value>(&reply.body) {
            Ok(serde_json::Value::Array(items)) => HealthCheckOutcome::Items(items.len()),
            _ => HealthCheckOutcome::NotASequence,
        }
    }

    async fn try_fallback(&self, url: &str, registry: &TargetRegistry) -> Option<FallbackReport> {
        let alternate_url = alternate_url(url)?;
        let outcome = self.attempt(&alternate_url, self.settings.fallback_timeout).await;
        let appended = outcome.is_success() && registry.append(&alternate_url);

        Some(FallbackReport {
            alternate_url,
            outcome,
            appended,
        })
    }
}
