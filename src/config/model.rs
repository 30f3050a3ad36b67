use serde::Deserialize;

/// Top level configuration of the keep-alive service.
/// Every field has a default, so an empty (or missing) file yields a working setup.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KeepAliveConfig {
    /// The main URL of the monitored application.
    pub primary_url: String,

    /// Additional URLs probed after the primary one, in order.
    pub backup_urls: Vec<String>,

    /// Period of the fixed-interval trigger, in milliseconds.
    pub check_interval_ms: u64,

    /// Step of the wall-clock aligned trigger (`*/N * * * *`), in minutes.
    pub cron_step_minutes: u32,

    /// Timeout of the primary attempt against a target.
    pub request_timeout_ms: u64,

    /// Timeout of the scheme-swapped retry after a failed primary attempt.
    pub fallback_timeout_ms: u64,

    /// Pause between two probes of the same round.
    pub probe_delay_ms: u64,

    /// How often the cumulative statistics are reported.
    pub stats_interval_minutes: u64,

    pub user_agent: String,

    pub health_check: HealthCheckConfig,

    /// What to do when a trigger fires while a round is still running.
    pub overlap: OverlapPolicy,

    pub logging: LoggingConfig,

    pub notifications: NotificationConfig,
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            primary_url: "https://fanfik.onrender.com".to_string(),
            backup_urls: vec![
                "https://fanfik-platform.onrender.com".to_string(),
                "https://fanfik-app.onrender.com".to_string(),
            ],
            check_interval_ms: 4 * 60 * 1000 + 50 * 1000,
            cron_step_minutes: 5,
            request_timeout_ms: 30_000,
            fallback_timeout_ms: 15_000,
            probe_delay_ms: 1_000,
            stats_interval_minutes: 30,
            user_agent: "FanFik-Keep-Alive/1.0".to_string(),
            health_check: HealthCheckConfig::default(),
            overlap: OverlapPolicy::default(),
            logging: LoggingConfig::default(),
            notifications: NotificationConfig::default(),
        }
    }
}

/// Secondary health sub-check, run after a successful probe of the monitored application.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    pub enabled: bool,

    /// Only hosts containing this marker get the sub-check.
    pub host_marker: String,

    /// Path appended to the target URL.
    pub path: String,

    pub timeout_ms: u64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host_marker: "fanfik".to_string(),
            path: "/api/fics".to_string(),
            timeout_ms: 15_000,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlapPolicy {
    /// Every trigger starts its own round, rounds may run concurrently.
    #[default]
    Allow,
    /// A trigger firing while a round is in flight is dropped.
    Skip,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    pub level: String,
    pub log_to_file: bool,
    pub log_file_path: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_to_file: false,
            log_file_path: "./keep-alive.log".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub enabled: bool,

    /// Alert when the cumulative success rate drops below this percentage.
    pub min_success_rate: f64,

    /// Alert when a single URL fails this many rounds in a row. Must be non-zero.
    pub consecutive_errors: u32,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_success_rate: 80.0,
            consecutive_errors: 3,
        }
    }
}

#[cfg(test)]
pub mod test {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config: KeepAliveConfig = serde_yaml::from_str("{}").expect("Invalid YAML");
        assert_eq!(config.primary_url, "https://fanfik.onrender.com");
        assert_eq!(config.backup_urls.len(), 2);
        assert_eq!(config.check_interval_ms, 290_000);
        assert_eq!(config.cron_step_minutes, 5);
        assert_eq!(config.request_timeout_ms, 30_000);
        assert_eq!(config.fallback_timeout_ms, 15_000);
        assert_eq!(config.stats_interval_minutes, 30);
        assert_eq!(config.overlap, OverlapPolicy::Allow);
        assert!(config.health_check.enabled);
        assert_eq!(config.health_check.path, "/api/fics");
        assert!(!config.notifications.enabled);
    }

    #[test]
    fn test_partial_document_deserialization() {
        let yaml = r#"
                    primary_url: https://myapp.onrender.com
                    backup_urls:
                        - https://myapp-eu.onrender.com
                    check_interval_ms: 60000
                    overlap: skip
                    health_check:
                        host_marker: myapp
                    logging:
                        level: debug
                    notifications:
                        enabled: true
                        consecutive_errors: 5
                                    "#;

        let config: KeepAliveConfig = serde_yaml::from_str(yaml).expect("Invalid YAML");
        assert_eq!(config.primary_url, "https://myapp.onrender.com");
        assert_eq!(config.backup_urls, vec!["https://myapp-eu.onrender.com"]);
        assert_eq!(config.check_interval_ms, 60_000);
        assert_eq!(config.overlap, OverlapPolicy::Skip);
        // nested defaults survive partial sections
        assert_eq!(config.health_check.host_marker, "myapp");
        assert_eq!(config.health_check.path, "/api/fics");
        assert_eq!(config.health_check.timeout_ms, 15_000);
        assert_eq!(config.logging.level, "debug");
        assert!(!config.logging.log_to_file);
        assert!(config.notifications.enabled);
        assert_eq!(config.notifications.consecutive_errors, 5);
        assert_eq!(config.notifications.min_success_rate, 80.0);
        assert_eq!(config.request_timeout_ms, 30_000);
    }

    #[test]
    fn test_unknown_overlap_policy_is_rejected() {
        let result: Result<KeepAliveConfig, _> = serde_yaml::from_str("overlap: queue");
        assert!(result.is_err());
    }
}
