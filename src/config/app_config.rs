use std::env;
use std::path::Path;
use std::time::Duration;

use thiserror::Error;

use super::model::KeepAliveConfig;
use crate::http_probe::probe::{HealthCheckSettings, ProbeSettings};
use crate::round::{AlertSettings, RoundSettings};
use crate::scheduler::ScheduleSettings;
use crate::targets::TargetRegistry;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Where the loaded configuration came from, reported once logging is up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(String),
    /// The file was missing and the built-in defaults were used.
    Defaults(String),
}

/// Load the application configuration from a YAML file and environment variables.
/// The file is located by the `CONFIG_FILE` environment variable (default `keepwarm.yml`),
/// and `PRIMARY_URL` overrides the configured primary URL.
/// A missing file is not an error: the built-in defaults are used instead.
pub fn load_config() -> Result<(KeepAliveConfig, ConfigSource), ConfigError> {
    let config_file_location =
        env::var("CONFIG_FILE").unwrap_or_else(|_| "keepwarm.yml".to_string());
    let primary_override = env::var("PRIMARY_URL").ok().filter(|url| !url.trim().is_empty());

    load_config_from(Path::new(&config_file_location), primary_override)
}

pub fn load_config_from(
    path: &Path,
    primary_override: Option<String>,
) -> Result<(KeepAliveConfig, ConfigSource), ConfigError> {
    let location = path.display().to_string();

    let (mut config, source) = match std::fs::read_to_string(path) {
        Ok(config_str) => {
            let config = serde_yaml::from_str::<KeepAliveConfig>(&config_str).map_err(|source| {
                ConfigError::Parse {
                    path: location.clone(),
                    source,
                }
            })?;
            (config, ConfigSource::File(location))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            (KeepAliveConfig::default(), ConfigSource::Defaults(location))
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: location,
                source,
            });
        }
    };

    if let Some(url) = primary_override {
        config.primary_url = url;
    }

    config.validate()?;
    Ok((config, source))
}

impl KeepAliveConfig {
    /// Reject settings that would make the scheduler spin or never fire.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let non_zero = [
            ("check_interval_ms", self.check_interval_ms),
            ("request_timeout_ms", self.request_timeout_ms),
            ("fallback_timeout_ms", self.fallback_timeout_ms),
            ("stats_interval_minutes", self.stats_interval_minutes),
            ("health_check.timeout_ms", self.health_check.timeout_ms),
        ];
        for (field, value) in non_zero {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be greater than zero".to_string(),
                });
            }
        }

        if self.stats_interval_minutes.checked_mul(60).is_none() {
            return Err(ConfigError::Invalid {
                field: "stats_interval_minutes",
                reason: format!("{} minutes does not fit in seconds", self.stats_interval_minutes),
            });
        }

        if self.notifications.consecutive_errors == 0 {
            return Err(ConfigError::Invalid {
                field: "notifications.consecutive_errors",
                reason: "must be greater than zero".to_string(),
            });
        }

        if self.cron_step_minutes == 0 || 60 % self.cron_step_minutes != 0 {
            return Err(ConfigError::Invalid {
                field: "cron_step_minutes",
                reason: format!("{} does not divide an hour", self.cron_step_minutes),
            });
        }

        if self.build_registry().is_empty() {
            return Err(ConfigError::Invalid {
                field: "primary_url",
                reason: "no http(s) target left after filtering".to_string(),
            });
        }

        Ok(())
    }

    pub fn build_registry(&self) -> TargetRegistry {
        TargetRegistry::new(Some(&self.primary_url), &self.backup_urls)
    }

    pub fn probe_settings(&self) -> ProbeSettings {
        let health_check = self.health_check.enabled.then(|| HealthCheckSettings {
            host_marker: self.health_check.host_marker.clone(),
            path: self.health_check.path.clone(),
            timeout: Duration::from_millis(self.health_check.timeout_ms),
        });

        ProbeSettings {
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            fallback_timeout: Duration::from_millis(self.fallback_timeout_ms),
            health_check,
        }
    }

    pub fn round_settings(&self) -> RoundSettings {
        let alerts = self.notifications.enabled.then_some(AlertSettings {
            min_success_rate: self.notifications.min_success_rate,
            consecutive_errors: self.notifications.consecutive_errors,
        });

        RoundSettings {
            probe_delay: Duration::from_millis(self.probe_delay_ms),
            overlap: self.overlap,
            alerts,
        }
    }

    pub fn schedule_settings(&self) -> ScheduleSettings {
        ScheduleSettings {
            check_interval: Duration::from_millis(self.check_interval_ms),
            cron_step_minutes: self.cron_step_minutes,
            stats_interval: Duration::from_secs(self.stats_interval_minutes.saturating_mul(60)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::OverlapPolicy;

    fn temp_config(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("keepwarm-{}-{name}.yml", std::process::id()));
        std::fs::write(&path, contents).expect("Failed to write temp config");
        path
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let path = std::env::temp_dir().join("keepwarm-definitely-missing.yml");
        let (config, source) = load_config_from(&path, None).expect("defaults should validate");
        assert_eq!(config.primary_url, "https://fanfik.onrender.com");
        assert!(matches!(source, ConfigSource::Defaults(_)));
    }

    #[test]
    fn test_primary_override_wins() {
        let path = temp_config("override", "primary_url: https://from-file.test\n");
        let (config, source) = load_config_from(&path, Some("https://from-env.test".to_string()))
            .expect("config should load");
        assert_eq!(config.primary_url, "https://from-env.test");
        assert_eq!(source, ConfigSource::File(path.display().to_string()));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_invalid_yaml_is_reported() {
        let path = temp_config("broken", "backup_urls: [unterminated\n");
        let err = load_config_from(&path, None).expect_err("broken YAML must fail");
        assert!(matches!(err, ConfigError::Parse { .. }));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let config = KeepAliveConfig {
            check_interval_ms: 0,
            ..KeepAliveConfig::default()
        };
        let err = config.validate().expect_err("zero interval must fail");
        assert!(matches!(err, ConfigError::Invalid { field: "check_interval_ms", .. }));
    }

    #[test]
    fn test_oversized_stats_interval_is_rejected() {
        let config = KeepAliveConfig {
            stats_interval_minutes: u64::MAX / 10,
            ..KeepAliveConfig::default()
        };
        let err = config.validate().expect_err("overflowing interval must fail");
        assert!(matches!(err, ConfigError::Invalid { field: "stats_interval_minutes", .. }));
        assert_eq!(config.schedule_settings().stats_interval, Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_zero_consecutive_errors_is_rejected() {
        let mut config = KeepAliveConfig::default();
        config.notifications.consecutive_errors = 0;
        let err = config.validate().expect_err("zero streak threshold must fail");
        assert!(matches!(
            err,
            ConfigError::Invalid { field: "notifications.consecutive_errors", .. }
        ));
    }

    #[test]
    fn test_cron_step_must_divide_an_hour() {
        let config = KeepAliveConfig {
            cron_step_minutes: 7,
            ..KeepAliveConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_no_valid_target_is_rejected() {
        let config = KeepAliveConfig {
            primary_url: "ftp://nope.test".to_string(),
            backup_urls: vec![String::new()],
            ..KeepAliveConfig::default()
        };
        let err = config.validate().expect_err("empty registry must fail");
        assert!(matches!(err, ConfigError::Invalid { field: "primary_url", .. }));
    }

    #[test]
    fn test_settings_conversion() {
        let mut config = KeepAliveConfig::default();
        config.health_check.enabled = false;
        config.notifications.enabled = true;
        config.overlap = OverlapPolicy::Skip;

        let probe = config.probe_settings();
        assert_eq!(probe.request_timeout, Duration::from_secs(30));
        assert_eq!(probe.fallback_timeout, Duration::from_secs(15));
        assert!(probe.health_check.is_none());

        let round = config.round_settings();
        assert_eq!(round.probe_delay, Duration::from_secs(1));
        assert_eq!(round.overlap, OverlapPolicy::Skip);
        assert_eq!(round.alerts.map(|a| a.consecutive_errors), Some(3));

        let schedule = config.schedule_settings();
        assert_eq!(schedule.check_interval, Duration::from_secs(290));
        assert_eq!(schedule.stats_interval, Duration::from_secs(30 * 60));
        assert_eq!(schedule.cron_step_minutes, 5);
    }
}
