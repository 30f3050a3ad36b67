use std::fmt;

/// Classified result of a single GET attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Success { status_code: u16, status_text: String },
    ConnectionRefused,
    Timeout,
    HttpError { status_code: u16, status_text: String },
    OtherError { message: String },
}

impl ProbeOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ProbeOutcome::Success { .. })
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            ProbeOutcome::Success { status_code, .. } | ProbeOutcome::HttpError { status_code, .. } => {
                Some(*status_code)
            }
            _ => None,
        }
    }

    /// Short machine-friendly label, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            ProbeOutcome::Success { .. } => "success",
            ProbeOutcome::ConnectionRefused => "connection_refused",
            ProbeOutcome::Timeout => "timeout",
            ProbeOutcome::HttpError { .. } => "http_error",
            ProbeOutcome::OtherError { .. } => "other_error",
        }
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeOutcome::Success { status_code, status_text }
            | ProbeOutcome::HttpError { status_code, status_text } => {
                write!(f, "{status_code} - {status_text}")
            }
            ProbeOutcome::ConnectionRefused => write!(f, "connection refused"),
            ProbeOutcome::Timeout => write!(f, "timed out"),
            ProbeOutcome::OtherError { message } => write!(f, "{message}"),
        }
    }
}

/// Result of the diagnostic sub-check. Never counted in the stats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthCheckOutcome {
    /// The body was a JSON array of this many items.
    Items(usize),
    /// The endpoint answered, but not with a JSON array.
    NotASequence,
    /// Request or body read failed; swallowed by contract.
    Failed(String),
}

/// Result of the scheme-swapped retry after a failed primary attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackReport {
    pub alternate_url: String,
    pub outcome: ProbeOutcome,
    /// The alternate URL was new and has been added to the registry.
    pub appended: bool,
}

/// Everything one probe produced. Only `outcome` feeds the stats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub url: String,
    pub outcome: ProbeOutcome,
    pub health: Option<HealthCheckOutcome>,
    pub fallback: Option<FallbackReport>,
}
