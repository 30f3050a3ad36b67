pub mod fetch;
pub mod probe;
pub mod result;

pub mod prelude {
    pub use super::fetch::{Fetch, FetchError, HttpReply, ReqwestFetcher};
    pub use super::probe::{ProbeSettings, Prober, alternate_url};
    pub use super::result::{FallbackReport, HealthCheckOutcome, ProbeOutcome, ProbeReport};
}

use std::fmt::Write;

/// Flatten an error and its sources into a single log-friendly line.
pub(crate) fn report(mut err: &(dyn std::error::Error + 'static)) -> String {
    let mut s = format!("{}", err);
    while let Some(src) = err.source() {
        let _ = write!(s, ": {}", src);
        err = src;
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::fetch::FetchError;

    #[test]
    fn test_report_includes_every_source() {
        let inner = std::io::Error::new(std::io::ErrorKind::Other, "socket closed");
        let outer = FetchError::Transport(Box::new(inner));
        let message = report(&outer);
        assert!(message.starts_with("transport error"));
        assert!(message.ends_with("socket closed"));
    }
}
