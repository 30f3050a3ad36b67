use std::error::Error;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use thiserror::Error;

/// A response that made it back from the target, whatever its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status_code: u16,
    pub status_text: String,
    pub body: String,
}

/// Transport-level failure of a GET, before any status was received.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("connection refused")]
    ConnectionRefused,

    #[error("request timed out")]
    Timeout,

    #[error("transport error")]
    Transport(#[source] Box<dyn Error + Send + Sync>),
}

/// The network seam of the probe executor.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// GET `url`, giving up after `timeout` (connect, headers and body included).
    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpReply, FetchError>;
}

/// Production transport backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    pub fn new(user_agent: &str) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/html"));

        let client = Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Fetch for ReqwestFetcher {
    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpReply, FetchError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        tracing::debug!(url, status = status.as_u16(), version = ?response.version(), "Response received");

        let body = response.text().await.map_err(classify)?;

        Ok(HttpReply {
            status_code: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            body,
        })
    }
}

fn classify(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else if is_connection_refused(&err) {
        FetchError::ConnectionRefused
    } else {
        FetchError::Transport(Box::new(err))
    }
}

fn is_connection_refused(err: &(dyn Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::ConnectionRefused {
                return true;
            }
        }
        current = e.source();
    }
    false
}
