//! Doubles and fixtures shared by the unit tests.

use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use crate::events::{EventSink, KeepAliveEvent};
use crate::http_probe::fetch::{Fetch, FetchError, HttpReply};

#[derive(Debug, Clone)]
pub enum Scripted {
    Reply(u16, &'static str),
    Refused,
    Timeout,
    Broken(&'static str),
}

/// `Fetch` answering from a fixed table. Unknown URLs are refused.
#[derive(Default)]
pub struct ScriptedFetcher {
    routes: HashMap<String, Scripted>,
    calls: Mutex<Vec<(String, Duration)>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, url: &str, scripted: Scripted) -> Self {
        self.routes.insert(url.to_string(), scripted);
        self
    }

    pub fn calls(&self) -> Vec<(String, Duration)> {
        self.calls.lock().expect("calls lock poisoned").clone()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls().iter().filter(|(called, _)| called == url).count()
    }
}

#[async_trait]
impl Fetch for ScriptedFetcher {
    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpReply, FetchError> {
        self.calls
            .lock()
            .expect("calls lock poisoned")
            .push((url.to_string(), timeout));

        match self.routes.get(url).cloned().unwrap_or(Scripted::Refused) {
            Scripted::Reply(status_code, body) => Ok(HttpReply {
                status_code,
                status_text: reqwest::StatusCode::from_u16(status_code)
                    .ok()
                    .and_then(|status| status.canonical_reason())
                    .unwrap_or_default()
                    .to_string(),
                body: body.to_string(),
            }),
            Scripted::Refused => Err(FetchError::ConnectionRefused),
            Scripted::Timeout => Err(FetchError::Timeout),
            Scripted::Broken(message) => Err(FetchError::Transport(message.into())),
        }
    }
}

/// Sink keeping every event in memory.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<KeepAliveEvent>>,
    panic_on_round_start: bool,
}

impl RecordingSink {
    /// A sink that blows up the round it is called from, to simulate an internal fault.
    pub fn panicking_on_round_start() -> Self {
        Self {
            panic_on_round_start: true,
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<KeepAliveEvent> {
        self.events.lock().expect("events lock poisoned").clone()
    }

    pub fn count(&self, predicate: impl Fn(&KeepAliveEvent) -> bool) -> usize {
        self.events().iter().filter(|e| predicate(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: KeepAliveEvent) {
        if self.panic_on_round_start && matches!(event, KeepAliveEvent::RoundStarted { .. }) {
            panic!("sink exploded on round start");
        }
        self.events.lock().expect("events lock poisoned").push(event);
    }
}

/// Poll `sink` until an event matches, for up to two seconds.
pub async fn wait_for(sink: &RecordingSink, predicate: impl Fn(&KeepAliveEvent) -> bool) -> bool {
    for _ in 0..200 {
        if sink.count(&predicate) > 0 {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

async fn route(req: Request<Incoming>) -> Result<Response<String>, Infallible> {
    let path = req.uri().path().to_string();
    let (user_agent, accept) = {
        let header = |name: &str| {
            req.headers()
                .get(name)
                .and_then(|value| value.to_str().ok())
                .unwrap_or_default()
                .to_string()
        };
        (header("user-agent"), header("accept"))
    };

    let (status, body): (u16, String) = match path.as_str() {
        "/" => (200, "<html><body>ok</body></html>".to_string()),
        "/api/fics" => (200, r#"[{"id":1},{"id":2}]"#.to_string()),
        "/broken" => (500, "boom".to_string()),
        "/slow" => {
            tokio::time::sleep(Duration::from_secs(2)).await;
            (200, "late".to_string())
        }
        "/echo-headers" => (
            200,
            format!("user-agent={user_agent}\naccept={accept}"),
        ),
        _ => (404, "not found".to_string()),
    };

    Ok(Response::builder()
        .status(status)
        .body(body)
        .expect("valid test response"))
}

/// Plain-HTTP server on an ephemeral local port.
pub async fn spawn_test_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test server");
    let addr = listener.local_addr().expect("Test server has no address");

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let _ = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service_fn(route))
                    .await;
            });
        }
    });

    addr
}

/// A local address nothing listens on.
pub async fn refused_address() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind probe port");
    let addr = listener.local_addr().expect("Listener has no address");
    drop(listener);
    addr
}
