//! Mock downstream HTTP service
//!
//! `TestDownstream` binds an ephemeral port on 127.0.0.1, answers every
//! request with scripted status codes and records what it received.

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode};
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A request seen by the mock downstream.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    /// Header names are lowercase.
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Clone)]
struct DownstreamState {
    statuses: Arc<Mutex<VecDeque<u16>>>,
    fallback: u16,
    delay: Option<Duration>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

/// Builder for `TestDownstream`
#[derive(Debug, Default)]
pub struct TestDownstreamBuilder {
    statuses: Vec<u16>,
    fallback: Option<u16>,
    delay: Option<Duration>,
}

impl TestDownstreamBuilder {
    /// Answer the next request with `status`. Calls queue in order.
    pub fn respond(mut self, status: u16) -> Self {
        self.statuses.push(status);
        self
    }

    /// Status once the queued responses run out (default 200)
    pub fn otherwise(mut self, status: u16) -> Self {
        self.fallback = Some(status);
        self
    }

    /// Wait before answering each request
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub async fn start(self) -> TestDownstream {
        let state = DownstreamState {
            statuses: Arc::new(Mutex::new(self.statuses.into())),
            fallback: self.fallback.unwrap_or(200),
            delay: self.delay,
            requests: Arc::new(Mutex::new(Vec::new())),
        };
        let requests = state.requests.clone();

        let router = Router::new().fallback(record).with_state(state);
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock downstream");
        let addr = listener
            .local_addr()
            .expect("Failed to read mock downstream address");

        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::warn!(error = %e, "Mock downstream stopped");
            }
        });

        tracing::debug!(%addr, "Mock downstream ready");

        TestDownstream {
            addr,
            requests,
            server,
        }
    }
}

/// Mock HTTP endpoint that stops when dropped
pub struct TestDownstream {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    server: JoinHandle<()>,
}

impl TestDownstream {
    pub fn builder() -> TestDownstreamBuilder {
        TestDownstreamBuilder::default()
    }

    /// Start a downstream that always answers `status`
    pub async fn with_status(status: u16) -> Self {
        Self::builder().otherwise(status).start().await
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Absolute URL for `path` on this server
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Requests received so far, in arrival order
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    pub fn request_count(&self) -> usize {
        self.requests().len()
    }
}

impl Drop for TestDownstream {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn record(
    State(state): State<DownstreamState>,
    method: Method,
    uri: axum::http::Uri,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let headers = headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();

    if let Ok(mut requests) = state.requests.lock() {
        requests.push(RecordedRequest {
            method: method.to_string(),
            path: uri.path().to_string(),
            headers,
            body: body.to_vec(),
        });
    }

    let status = state
        .statuses
        .lock()
        .ok()
        .and_then(|mut statuses| statuses.pop_front())
        .unwrap_or(state.fallback);

    if let Some(delay) = state.delay {
        tokio::time::sleep(delay).await;
    }

    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_statuses() {
        let downstream = TestDownstream::builder()
            .respond(500)
            .respond(503)
            .start()
            .await;
        let client = reqwest::Client::new();

        let mut seen = Vec::new();
        for _ in 0..3 {
            let response = client
                .post(downstream.url("/events"))
                .body("{}")
                .send()
                .await
                .unwrap();
            seen.push(response.status().as_u16());
        }

        assert_eq!(seen, vec![500, 503, 200]);
        assert_eq!(downstream.request_count(), 3);
    }

    #[tokio::test]
    async fn test_records_request() {
        let downstream = TestDownstream::with_status(200).await;

        reqwest::Client::new()
            .put(downstream.url("/hook"))
            .header("X-Request-Id", "abc")
            .body(r#"{"a":1}"#)
            .send()
            .await
            .unwrap();

        let requests = downstream.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "PUT");
        assert_eq!(requests[0].path, "/hook");
        assert_eq!(requests[0].header("x-request-id"), Some("abc"));
        assert_eq!(requests[0].body_text(), r#"{"a":1}"#);
    }
}
