//! Downstream invoker.
//!
//! Forwards one message body to the configured endpoint. A call succeeds only
//! when the endpoint answers with status 200; any other status and every
//! transport error (connect, DNS, timeout, ...) is a failure the retry engine
//! will retry.

use crate::error::WorkerError;
use crate::request_id::RequestContext;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode, Url};
use std::time::Duration;
use tracing::debug;

/// Header carrying the request id on the outbound call.
pub const REQUEST_ID_HTTP_HEADER: &str = "X-Request-Id";

const JSON: &str = "application/json";

/// Performs the outbound call for a message.
///
/// `Ok(())` means the downstream accepted the message; `Err` is a retryable
/// failure.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Invoker: Send + Sync {
    async fn invoke(&self, body: &[u8], context: &RequestContext) -> Result<(), WorkerError>;

    /// Invoker name for logging.
    fn name(&self) -> &'static str {
        "invoker"
    }
}

/// Invoker backed by `reqwest`, calling a fixed method and URL.
#[derive(Debug, Clone)]
pub struct HttpInvoker {
    client: Client,
    method: Method,
    url: Url,
    timeout: Option<Duration>,
}

impl HttpInvoker {
    /// Validate method and URL once, at startup.
    pub fn new(method: &str, url: &str) -> Result<Self, WorkerError> {
        let method = Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes())
            .map_err(|_| WorkerError::Config(format!("invalid invoking method '{method}'")))?;
        let url = Url::parse(url)
            .map_err(|e| WorkerError::Config(format!("invalid invoking url '{url}': {e}")))?;

        Ok(Self {
            client: Client::new(),
            method,
            url,
            timeout: None,
        })
    }

    /// Bound every call by `timeout`. Without it a call may wait indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

#[async_trait]
impl Invoker for HttpInvoker {
    async fn invoke(&self, body: &[u8], context: &RequestContext) -> Result<(), WorkerError> {
        let mut request = self
            .client
            .request(self.method.clone(), self.url.clone())
            .header(CONTENT_TYPE, JSON)
            .header(ACCEPT, JSON)
            .header(REQUEST_ID_HTTP_HEADER, context.request_id.as_str())
            .body(body.to_vec());

        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        let status = response.status();

        debug!(status = status.as_u16(), "Response received");

        if status == StatusCode::OK {
            Ok(())
        } else {
            Err(WorkerError::UnexpectedStatus {
                status: status.as_u16(),
            })
        }
    }

    fn name(&self) -> &'static str {
        "http_invoker"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_normalizes_method() {
        let invoker = HttpInvoker::new("post", "https://example.com/hooks").unwrap();
        assert_eq!(invoker.method(), &Method::POST);
        assert_eq!(invoker.url().as_str(), "https://example.com/hooks");
        assert_eq!(invoker.timeout(), None);
    }

    #[test]
    fn test_new_rejects_invalid_method() {
        let err = HttpInvoker::new("GE T", "https://example.com").unwrap_err();
        assert!(err.is_startup());
        assert!(err.to_string().contains("invoking method"));
    }

    #[test]
    fn test_new_rejects_invalid_url() {
        let err = HttpInvoker::new("GET", "not a url").unwrap_err();
        assert!(err.is_startup());
        assert!(err.to_string().contains("invoking url"));
    }

    #[test]
    fn test_with_timeout() {
        let invoker = HttpInvoker::new("GET", "https://example.com")
            .unwrap()
            .with_timeout(Some(Duration::from_secs(5)));
        assert_eq!(invoker.timeout(), Some(Duration::from_secs(5)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_failure() {
        // Port 9 (discard) on localhost is closed in test environments
        let invoker = HttpInvoker::new("POST", "http://127.0.0.1:9/").unwrap();
        let result = invoker
            .invoke(b"{}", &RequestContext::new("req-1"))
            .await;

        assert!(matches!(result, Err(WorkerError::Http(_))));
    }
}
