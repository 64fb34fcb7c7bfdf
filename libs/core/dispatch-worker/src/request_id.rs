//! Request-id resolution.
//!
//! Every message gets one correlation id, taken from its `x-request-id`
//! header when present and generated otherwise. The id is resolved once and
//! passed explicitly to every attempt and to the dead-letter record.

use crate::message::{find_header, Header};
use uuid::Uuid;

/// Header carrying the correlation id, matched without regard to case.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Per-message context, constant across every retry attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub request_id: String,
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
        }
    }

    /// Build the context for a message from its headers.
    pub fn resolve(headers: &[Header]) -> Self {
        Self::new(resolve_request_id(headers))
    }
}

/// Return the first `x-request-id` header value verbatim, or a fresh UUID v4.
pub fn resolve_request_id(headers: &[Header]) -> String {
    match find_header(headers, REQUEST_ID_HEADER) {
        Some(header) => String::from_utf8_lossy(&header.value).into_owned(),
        None => Uuid::new_v4().to_string(),
    }
}
