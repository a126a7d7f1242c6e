//! Write-once response handle shared between the dispatcher, deferred
//! resolvers and error listeners.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::body::Body;
use axum::response::{IntoResponse, Response};
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, StatusCode};

pub const HTML: &str = "text/html; charset=utf-8";
pub const JAVASCRIPT: &str = "application/javascript";

#[derive(Debug, Default)]
struct State {
    headers: HeaderMap,
    committed: Option<(StatusCode, Vec<u8>)>,
}

/// A response that can be committed exactly once.
///
/// Clones share the same underlying response. The first [`send`](Self::send)
/// wins; later sends are ignored and return `false`.
#[derive(Debug, Clone, Default)]
pub struct ResponseWriter {
    state: Arc<Mutex<State>>,
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit status, content type and body. Returns false if the response
    /// was already committed.
    pub fn send(&self, status: StatusCode, content_type: &str, body: impl Into<Vec<u8>>) -> bool {
        let mut state = self.lock();
        if state.committed.is_some() {
            tracing::debug!(status = %status, "response already sent, ignoring");
            return false;
        }
        if let Ok(value) = HeaderValue::from_str(content_type) {
            state.headers.insert(CONTENT_TYPE, value);
        }
        state.committed = Some((status, body.into()));
        true
    }

    /// Commit an HTML body.
    pub fn send_html(&self, status: StatusCode, html: impl Into<Vec<u8>>) -> bool {
        self.send(status, HTML, html)
    }

    /// Set a header. Ignored once the response is committed.
    pub fn set_header(&self, name: HeaderName, value: HeaderValue) -> bool {
        let mut state = self.lock();
        if state.committed.is_some() {
            return false;
        }
        state.headers.insert(name, value);
        true
    }

    pub fn is_sent(&self) -> bool {
        self.lock().committed.is_some()
    }

    /// Committed status, if any.
    pub fn status(&self) -> Option<StatusCode> {
        self.lock().committed.as_ref().map(|(status, _)| *status)
    }

    /// Committed body, if any.
    pub fn body(&self) -> Option<Vec<u8>> {
        self.lock().committed.as_ref().map(|(_, body)| body.clone())
    }

    /// Header value as a string, if set and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<String> {
        self.lock()
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl IntoResponse for ResponseWriter {
    fn into_response(self) -> Response {
        let mut state = self.lock();
        let headers = std::mem::take(&mut state.headers);
        let (status, body) = state
            .committed
            .take()
            .unwrap_or((StatusCode::INTERNAL_SERVER_ERROR, Vec::new()));
        drop(state);

        let mut response = Response::new(Body::from(body));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        response
    }
}
