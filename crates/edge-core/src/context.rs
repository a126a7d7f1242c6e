//! Request context handed to route handlers and deferred resolvers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use http::{HeaderMap, Method};

use crate::lifecycle::TimingContext;

/// Unique request identifier for tracing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(pub String);

static NEXT_REQUEST: AtomicU64 = AtomicU64::new(1);

impl RequestId {
    /// Generate a new request ID.
    pub fn generate() -> Self {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let seq = NEXT_REQUEST.fetch_add(1, Ordering::Relaxed);
        Self(format!("{:x}-{:x}", nanos, seq))
    }

    /// Create from an existing ID string.
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Query string parameters.
pub type QueryParams = HashMap<String, String>;

/// Typed request context.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Unique request identifier.
    pub request_id: RequestId,
    /// HTTP method.
    pub method: Method,
    /// Request path, without the query string.
    pub path: String,
    /// Query string parameters.
    pub query: QueryParams,
    /// HTTP headers.
    pub headers: HeaderMap,
    /// Timing context for observability.
    pub timing: TimingContext,
}

impl RequestContext {
    /// Create a new request context.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            request_id: RequestId::generate(),
            method,
            path: path.into(),
            query: HashMap::new(),
            headers: HeaderMap::new(),
            timing: TimingContext::new(),
        }
    }

    /// Create a GET context for `path_and_query`, e.g. `/about?lang=en`.
    pub fn get(path_and_query: &str) -> Self {
        let (path, query) = split_query(path_and_query);
        let mut ctx = Self::new(Method::GET, path);
        ctx.query = query;
        ctx
    }

    /// Build a context from the parts of an HTTP request.
    pub fn from_parts(parts: &http::request::Parts) -> Self {
        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or_else(|| parts.uri.path());
        let (path, query) = split_query(path_and_query);

        let request_id = parts
            .headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(RequestId::from_string)
            .unwrap_or_else(RequestId::generate);

        Self {
            request_id,
            method: parts.method.clone(),
            path,
            query,
            headers: parts.headers.clone(),
            timing: TimingContext::new(),
        }
    }

    /// Get a query parameter by name.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(|s| s.as_str())
    }

    /// Get a header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

fn split_query(path_and_query: &str) -> (String, QueryParams) {
    let (path, raw) = match path_and_query.split_once('?') {
        Some((path, raw)) => (path, raw),
        None => (path_and_query, ""),
    };

    let query = raw
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (k.to_string(), v.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect();

    (path.to_string(), query)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_ids_are_unique() {
        let a = RequestId::generate();
        let b = RequestId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_get_splits_query() {
        let ctx = RequestContext::get("/about?lang=en&debug");

        assert_eq!(ctx.method, Method::GET);
        assert_eq!(ctx.path, "/about");
        assert_eq!(ctx.query_param("lang"), Some("en"));
        assert_eq!(ctx.query_param("debug"), Some(""));
        assert_eq!(ctx.query_param("missing"), None);
    }

    #[test]
    fn test_from_parts_reuses_request_id_header() {
        let (parts, _) = http::Request::builder()
            .uri("/js/App.js?v=1")
            .header("x-request-id", "abc-123")
            .header("Accept", "text/html")
            .body(())
            .unwrap()
            .into_parts();

        let ctx = RequestContext::from_parts(&parts);

        assert_eq!(ctx.request_id, RequestId::from_string("abc-123"));
        assert_eq!(ctx.path, "/js/App.js");
        assert_eq!(ctx.query_param("v"), Some("1"));
        assert_eq!(ctx.header("accept"), Some("text/html"));
    }
}
