//! Error types shared across the engine.
//!
//! # Taxonomy
//! - NOT_FOUND: no mount pattern matched the remaining path
//! - RESOLUTION_ERROR: a `Resolvable` computation failed
//! - MATCHER_CONTRACT_VIOLATION: a traversal settled without producing a chunk
//! - CRAWL_CYCLE: a redirect loop was found while crawling
//!
//! Redirects are not errors; they are terminal outcomes carried by a chunk.
//!
//! # Design Decisions
//! - Matcher-level failures travel as `RouteError` payloads inside error
//!   chunks, so `Router::resolve` always hands back a `Route`
//! - Only `RouterError::CrawlCycle` aborts a crawl

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure carried by an error chunk.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RouteError {
    /// No matcher accepted the remaining path.
    #[error("no route matches {url}")]
    NotFound { url: String },

    /// An asynchronous computation behind a resolvable failed.
    #[error("resolution failed for {url}: {message}")]
    Resolution { url: String, message: String },

    /// The traversal finished without yielding a single chunk.
    #[error("matcher produced no chunks for {url}")]
    ContractViolation { url: String },

    /// Error raised explicitly by a matcher.
    #[error("{message}")]
    Custom { status: u16, message: String },
}

impl RouteError {
    /// HTTP-equivalent status code for this error.
    pub fn status(&self) -> u16 {
        match self {
            RouteError::NotFound { .. } => 404,
            RouteError::Resolution { .. } | RouteError::ContractViolation { .. } => 500,
            RouteError::Custom { status, .. } => *status,
        }
    }
}

/// Failure returned by a resolvable computation.
///
/// Cloneable because one in-flight computation is shared by every caller
/// that asked for the same key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ResolveError(pub String);

impl ResolveError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<&str> for ResolveError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

impl From<String> for ResolveError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

/// Errors that abort a router operation.
#[derive(Debug, Error)]
pub enum RouterError {
    /// A chain of redirects led back to a path already on the chain.
    #[error("redirect cycle detected: {}", .0.join(" -> "))]
    CrawlCycle(Vec<String>),
}

/// Result type for router operations.
pub type RouterResult<T> = Result<T, RouterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status() {
        assert_eq!(RouteError::NotFound { url: "/x".into() }.status(), 404);
        assert_eq!(
            RouteError::Resolution { url: "/x".into(), message: "boom".into() }.status(),
            500
        );
        assert_eq!(
            RouteError::Custom { status: 403, message: "forbidden".into() }.status(),
            403
        );
    }

    #[test]
    fn test_error_display() {
        let err = RouterError::CrawlCycle(vec!["/a".into(), "/b".into(), "/a".into()]);
        assert_eq!(err.to_string(), "redirect cycle detected: /a -> /b -> /a");

        let err = RouteError::NotFound { url: "/missing".into() };
        assert_eq!(err.to_string(), "no route matches /missing");
    }

    #[test]
    fn test_route_error_serde() {
        let err = RouteError::Custom { status: 418, message: "teapot".into() };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "custom");
        let decoded: RouteError = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, err);
    }
}
