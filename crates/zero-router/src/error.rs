use http::Method;
use thiserror::Error;

/// Errors produced while registering or resolving routes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// No registered pattern matches the method and path.
    #[error("404 NOT FOUND: {method} {path}")]
    NotFound { method: Method, path: String },

    /// The pattern cannot be registered.
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

impl RouteError {
    pub(crate) fn not_found(method: &Method, path: &str) -> Self {
        RouteError::NotFound {
            method: method.clone(),
            path: path.to_string(),
        }
    }

    pub(crate) fn invalid(pattern: &str, reason: impl Into<String>) -> Self {
        RouteError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.into(),
        }
    }

    /// Returns true if this is a "no route matched" condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RouteError::NotFound { .. })
    }
}
