//! Error types for the engine and server.

use http::StatusCode;
use thiserror::Error;
use zero_router::RouteError;

/// Errors surfaced by the engine, handlers and the host server.
#[derive(Debug, Error)]
pub enum Error {
    /// Route registration or resolution failed.
    #[error(transparent)]
    Route(#[from] RouteError),

    /// A handler panicked and the panic was recovered.
    #[error("handler fault: {0}")]
    HandlerFault(String),

    /// Failed to bind the listen address.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        source: std::io::Error,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns true if no route matched the request.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Route(e) if e.is_not_found())
    }

    /// Returns true if this error came from a recovered handler panic.
    pub fn is_fault(&self) -> bool {
        matches!(self, Error::HandlerFault(_))
    }

    /// The HTTP status this error renders as.
    pub fn status(&self) -> StatusCode {
        match self {
            Error::Route(RouteError::NotFound { .. }) => StatusCode::NOT_FOUND,
            Error::Route(RouteError::InvalidPattern { .. })
            | Error::HandlerFault(_)
            | Error::Bind { .. }
            | Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
