//! Structured logging with JSON or pretty output.
//!
//! Implements 12-factor app logging: structured records to stdout.

use crate::{LogFormat, TelemetryConfig, TelemetryError};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Initialize the logging subsystem.
///
/// Sets up tracing-subscriber with either JSON or pretty format,
/// respecting the configured log level.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    // Build the env filter from config or RUST_LOG
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    match config.log_format {
        LogFormat::Json => init_json_logging(filter),
        LogFormat::Pretty => init_pretty_logging(filter),
    }
}

/// Initialize JSON logging for production.
fn init_json_logging(filter: EnvFilter) -> Result<(), TelemetryError> {
    let json_layer = fmt::layer()
        .json()
        .with_target(true)
        .with_current_span(true)
        .with_span_list(false)
        .with_file(false)
        .with_line_number(false)
        .flatten_event(true)
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(json_layer)
        .try_init()
        .map_err(|e: tracing_subscriber::util::TryInitError| {
            TelemetryError::LoggingInit(e.to_string())
        })
}

/// Initialize pretty logging for development.
fn init_pretty_logging(filter: EnvFilter) -> Result<(), TelemetryError> {
    let pretty_layer = fmt::layer()
        .pretty()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(pretty_layer)
        .try_init()
        .map_err(|e: tracing_subscriber::util::TryInitError| {
            TelemetryError::LoggingInit(e.to_string())
        })
}

/// Standard log event names.
pub mod events {
    /// Process is starting up.
    pub const STARTUP: &str = "startup";

    /// Server is shutting down.
    pub const SHUTDOWN: &str = "shutdown";

    /// Server is listening on an address.
    pub const LISTENING: &str = "listening";

    /// A route has been registered.
    pub const ROUTE_REGISTERED: &str = "route_registered";

    /// Request has been completed.
    pub const REQUEST_COMPLETED: &str = "request_completed";

    /// No route matched the request.
    pub const ROUTE_NOT_FOUND: &str = "route_not_found";

    /// A handler aborted the dispatch chain.
    pub const CHAIN_ABORTED: &str = "chain_aborted";

    /// A handler panicked and was recovered.
    pub const HANDLER_FAULT: &str = "handler_fault";

    /// A client connection failed.
    pub const CONNECTION_ERROR: &str = "connection_error";
}

/// Helper macros for structured logging with standard fields.
///
/// These wrap the tracing macros to ensure consistent field naming.
#[macro_export]
macro_rules! log_startup {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::STARTUP,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_shutdown {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::SHUTDOWN,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_listening {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::LISTENING,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_route_registered {
    ($($field:tt)*) => {
        tracing::debug!(
            event = $crate::logging::events::ROUTE_REGISTERED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_request_completed {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::REQUEST_COMPLETED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_route_not_found {
    ($($field:tt)*) => {
        tracing::debug!(
            event = $crate::logging::events::ROUTE_NOT_FOUND,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_chain_aborted {
    ($($field:tt)*) => {
        tracing::debug!(
            event = $crate::logging::events::CHAIN_ABORTED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_handler_fault {
    ($($field:tt)*) => {
        tracing::error!(
            event = $crate::logging::events::HANDLER_FAULT,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_connection_error {
    ($($field:tt)*) => {
        tracing::warn!(
            event = $crate::logging::events::CONNECTION_ERROR,
            $($field)*
        )
    };
}
