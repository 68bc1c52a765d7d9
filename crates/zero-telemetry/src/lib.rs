//! Observability infrastructure for the zero web framework.
//!
//! Structured logging (JSON for production, pretty for development) with
//! a fixed vocabulary of event names and helper macros that stamp them.
//!
//! # Usage
//!
//! ```ignore
//! use zero_telemetry::{LogFormat, TelemetryConfig};
//!
//! let config = TelemetryConfig::new()
//!     .with_log_level("debug")
//!     .with_log_format(LogFormat::Pretty);
//!
//! zero_telemetry::init(&config)?;
//! ```

pub mod config;
pub mod logging;

pub use config::{LogFormat, TelemetryConfig};
pub use logging::events;

use thiserror::Error;

/// Telemetry errors.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Failed to initialize logging.
    #[error("failed to initialize logging: {0}")]
    LoggingInit(String),
}

/// Initialize logging and emit the startup record.
///
/// Fails if a global subscriber is already installed.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    logging::init_logging(config)?;
    crate::log_startup!(
        service = %config.service_name,
        version = env!("CARGO_PKG_VERSION"),
        "telemetry initialized"
    );
    Ok(())
}
