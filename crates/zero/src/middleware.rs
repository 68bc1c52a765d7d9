//! Built-in middleware.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;

use crate::chain::{handler, Handler};
use crate::error::Error;

/// Log one `request_completed` record per request with its final status
/// and duration.
pub fn logger() -> Handler {
    handler(|c| {
        let start = Instant::now();
        c.next();
        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        zero_telemetry::log_request_completed!(
            method = %c.method(),
            path = %c.path(),
            status = c.response_status().as_u16(),
            duration_ms = duration_ms,
            "request completed"
        );
    })
}

/// Turn a panic in any downstream handler into a 500 response.
///
/// The panic is logged, the chain is aborted and the engine's error
/// renderer writes the response. Middleware registered before this one
/// resumes normally.
pub fn recovery() -> Handler {
    handler(|c| {
        if let Err(panic) = catch_unwind(AssertUnwindSafe(|| c.next())) {
            let message = panic_message(panic.as_ref());
            zero_telemetry::log_handler_fault!(
                method = %c.method(),
                path = %c.path(),
                error = %message,
                "handler panicked"
            );
            c.reject(Error::HandlerFault(message));
        }
    })
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_message_reads_str_and_string_payloads() {
        let from_str = catch_unwind(|| panic!("static")).unwrap_err();
        assert_eq!(panic_message(from_str.as_ref()), "static");

        let from_string = catch_unwind(|| panic!("{}-{}", "formatted", 1)).unwrap_err();
        assert_eq!(panic_message(from_string.as_ref()), "formatted-1");

        let other = catch_unwind(|| std::panic::panic_any(7_u32)).unwrap_err();
        assert_eq!(panic_message(other.as_ref()), "unknown panic");
    }
}
