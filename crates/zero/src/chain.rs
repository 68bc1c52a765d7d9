//! The per-request dispatch chain.
//!
//! A chain is an ordered handler list plus a cursor pointing at the next
//! handler to run. [`Context::next`](crate::Context::next) drains the chain
//! from the cursor; a handler that calls `next()` itself runs the rest of
//! the chain before its own code resumes, and the outer loop then finds the
//! cursor already at the end. Aborting clamps the cursor to the end.

use std::sync::Arc;

use crate::context::Context;

/// A request handler or middleware.
///
/// Handlers receive the request context and return nothing. A handler that
/// wants to wrap downstream handlers calls [`Context::next`] and continues
/// after it returns.
pub type Handler = Arc<dyn Fn(&mut Context) + Send + Sync>;

/// Wrap a closure as a [`Handler`].
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&mut Context) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Ordered handlers for one request and the position of the next one.
#[derive(Default)]
pub struct DispatchChain {
    handlers: Vec<Handler>,
    cursor: usize,
    aborted: bool,
}

impl DispatchChain {
    pub fn new(handlers: Vec<Handler>) -> Self {
        Self {
            handlers,
            cursor: 0,
            aborted: false,
        }
    }

    /// Take the handler at the cursor and move the cursor past it.
    pub(crate) fn advance(&mut self) -> Option<Handler> {
        let handler = self.handlers.get(self.cursor)?.clone();
        self.cursor += 1;
        Some(handler)
    }

    /// Stop the chain: no further handlers will run.
    pub fn abort(&mut self) {
        self.cursor = self.handlers.len();
        self.aborted = true;
    }

    /// True once a handler has aborted the chain.
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// True when no handlers remain to run.
    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.handlers.len()
    }

    /// Index of the next handler to run.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for DispatchChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchChain")
            .field("handlers", &self.handlers.len())
            .field("cursor", &self.cursor)
            .field("aborted", &self.aborted)
            .finish()
    }
}
