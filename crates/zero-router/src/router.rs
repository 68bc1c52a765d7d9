use std::collections::HashMap;

use http::Method;

use crate::error::RouteError;
use crate::params::Params;
use crate::pattern::{split_path, Pattern};
use crate::trie::Node;

/// The routing table. Maps HTTP methods + paths to handler lists.
///
/// Generic over the handler type so the table can be shared by any
/// dispatch layer. Once built, a `Router` is only read, so it can be
/// shared across request tasks without locking.
#[derive(Debug)]
pub struct Router<H> {
    /// One trie per method, created on first registration.
    roots: HashMap<Method, Node>,
    /// Handler lists per method, keyed by canonical pattern so that
    /// `/api` and `/api/` are one route.
    handlers: HashMap<Method, HashMap<String, Vec<H>>>,
}

/// The result of a successful route lookup.
#[derive(Debug)]
pub struct RouteMatch<'a, H> {
    /// The registered pattern that matched.
    pub pattern: &'a Pattern,
    /// Parameters extracted from the request path.
    pub params: Params,
    /// Handlers registered for the matched route, in order.
    pub handlers: &'a [H],
}

impl<H> Default for Router<H> {
    fn default() -> Self {
        Self {
            roots: HashMap::new(),
            handlers: HashMap::new(),
        }
    }
}

impl<H> Router<H> {
    /// Create a new empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handlers` for `method` + `pattern`.
    ///
    /// Registering the same method and pattern again replaces the handler
    /// list, including patterns that differ only in slashes. An empty list
    /// is allowed and matches without doing anything.
    pub fn insert(
        &mut self,
        method: Method,
        pattern: &str,
        handlers: Vec<H>,
    ) -> Result<(), RouteError> {
        let parsed = Pattern::parse(pattern)?;
        let key = parsed.canonical().to_string();
        self.roots
            .entry(method.clone())
            .or_insert_with(Node::root)
            .insert(parsed);
        self.handlers
            .entry(method)
            .or_default()
            .insert(key, handlers);
        Ok(())
    }

    /// Resolve a request method and path to a route.
    pub fn lookup(&self, method: &Method, path: &str) -> Result<RouteMatch<'_, H>, RouteError> {
        let root = self
            .roots
            .get(method)
            .ok_or_else(|| RouteError::not_found(method, path))?;

        let segments: Vec<&str> = split_path(path).collect();
        let pattern = root
            .search(&segments)
            .and_then(Node::pattern)
            .ok_or_else(|| RouteError::not_found(method, path))?;

        let handlers = self
            .handlers
            .get(method)
            .and_then(|routes| routes.get(pattern.canonical()))
            .map(Vec::as_slice)
            .unwrap_or_default();

        Ok(RouteMatch {
            pattern,
            params: pattern.extract(&segments),
            handlers,
        })
    }

    /// Number of registered (method, pattern) routes.
    pub fn len(&self) -> usize {
        self.handlers.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered routes as (method, canonical pattern, handler count).
    pub fn routes(&self) -> impl Iterator<Item = (&Method, &str, usize)> {
        self.handlers.iter().flat_map(|(method, routes)| {
            routes
                .iter()
                .map(move |(pattern, handlers)| (method, pattern.as_str(), handlers.len()))
        })
    }
}
