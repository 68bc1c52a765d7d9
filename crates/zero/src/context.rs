//! Per-request context: request accessors, response writers, key-value
//! storage and the dispatch chain.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, Method, Request, Response, StatusCode, Uri};
use http_body_util::Full;
use serde::Serialize;
use zero_router::Params;

use crate::chain::{DispatchChain, Handler};
use crate::error::Error;

/// Renders an error into the response of the context it occurred in.
pub type ErrorRenderer = Arc<dyn Fn(&mut Context, &Error) + Send + Sync>;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const APPLICATION_JSON: &str = "application/json";

/// The context handed to every handler of one request.
///
/// Owned by the task serving the request; handlers get exclusive access,
/// so the key-value store needs no locking.
pub struct Context {
    request: http::request::Parts,
    body: Bytes,
    params: Params,

    status: StatusCode,
    headers: HeaderMap,
    response_body: Vec<u8>,
    written: bool,

    chain: DispatchChain,
    keys: HashMap<String, Box<dyn Any + Send + Sync>>,
    error: Option<Error>,
    renderer: ErrorRenderer,
}

impl Context {
    pub(crate) fn new(request: Request<Bytes>, renderer: ErrorRenderer) -> Self {
        let (request, body) = request.into_parts();
        Self {
            request,
            body,
            params: Params::new(),
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            response_body: Vec::new(),
            written: false,
            chain: DispatchChain::default(),
            keys: HashMap::new(),
            error: None,
            renderer,
        }
    }

    pub(crate) fn set_params(&mut self, params: Params) {
        self.params = params;
    }

    pub(crate) fn set_handlers(&mut self, handlers: Vec<Handler>) {
        self.chain = DispatchChain::new(handlers);
    }

    // ------------------------------------------------------------------
    // Dispatch chain
    // ------------------------------------------------------------------

    /// Run the remaining handlers in order.
    ///
    /// Middleware calls this to run everything downstream and then
    /// continue with its own post-processing.
    pub fn next(&mut self) {
        while let Some(handler) = self.chain.advance() {
            handler(self);
        }
    }

    /// Stop the chain. Handlers after the current one never run.
    pub fn abort(&mut self) {
        if !self.chain.is_aborted() {
            zero_telemetry::log_chain_aborted!(
                method = %self.request.method,
                path = %self.request.uri.path(),
                cursor = self.chain.cursor(),
                "dispatch chain aborted"
            );
        }
        self.chain.abort();
    }

    pub fn is_aborted(&self) -> bool {
        self.chain.is_aborted()
    }

    /// The chain driving this request.
    pub fn chain(&self) -> &DispatchChain {
        &self.chain
    }

    /// Abort and respond with `{"message": ...}` and the given status,
    /// replacing anything written so far.
    pub fn fail(&mut self, status: StatusCode, message: impl Into<String>) {
        self.abort();
        self.discard_response();
        self.json(status, &serde_json::json!({ "message": message.into() }));
    }

    /// Abort, record `error` and render it through the engine's error
    /// renderer. Headers and body written so far are discarded.
    pub fn reject(&mut self, error: impl Into<Error>) {
        let error = error.into();
        self.abort();
        self.discard_response();
        let renderer = Arc::clone(&self.renderer);
        renderer(self, &error);
        self.error = Some(error);
    }

    fn discard_response(&mut self) {
        self.headers.clear();
        self.response_body.clear();
    }

    /// The error recorded by [`reject`](Self::reject), if any.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    // ------------------------------------------------------------------
    // Request
    // ------------------------------------------------------------------

    pub fn method(&self) -> &Method {
        &self.request.method
    }

    pub fn uri(&self) -> &Uri {
        &self.request.uri
    }

    /// The raw request path.
    pub fn path(&self) -> &str {
        self.request.uri.path()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.request.headers
    }

    /// A request header as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.request.headers.get(name)?.to_str().ok()
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// A path parameter by name; empty if the route does not bind it.
    pub fn param(&self, name: &str) -> &str {
        self.params.get(name).unwrap_or_default()
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// The first value of a query-string parameter, percent-decoded.
    pub fn query(&self, key: &str) -> Option<String> {
        let query = self.request.uri.query()?;
        serde_urlencoded::from_str::<Vec<(String, String)>>(query)
            .ok()?
            .into_iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    // ------------------------------------------------------------------
    // Response
    // ------------------------------------------------------------------

    /// Set the response status.
    pub fn status(&mut self, status: StatusCode) {
        self.status = status;
        self.written = true;
    }

    /// The response status set so far.
    pub fn response_status(&self) -> StatusCode {
        self.status
    }

    pub fn response_headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn response_body(&self) -> &[u8] {
        &self.response_body
    }

    /// True once a handler has set a status or written a body.
    pub fn is_written(&self) -> bool {
        self.written
    }

    /// Set a response header, replacing any previous value.
    ///
    /// Invalid names or values are dropped with a warning.
    pub fn set_header(&mut self, name: &str, value: &str) {
        match (
            HeaderName::try_from(name),
            HeaderValue::try_from(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => tracing::warn!(header = %name, "ignoring invalid response header"),
        }
    }

    /// Write a plain-text body.
    pub fn string(&mut self, status: StatusCode, text: impl AsRef<str>) {
        self.set_header(CONTENT_TYPE.as_str(), TEXT_PLAIN);
        self.status(status);
        self.response_body.extend_from_slice(text.as_ref().as_bytes());
    }

    /// Write a JSON body.
    ///
    /// If `value` cannot be serialized the response becomes a 500 with the
    /// serializer's message.
    pub fn json<T: Serialize + ?Sized>(&mut self, status: StatusCode, value: &T) {
        match serde_json::to_vec(value) {
            Ok(bytes) => {
                self.set_header(CONTENT_TYPE.as_str(), APPLICATION_JSON);
                self.status(status);
                self.response_body.extend_from_slice(&bytes);
            }
            Err(e) => {
                self.response_body.clear();
                self.string(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
            }
        }
    }

    /// Write raw bytes without touching the content type.
    pub fn data(&mut self, status: StatusCode, bytes: impl AsRef<[u8]>) {
        self.status(status);
        self.response_body.extend_from_slice(bytes.as_ref());
    }

    pub(crate) fn into_response(self) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::new(Bytes::from(self.response_body)));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }

    // ------------------------------------------------------------------
    // Key-value storage
    // ------------------------------------------------------------------

    /// Store a value for later handlers of this request.
    pub fn set<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.keys.insert(key.into(), Box::new(value));
    }

    /// Look up a stored value of any type.
    pub fn get(&self, key: &str) -> Option<&(dyn Any + Send + Sync)> {
        self.keys.get(key).map(|v| v.as_ref())
    }

    /// Look up a stored value of type `T`.
    pub fn get_as<T: Any>(&self, key: &str) -> Option<&T> {
        self.keys.get(key)?.downcast_ref::<T>()
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.get_as::<String>(key)
            .map(String::as_str)
            .or_else(|| self.get_as::<&'static str>(key).copied())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get_as::<bool>(key).copied()
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get_as::<i64>(key).copied()
    }

    /// Remove a stored value.
    pub fn remove(&mut self, key: &str) -> bool {
        self.keys.remove(key).is_some()
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("method", &self.request.method)
            .field("path", &self.request.uri.path())
            .field("params", &self.params)
            .field("status", &self.status)
            .field("chain", &self.chain)
            .finish_non_exhaustive()
    }
}
