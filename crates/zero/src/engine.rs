//! The engine: route registration, groups and per-request dispatch.

use std::path::PathBuf;
use std::sync::Arc;

use arc_swap::ArcSwap;
use bytes::Bytes;
use http::{Method, Request, Response};
use http_body_util::Full;
use zero_router::{RouteError, Router};

use crate::chain::{handler, Handler};
use crate::context::{Context, ErrorRenderer};
use crate::error::Error;
use crate::{middleware, static_files};

/// A prefix and the middlewares that apply to every path under it.
struct Group {
    prefix: String,
    middlewares: Vec<Handler>,
}

/// Route registration shared by [`Engine`] and [`RouterGroup`].
pub trait Routes {
    /// Register `handlers` for `method` + `pattern`, relative to this
    /// group's prefix.
    fn add_route(&mut self, method: Method, pattern: &str, handlers: Vec<Handler>)
        -> Result<(), Error>;

    fn route<I>(&mut self, method: Method, pattern: &str, handlers: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = Handler>,
    {
        self.add_route(method, pattern, handlers.into_iter().collect())
    }

    fn get<I: IntoIterator<Item = Handler>>(&mut self, pattern: &str, handlers: I) -> Result<(), Error> {
        self.route(Method::GET, pattern, handlers)
    }

    fn head<I: IntoIterator<Item = Handler>>(&mut self, pattern: &str, handlers: I) -> Result<(), Error> {
        self.route(Method::HEAD, pattern, handlers)
    }

    fn post<I: IntoIterator<Item = Handler>>(&mut self, pattern: &str, handlers: I) -> Result<(), Error> {
        self.route(Method::POST, pattern, handlers)
    }

    fn put<I: IntoIterator<Item = Handler>>(&mut self, pattern: &str, handlers: I) -> Result<(), Error> {
        self.route(Method::PUT, pattern, handlers)
    }

    fn patch<I: IntoIterator<Item = Handler>>(&mut self, pattern: &str, handlers: I) -> Result<(), Error> {
        self.route(Method::PATCH, pattern, handlers)
    }

    fn delete<I: IntoIterator<Item = Handler>>(&mut self, pattern: &str, handlers: I) -> Result<(), Error> {
        self.route(Method::DELETE, pattern, handlers)
    }

    fn connect<I: IntoIterator<Item = Handler>>(&mut self, pattern: &str, handlers: I) -> Result<(), Error> {
        self.route(Method::CONNECT, pattern, handlers)
    }

    fn options<I: IntoIterator<Item = Handler>>(&mut self, pattern: &str, handlers: I) -> Result<(), Error> {
        self.route(Method::OPTIONS, pattern, handlers)
    }

    fn trace<I: IntoIterator<Item = Handler>>(&mut self, pattern: &str, handlers: I) -> Result<(), Error> {
        self.route(Method::TRACE, pattern, handlers)
    }

    /// Serve files under `root` at `<relative>/*filepath`.
    fn static_files(&mut self, relative: &str, root: impl Into<PathBuf>) -> Result<(), Error> {
        let pattern = join_paths(relative, "*filepath");
        self.get(&pattern, [static_files::serve_dir(root.into())])
    }
}

/// The HTTP engine.
///
/// Routes and groups are registered on an `Engine` during startup. Serving
/// consumes it (see [`EngineHandle`]), so the route table is frozen before
/// the first request arrives.
pub struct Engine {
    router: Router<Handler>,
    /// Index 0 is the engine's own root group with an empty prefix.
    groups: Vec<Group>,
    renderer: ErrorRenderer,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// An engine with no middleware.
    pub fn new() -> Self {
        Self {
            router: Router::new(),
            groups: vec![Group {
                prefix: String::new(),
                middlewares: Vec::new(),
            }],
            renderer: Arc::new(render_error),
        }
    }

    /// An engine with the request logger and panic recovery installed.
    pub fn with_defaults() -> Self {
        let mut engine = Self::new();
        engine.use_middleware([middleware::logger(), middleware::recovery()]);
        engine
    }

    /// Add middlewares that run for every request.
    pub fn use_middleware<I: IntoIterator<Item = Handler>>(&mut self, middlewares: I) {
        self.groups[0].middlewares.extend(middlewares);
    }

    /// Create a route group under `prefix`.
    pub fn group(&mut self, prefix: &str) -> RouterGroup<'_> {
        let index = self.push_group(prefix.to_string());
        RouterGroup {
            engine: self,
            index,
        }
    }

    /// Replace the renderer used for not-found and recovered errors.
    pub fn set_error_renderer<F>(&mut self, renderer: F)
    where
        F: Fn(&mut Context, &Error) + Send + Sync + 'static,
    {
        self.renderer = Arc::new(renderer);
    }

    /// Number of registered routes.
    pub fn route_count(&self) -> usize {
        self.router.len()
    }

    /// Registered routes as (method, pattern, handler count), sorted by
    /// pattern then method.
    pub fn routes(&self) -> Vec<(&Method, &str, usize)> {
        let mut routes: Vec<_> = self.router.routes().collect();
        routes.sort_by(|a, b| a.1.cmp(b.1).then_with(|| a.0.as_str().cmp(b.0.as_str())));
        routes
    }

    /// Dispatch a request and return the finished context.
    ///
    /// The chain is the middleware of every group whose prefix starts the
    /// path, in registration order, followed by the route's handlers or by
    /// a terminal handler that rejects with `RouteNotFound`.
    pub fn dispatch(&self, request: Request<Bytes>) -> Context {
        let method = request.method().clone();
        let path = request.uri().path().to_string();

        let mut handlers: Vec<Handler> = self
            .groups
            .iter()
            .filter(|group| path.starts_with(&group.prefix))
            .flat_map(|group| group.middlewares.iter().cloned())
            .collect();

        let mut ctx = Context::new(request, Arc::clone(&self.renderer));
        match self.router.lookup(&method, &path) {
            Ok(route) => {
                handlers.extend(route.handlers.iter().cloned());
                ctx.set_params(route.params);
            }
            Err(e) => {
                zero_telemetry::log_route_not_found!(
                    method = %method,
                    path = %path,
                    "no route matched"
                );
                handlers.push(not_found(e));
            }
        }

        ctx.set_handlers(handlers);
        ctx.next();
        ctx
    }

    /// Dispatch a request and build its response.
    pub fn handle(&self, request: Request<Bytes>) -> Response<Full<Bytes>> {
        self.dispatch(request).into_response()
    }

    fn push_group(&mut self, prefix: String) -> usize {
        self.groups.push(Group {
            prefix,
            middlewares: Vec::new(),
        });
        self.groups.len() - 1
    }
}

impl Routes for Engine {
    fn add_route(
        &mut self,
        method: Method,
        pattern: &str,
        handlers: Vec<Handler>,
    ) -> Result<(), Error> {
        let count = handlers.len();
        self.router.insert(method.clone(), pattern, handlers)?;
        zero_telemetry::log_route_registered!(
            method = %method,
            pattern = %pattern,
            handlers = count,
            "route registered"
        );
        Ok(())
    }
}

/// A group of routes sharing a path prefix and middlewares.
///
/// Borrowed from the engine; nested groups extend the parent's prefix.
pub struct RouterGroup<'e> {
    engine: &'e mut Engine,
    index: usize,
}

impl RouterGroup<'_> {
    /// The full prefix of this group.
    pub fn prefix(&self) -> &str {
        &self.engine.groups[self.index].prefix
    }

    /// Add middlewares for every path under this group's prefix.
    pub fn use_middleware<I: IntoIterator<Item = Handler>>(&mut self, middlewares: I) {
        self.engine.groups[self.index].middlewares.extend(middlewares);
    }

    /// Create a nested group under `prefix`.
    pub fn group(&mut self, prefix: &str) -> RouterGroup<'_> {
        let full = format!("{}{}", self.prefix(), prefix);
        let index = self.engine.push_group(full);
        RouterGroup {
            engine: &mut *self.engine,
            index,
        }
    }
}

impl Routes for RouterGroup<'_> {
    fn add_route(
        &mut self,
        method: Method,
        pattern: &str,
        handlers: Vec<Handler>,
    ) -> Result<(), Error> {
        let full = format!("{}{}", self.prefix(), pattern);
        self.engine.add_route(method, &full, handlers)
    }
}

/// A frozen engine shared by the server, replaceable as a whole.
///
/// Requests load the current engine once and finish on it even if a new
/// one is published mid-flight.
#[derive(Clone)]
pub struct EngineHandle {
    current: Arc<ArcSwap<Engine>>,
}

impl EngineHandle {
    pub fn new(engine: Engine) -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(engine)),
        }
    }

    /// The engine serving new requests.
    pub fn load(&self) -> Arc<Engine> {
        self.current.load_full()
    }

    /// Atomically publish a fully built replacement engine.
    pub fn replace(&self, engine: Engine) {
        self.current.store(Arc::new(engine));
    }
}

impl From<Engine> for EngineHandle {
    fn from(engine: Engine) -> Self {
        Self::new(engine)
    }
}

fn not_found(error: RouteError) -> Handler {
    handler(move |c| c.reject(error.clone()))
}

/// Default error renderer: `{"message": ...}` with the error's status.
fn render_error(c: &mut Context, error: &Error) {
    c.json(
        error.status(),
        &serde_json::json!({ "message": error.to_string() }),
    );
}

/// Join two path fragments with exactly one `/` between them.
fn join_paths(base: &str, rest: &str) -> String {
    let base = base.trim_end_matches('/');
    let rest = rest.trim_start_matches('/');
    if base.starts_with('/') {
        format!("{}/{}", base, rest)
    } else {
        format!("/{}{}{}", base, if base.is_empty() { "" } else { "/" }, rest)
    }
}
