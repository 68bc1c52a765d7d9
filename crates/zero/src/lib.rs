//! zero: a small HTTP web framework.
//!
//! Routes are registered on an [`Engine`], optionally inside
//! [`RouterGroup`]s that share a path prefix and middleware. Each request
//! runs a dispatch chain: the middleware of every group whose prefix starts
//! the path, then the matched route's handlers. Middleware wraps the rest of
//! the chain by calling [`Context::next`] and can stop it with
//! [`Context::abort`].
//!
//! ```ignore
//! use zero::{handler, Engine, Routes, StatusCode};
//!
//! let mut engine = Engine::with_defaults();
//! engine.get("/hello/:name", [handler(|c| {
//!     let greeting = format!("hello {}", c.param("name"));
//!     c.string(StatusCode::OK, greeting);
//! })])?;
//!
//! let mut v1 = engine.group("/v1");
//! v1.use_middleware([handler(|c| c.set_header("x-api", "v1"))]);
//! v1.get("/ping", [handler(|c| c.string(StatusCode::OK, "pong"))])?;
//!
//! engine.run("127.0.0.1:8080".parse()?).await?;
//! ```

pub mod chain;
pub mod context;
pub mod engine;
pub mod error;
pub mod middleware;
pub mod server;
pub mod static_files;

pub use chain::{handler, DispatchChain, Handler};
pub use context::{Context, ErrorRenderer};
pub use engine::{Engine, EngineHandle, RouterGroup, Routes};
pub use error::Error;
pub use server::ServerConfig;
pub use http::{Method, StatusCode};
pub use zero_router::{Params, RouteError};
