//! Path-trie HTTP request router.
//!
//! Patterns are `/`-separated segments: literals match exactly, `:name`
//! captures one segment and `*name` captures the remainder of the path.
//! One trie is kept per HTTP method; lookups prefer static segments over
//! parameters and parameters over wildcards, backtracking when a branch
//! dead-ends.

pub mod error;
pub mod params;
pub mod pattern;
pub mod router;
pub mod trie;

pub use error::RouteError;
pub use params::Params;
pub use pattern::Pattern;
pub use router::{RouteMatch, Router};
