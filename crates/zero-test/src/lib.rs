//! Test harnesses for zero applications.
//!
//! Provides `TestServer`, which serves an [`Engine`](zero::Engine) in
//! process on a random port and offers HTTP request helpers.

#[cfg(test)]
pub mod cli;
pub mod server;

pub use server::{TestError, TestServer};
