//! Transport layer for docgate.
//!
//! HTTP via axum, for callers that cannot link the library directly.

pub mod http;

pub use http::{ServerConfig, serve, serve_on};
