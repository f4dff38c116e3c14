//! HTTP front-end for the submission gate.

mod routes;
mod server;

pub use routes::{HealthCheckResponse, routes};
pub use server::{ServerConfig, serve, serve_on};
