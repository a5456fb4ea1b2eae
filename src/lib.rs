//! Famiglio - a GitHub App backend.
//!
//! Authenticates as a GitHub App (JWTs and installation tokens) and accepts
//! signed webhook deliveries, dispatching them to registered handlers.

pub mod config;
pub mod error;
pub mod github;
pub mod handlers;
pub mod server;
pub mod telemetry;
pub mod types;
pub mod webhooks;

pub use error::{Error, ErrorKind, Result};
