//! GitHub App authentication.
//!
//! This module issues the two kinds of credentials a GitHub App uses:
//! - App JWTs (RS256, issuer = app ID), for app-level API calls
//! - Installation tokens, exchanged from a JWT, for calls on behalf of one
//!   installation
//!
//! Credential issuance runs independently of webhook handling; handlers call
//! into it when they need to talk to the API.

pub mod auth;
pub mod error;
pub mod installation;
pub mod retry;

pub use auth::{AppCredentials, Claims, issue_app_token, read_file_safe};
pub use error::Transience;
pub use installation::{GitHubApp, InstallationToken, issue_installation_token};
pub use retry::{RetryConfig, retry_with_backoff};
