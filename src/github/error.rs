//! Classification of GitHub API failures.
//!
//! Credential issuance failures are surfaced as [`crate::Error`] of kind
//! `Auth`. Whether a retry can help is recorded in the error's details so the
//! caller (see [`super::retry`]) can decide:
//!
//! - **Transient**: HTTP 5xx, HTTP 429, HTTP 403 with rate-limit wording,
//!   transport failures (connection, DNS, timeouts)
//! - **Permanent**: every other HTTP 4xx, malformed responses

use crate::error::Error;
use crate::types::InstallationId;

/// Whether an API failure is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transience {
    /// Safe to retry with backoff.
    Transient,

    /// Retrying will not change the outcome.
    Permanent,
}

impl Transience {
    pub fn is_transient(&self) -> bool {
        matches!(self, Transience::Transient)
    }
}

/// Extracts the HTTP status of a failed API call, if the server answered.
pub fn status_code(err: &octocrab::Error) -> Option<u16> {
    match err {
        octocrab::Error::GitHub { source, .. } => Some(source.status_code.as_u16()),
        _ => None,
    }
}

/// Categorizes an octocrab error.
pub fn classify(err: &octocrab::Error) -> Transience {
    match err {
        octocrab::Error::GitHub { source, .. } => {
            classify_status(source.status_code.as_u16(), &source.message)
        }
        octocrab::Error::Hyper { .. } | octocrab::Error::Service { .. } => Transience::Transient,
        other if is_network_error(&other.to_string()) => Transience::Transient,
        _ => Transience::Permanent,
    }
}

/// Categorizes an HTTP status code together with GitHub's error message.
pub fn classify_status(status: u16, message: &str) -> Transience {
    match status {
        429 => Transience::Transient,
        403 if is_rate_limit_error(message) => Transience::Transient,
        500..=599 => Transience::Transient,
        _ => Transience::Permanent,
    }
}

/// Builds an `Auth` error for a failed installation-token exchange.
///
/// The error carries the installation ID, the HTTP status (when the server
/// answered), and the transience verdict.
pub fn installation_auth_error(
    message: impl Into<String>,
    installation_id: InstallationId,
    err: octocrab::Error,
) -> Error {
    let transience = classify(&err);
    let mut error = Error::auth(message)
        .with_detail("installation_id", installation_id.0)
        .with_detail("transient", transience.is_transient());
    if let Some(status) = status_code(&err) {
        error = error.with_detail("status", status);
    }
    error.with_source(err)
}

/// Checks if an error message indicates a rate limit.
fn is_rate_limit_error(message: &str) -> bool {
    let message_lower = message.to_lowercase();
    message_lower.contains("rate limit")
        || message_lower.contains("api rate")
        || message_lower.contains("secondary rate")
        || message_lower.contains("abuse detection")
}

/// Checks if an error message indicates a network-level error.
fn is_network_error(message: &str) -> bool {
    let message_lower = message.to_lowercase();
    message_lower.contains("timeout")
        || message_lower.contains("connection")
        || message_lower.contains("network")
        || message_lower.contains("dns")
        || message_lower.contains("timed out")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_transient() {
        assert_eq!(classify_status(500, "boom"), Transience::Transient);
        assert_eq!(classify_status(502, "Bad gateway"), Transience::Transient);
        assert_eq!(classify_status(503, ""), Transience::Transient);
    }

    #[test]
    fn rate_limits_are_transient() {
        assert_eq!(classify_status(429, ""), Transience::Transient);
        assert_eq!(
            classify_status(403, "API rate limit exceeded for installation"),
            Transience::Transient
        );
    }

    #[test]
    fn client_errors_are_permanent() {
        assert_eq!(classify_status(401, "Bad credentials"), Transience::Permanent);
        assert_eq!(classify_status(403, "Resource not accessible"), Transience::Permanent);
        assert_eq!(classify_status(404, "Not Found"), Transience::Permanent);
        assert_eq!(classify_status(422, "Validation Failed"), Transience::Permanent);
    }

    #[test]
    fn rate_limit_detection() {
        assert!(is_rate_limit_error("API rate limit exceeded"));
        assert!(is_rate_limit_error("secondary rate limit"));
        assert!(is_rate_limit_error("abuse detection mechanism"));
        assert!(!is_rate_limit_error("Permission denied"));
    }

    #[test]
    fn network_error_detection() {
        assert!(is_network_error("connection timeout"));
        assert!(is_network_error("DNS resolution failed"));
        assert!(is_network_error("request timed out"));
        assert!(!is_network_error("Not found"));
    }
}
