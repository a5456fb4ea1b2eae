//! GitHub App credentials and app-level JWTs.
//!
//! A GitHub App authenticates as itself with a short-lived RS256 JWT whose
//! issuer is the app ID. GitHub rejects JWTs valid for more than ten minutes,
//! and compares `iat` against its own clock, so `iat` is backdated by
//! [`CLOCK_DRIFT_ALLOWANCE`] and the total validity stays within
//! [`MAX_JWT_VALIDITY`].

use std::fmt;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::GitHubConfig;
use crate::error::{Error, Result};
use crate::types::AppId;

/// Upper bound GitHub accepts between `iat` and `exp`.
pub const MAX_JWT_VALIDITY: Duration = Duration::minutes(10);

/// How far `iat` is backdated.
pub const CLOCK_DRIFT_ALLOWANCE: Duration = Duration::seconds(60);

/// How long after issuance a JWT expires.
pub const JWT_LIFETIME: Duration = Duration::minutes(9);

/// Claims of an app-level JWT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Issued-at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
    /// Issuer: the app ID.
    pub iss: String,
}

impl Claims {
    /// Builds the claims for a JWT issued at `now`.
    pub fn new(app_id: AppId, now: DateTime<Utc>) -> Self {
        Claims {
            iat: (now - CLOCK_DRIFT_ALLOWANCE).timestamp(),
            exp: (now + JWT_LIFETIME).timestamp(),
            iss: app_id.to_string(),
        }
    }
}

/// Everything needed to authenticate as the app and verify its webhooks.
///
/// Sourced once from configuration and immutable afterwards.
#[derive(Clone)]
pub struct AppCredentials {
    pub app_id: AppId,
    /// PEM-encoded RSA private key, if one was configured and readable.
    pub private_key: Option<String>,
    pub webhook_secret: String,
}

impl AppCredentials {
    pub fn new(
        app_id: AppId,
        private_key: Option<String>,
        webhook_secret: impl Into<String>,
    ) -> Self {
        AppCredentials {
            app_id,
            private_key,
            webhook_secret: webhook_secret.into(),
        }
    }

    /// Builds credentials from configuration, reading the private key file.
    ///
    /// A missing or unreadable key file is not an error here: the app can still
    /// receive webhooks, and [`issue_app_token`] reports the missing key when a
    /// token is actually requested.
    pub fn from_config(config: &GitHubConfig) -> Self {
        let private_key = config.private_key_path.as_deref().and_then(|path| {
            let key = read_file_safe(path);
            if key.is_none() {
                warn!(path = %path.display(), "GitHub private key file could not be read");
            }
            key
        });

        AppCredentials::new(config.app_id, private_key, config.webhook_secret.clone())
    }
}

impl fmt::Debug for AppCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppCredentials")
            .field("app_id", &self.app_id)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("webhook_secret", &"<redacted>")
            .finish()
    }
}

/// Reads a UTF-8 file, returning `None` if it does not exist or cannot be read.
pub fn read_file_safe(path: &Path) -> Option<String> {
    fs::read_to_string(path).ok()
}

/// Issues an app-level JWT valid from `now`.
///
/// # Errors
///
/// Returns an `Auth` error if the private key is absent or is not a valid
/// RSA PEM key.
pub fn issue_app_token(credentials: &AppCredentials, now: DateTime<Utc>) -> Result<String> {
    let pem = credentials.private_key.as_deref().ok_or_else(|| {
        Error::auth("Missing GitHub private key for App authentication")
            .with_detail("app_id", credentials.app_id.0)
    })?;

    let key = EncodingKey::from_rsa_pem(pem.as_bytes()).map_err(|e| {
        Error::auth("Invalid GitHub App private key")
            .with_detail("app_id", credentials.app_id.0)
            .with_source(e)
    })?;

    let claims = Claims::new(credentials.app_id, now);
    jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key).map_err(|e| {
        Error::auth("Failed to generate App JWT")
            .with_detail("app_id", credentials.app_id.0)
            .with_source(e)
    })
}
