//! Application error type.
//!
//! Errors are a single tagged type rather than a hierarchy: every failure
//! carries an [`ErrorKind`] discriminant, a human-readable message, and a
//! free-form details map used for structured logging. Callers match on
//! [`Error::kind`].
//!
//! | Kind | Produced by | Policy |
//! |------|-------------|--------|
//! | `Config` | [`crate::config`] | Aborts startup |
//! | `Auth` | [`crate::github`] credential issuance | Returned to the caller, which decides whether to retry |
//! | `Internal` | Anything unanticipated | Reported, mapped to HTTP 500 |
//!
//! Webhook handler failures are not represented here; they are isolated per
//! handler as [`crate::webhooks::HandlerError`].

use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt;

use serde_json::Value;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Discriminant for [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Missing or invalid configuration.
    Config,

    /// Failure to issue an app JWT or an installation token.
    Auth,

    /// Anything unanticipated.
    Internal,
}

impl ErrorKind {
    /// Stable machine-friendly code, used as a log field.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Config => "CONFIG_ERROR",
            ErrorKind::Auth => "AUTH_ERROR",
            ErrorKind::Internal => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// An application error.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
    details: BTreeMap<String, Value>,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl Error {
    /// Creates an error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Error {
            kind,
            message: message.into(),
            details: BTreeMap::new(),
            source: None,
        }
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    /// Creates an authentication error.
    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Auth, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Attaches a detail entry.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Attaches the underlying cause.
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> &BTreeMap<String, Value> {
        &self.details
    }

    /// Returns a single detail entry.
    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details.get(key)
    }

    /// Returns true if retrying the failed operation can succeed.
    ///
    /// Only errors explicitly marked with a `transient: true` detail qualify.
    pub fn is_transient(&self) -> bool {
        matches!(self.detail("transient"), Some(Value::Bool(true)))
    }
}

/// Reports an error to the process-wide log.
///
/// This is the single sink for errors that cannot be returned to anyone
/// (failures behind an already-sent HTTP response, startup failures).
pub fn report(err: &Error) {
    let details = serde_json::to_string(&err.details).unwrap_or_default();
    let mut causes = Vec::new();
    let mut source = StdError::source(err);
    while let Some(cause) = source {
        causes.push(cause.to_string());
        source = cause.source();
    }

    tracing::error!(
        kind = %err.kind,
        details = %details,
        causes = ?causes,
        "{}",
        err.message
    );
}
