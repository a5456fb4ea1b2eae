//! Environment configuration.
//!
//! All configuration comes from environment variables and is validated once at
//! startup. The result is a plain [`Config`] value that is passed to every
//! component that needs it; nothing reads the environment afterwards.
//!
//! | Variable | Required | Default |
//! |----------|----------|---------|
//! | `GITHUB_APP_ID` | yes | |
//! | `GITHUB_WEBHOOK_SECRET` | yes | |
//! | `GITHUB_PRIVATE_KEY_PATH` | no | |
//! | `GITHUB_API_URL` | no | `https://api.github.com` |
//! | `PORT` | no | `4000` |
//! | `LOG_LEVEL` | no | `info` |
//! | `APP_ENV` | no | `development` |

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::types::AppId;

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 4000;

/// Default GitHub REST API base URL.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Runtime environment. Selects the log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "development" => Ok(Environment::Development),
            "production" => Ok(Environment::Production),
            "test" => Ok(Environment::Test),
            other => Err(format!(
                "expected one of development, production, test; got {other:?}"
            )),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Test => "test",
        })
    }
}

/// Log verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Fatal,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
    Silent,
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "fatal" => Ok(LogLevel::Fatal),
            "error" => Ok(LogLevel::Error),
            "warn" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            "silent" => Ok(LogLevel::Silent),
            other => Err(format!(
                "expected one of fatal, error, warn, info, debug, trace, silent; got {other:?}"
            )),
        }
    }
}

/// GitHub App settings.
#[derive(Clone, PartialEq, Eq)]
pub struct GitHubConfig {
    pub app_id: AppId,
    pub webhook_secret: String,
    pub private_key_path: Option<PathBuf>,
    pub api_url: String,
}

impl fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("app_id", &self.app_id)
            .field("webhook_secret", &"<redacted>")
            .field("private_key_path", &self.private_key_path)
            .field("api_url", &self.api_url)
            .finish()
    }
}

/// Validated process configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub environment: Environment,
    pub log_level: LogLevel,
    pub github: GitHubConfig,
}

impl Config {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset. All problems are collected and
    /// returned together in a single `Config` error, whose `variables` detail
    /// lists the offending variable names.
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let mut problems: Vec<(&'static str, String)> = Vec::new();

        let environment = match get("APP_ENV") {
            None => Environment::default(),
            Some(v) => v.parse().unwrap_or_else(|e| {
                problems.push(("APP_ENV", e));
                Environment::default()
            }),
        };

        let port = match get("PORT") {
            None => DEFAULT_PORT,
            Some(v) => parse_port(&v).unwrap_or_else(|e| {
                problems.push(("PORT", e));
                DEFAULT_PORT
            }),
        };

        let log_level = match get("LOG_LEVEL") {
            None => LogLevel::default(),
            Some(v) => v.parse().unwrap_or_else(|e| {
                problems.push(("LOG_LEVEL", e));
                LogLevel::default()
            }),
        };

        let webhook_secret = get("GITHUB_WEBHOOK_SECRET").unwrap_or_else(|| {
            problems.push(("GITHUB_WEBHOOK_SECRET", "Missing GitHub webhook secret".into()));
            String::new()
        });

        let app_id = match get("GITHUB_APP_ID") {
            None => {
                problems.push(("GITHUB_APP_ID", "Missing GitHub App ID".into()));
                AppId(0)
            }
            Some(v) => match v.trim().parse::<u64>() {
                Ok(id) if id > 0 => AppId(id),
                _ => {
                    problems.push(("GITHUB_APP_ID", format!("expected a positive integer; got {v:?}")));
                    AppId(0)
                }
            },
        };

        let private_key_path = get("GITHUB_PRIVATE_KEY_PATH").map(PathBuf::from);
        let api_url = get("GITHUB_API_URL")
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        if !problems.is_empty() {
            let summary = problems
                .iter()
                .map(|(var, problem)| format!("{var}: {problem}"))
                .collect::<Vec<_>>()
                .join("; ");
            let variables: Vec<&str> = problems.iter().map(|(var, _)| *var).collect();
            return Err(Error::config(format!("invalid environment configuration: {summary}"))
                .with_detail("variables", variables));
        }

        Ok(Config {
            port,
            environment,
            log_level,
            github: GitHubConfig {
                app_id,
                webhook_secret,
                private_key_path,
                api_url,
            },
        })
    }
}

/// Parses a port number. Only ASCII digits are accepted.
fn parse_port(value: &str) -> std::result::Result<u16, String> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("expected a numeric port; got {value:?}"));
    }
    value
        .parse()
        .map_err(|_| format!("port out of range: {value}"))
}
