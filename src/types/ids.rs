//! Newtype wrappers for GitHub identifiers.
//!
//! These types prevent accidental mixing of different ID types (e.g., passing an
//! app ID where an installation ID is expected).

use serde::{Deserialize, Serialize};
use std::fmt;

/// A GitHub App ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppId(pub u64);

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for AppId {
    fn from(n: u64) -> Self {
        AppId(n)
    }
}

/// The ID of one installation of the app on an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstallationId(pub u64);

impl fmt::Display for InstallationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for InstallationId {
    fn from(n: u64) -> Self {
        InstallationId(n)
    }
}

/// A GitHub webhook delivery ID (the `X-GitHub-Delivery` header).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeliveryId(pub String);

impl DeliveryId {
    pub fn new(s: impl Into<String>) -> Self {
        DeliveryId(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeliveryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for DeliveryId {
    fn from(s: String) -> Self {
        DeliveryId(s)
    }
}

impl From<&str> for DeliveryId {
    fn from(s: &str) -> Self {
        DeliveryId(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod app_id {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn serializes_as_bare_number(n: u64) {
                let json = serde_json::to_string(&AppId(n)).unwrap();
                prop_assert_eq!(json, n.to_string());
            }

            #[test]
            fn display_format(n: u64) {
                prop_assert_eq!(format!("{}", AppId(n)), n.to_string());
            }
        }
    }

    mod installation_id {
        use super::*;

        #[test]
        fn deserializes_from_payload_number() {
            let id: InstallationId = serde_json::from_str("12345678").unwrap();
            assert_eq!(id, InstallationId(12345678));
            assert_eq!(id.to_string(), "12345678");
        }
    }

    mod delivery_id {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn display_matches_inner(s in "[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}") {
                let id = DeliveryId::new(&s);
                prop_assert_eq!(id.as_str(), s.as_str());
                prop_assert_eq!(id.to_string(), s);
            }
        }
    }
}
