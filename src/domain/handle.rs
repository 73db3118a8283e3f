//! Type-safe connection handle.
//!
//! [`ConnectionHandle`] is a newtype around the opaque string identifying one
//! live duplex connection, so that handles cannot be confused with room keys
//! or actor identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier of one live connection.
///
/// Generated by the owning process when a socket is upgraded (UUID v4 text)
/// and invalidated on disconnect. Unique across every namespace, so it can
/// be stored in the shared registry without a namespace qualifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionHandle(String);

impl ConnectionHandle {
    /// Creates a new random handle.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Returns the handle as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ConnectionHandle {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ConnectionHandle {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn new_generates_unique_handles() {
        assert_ne!(ConnectionHandle::new(), ConnectionHandle::new());
    }

    #[test]
    fn display_matches_inner_string() {
        let handle = ConnectionHandle::from("abc123");
        assert_eq!(handle.to_string(), "abc123");
        assert_eq!(handle.as_str(), "abc123");
    }

    #[test]
    fn serializes_as_bare_string() {
        let handle = ConnectionHandle::from("h-1");
        let Ok(json) = serde_json::to_string(&handle) else {
            panic!("serialization failed");
        };
        assert_eq!(json, "\"h-1\"");
    }
}
