//! Domain model types for dbcred.
//!
//! This module defines the core types used throughout dbcred:
//! - [`ServiceId`] - Namespace key for a remote resource (hostname, connection name)
//! - [`Credential`] - A resolved username/password pair
//! - [`USERNAME_KEY`] - Sentinel key under which the username is stored

use std::fmt;

use crate::store::Secret;

/// Store key under which the resolved username of a service is kept.
///
/// The password is stored under the username itself, so a service maps to
/// exactly two entries: `(service, "username")` and `(service, <username>)`.
pub const USERNAME_KEY: &str = "username";

/// Identifier for a remote resource (e.g., "db.example.com", "reporting-dsn").
///
/// Service IDs are opaque and used verbatim as the secret store namespace.
///
/// # Examples
///
/// ```
/// use dbcred_core::ServiceId;
///
/// let server = ServiceId::new("db.example.com");
/// assert_eq!(server.as_str(), "db.example.com");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceId(String);

impl ServiceId {
    /// Create a new service ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the service ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ServiceId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ServiceId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// A resolved username/password pair.
///
/// Only ever a transient value: the store keeps the two halves as separate
/// entries and nothing caches the pair between calls.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    /// Login name.
    pub username: String,

    /// Login password.
    pub password: Secret,
}

impl Credential {
    /// Create a new credential.
    pub fn new(username: impl Into<String>, password: impl Into<Secret>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &self.password)
            .finish()
    }
}
