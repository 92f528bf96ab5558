//! Secret storage abstraction.
//!
//! This module provides:
//! - [`Secret`] - A wrapper for sensitive values that prevents accidental logging
//! - [`SecretStore`] - Trait for secret storage backends
//! - [`MemoryStore`] - In-memory implementation for testing
//! - [`KeyringStore`] - OS keyring implementation (with `keyring-store` feature)
//! - [`UnavailableStore`] - Stand-in used when no backend exists on this host
//! - [`create_store`] - Helper to select backend based on availability
//!
//! # Storage Key Convention
//!
//! Entries are addressed by `(namespace, key)`, where the namespace is the
//! service identifier. A service owns two entries: `(service, "username")`
//! holding the login name, and `(service, <login name>)` holding the password.
//!
//! # Example
//!
//! ```
//! use dbcred_core::store::{MemoryStore, Secret, SecretStore};
//!
//! let store = MemoryStore::new();
//! store.set("db.example.com", "username", &Secret::new("alice")).unwrap();
//!
//! let retrieved = store.get("db.example.com", "username").unwrap();
//! assert_eq!(retrieved.unwrap().expose(), "alice");
//! ```

use thiserror::Error;
use zeroize::Zeroizing;

mod memory;
#[cfg(feature = "keyring-store")]
mod keyring;

pub use memory::MemoryStore;
#[cfg(feature = "keyring-store")]
pub use keyring::KeyringStore;

/// A secret value that prevents accidental exposure in logs.
///
/// The inner value is only accessible via [`expose()`](Secret::expose).
/// Debug and Display implementations show `[REDACTED]` instead of the value,
/// and the backing memory is zeroed when the secret is dropped.
#[derive(Clone)]
pub struct Secret(Zeroizing<String>);

impl Secret {
    /// Create a new secret from a string value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    /// Expose the secret value.
    ///
    /// Use sparingly and never log the result.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Secret {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Secret {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secret([REDACTED])")
    }
}

impl std::fmt::Display for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl PartialEq for Secret {
    fn eq(&self, other: &Self) -> bool {
        *self.0 == *other.0
    }
}

impl Eq for Secret {}

/// Error type for secret store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No secret store backend is usable on this host.
    ///
    /// This is distinct from an absent entry, which is `Ok(None)`.
    #[error("secret store unavailable: {message}")]
    Unavailable { message: String },

    /// The storage backend is present but the operation failed.
    #[error("backend error: {message}")]
    Backend { message: String },
}

impl StoreError {
    /// Whether this error means the whole store is missing.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

/// Abstraction over secret storage backends.
///
/// Implementations include:
/// - [`MemoryStore`] - In-memory storage for testing
/// - [`KeyringStore`] (with `keyring-store` feature) - OS keyring
/// - [`UnavailableStore`] - Always reports [`StoreError::Unavailable`]
pub trait SecretStore {
    /// Retrieve the value stored under `(namespace, key)`.
    ///
    /// Returns `Ok(None)` if the entry doesn't exist.
    fn get(&self, namespace: &str, key: &str) -> Result<Option<Secret>, StoreError>;

    /// Store a value under `(namespace, key)`.
    ///
    /// Overwrites any existing value.
    fn set(&self, namespace: &str, key: &str, secret: &Secret) -> Result<(), StoreError>;
}

impl<S: SecretStore + ?Sized> SecretStore for Box<S> {
    fn get(&self, namespace: &str, key: &str) -> Result<Option<Secret>, StoreError> {
        (**self).get(namespace, key)
    }

    fn set(&self, namespace: &str, key: &str, secret: &Secret) -> Result<(), StoreError> {
        (**self).set(namespace, key, secret)
    }
}

impl<S: SecretStore + ?Sized> SecretStore for std::sync::Arc<S> {
    fn get(&self, namespace: &str, key: &str) -> Result<Option<Secret>, StoreError> {
        (**self).get(namespace, key)
    }

    fn set(&self, namespace: &str, key: &str, secret: &Secret) -> Result<(), StoreError> {
        (**self).set(namespace, key, secret)
    }
}

/// A store for hosts without any secret backend.
///
/// Every call fails with [`StoreError::Unavailable`], which routes the
/// resolver onto its prompt-without-persist path.
#[derive(Debug, Clone)]
pub struct UnavailableStore {
    reason: String,
}

impl UnavailableStore {
    /// Create an unavailable store carrying the reason the backend is missing.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl SecretStore for UnavailableStore {
    fn get(&self, _namespace: &str, _key: &str) -> Result<Option<Secret>, StoreError> {
        Err(StoreError::Unavailable {
            message: self.reason.clone(),
        })
    }

    fn set(&self, _namespace: &str, _key: &str, _secret: &Secret) -> Result<(), StoreError> {
        Err(StoreError::Unavailable {
            message: self.reason.clone(),
        })
    }
}

/// Create a secret store with automatic backend selection.
///
/// - If `prefer_keyring` is `true` and the `keyring-store` feature is enabled,
///   attempts to create a [`KeyringStore`].
/// - Otherwise, or if the keyring cannot be reached, returns an
///   [`UnavailableStore`] so credentials are prompted for but never persisted.
pub fn create_store(prefer_keyring: bool) -> Box<dyn SecretStore> {
    #[cfg(feature = "keyring-store")]
    if prefer_keyring {
        match KeyringStore::try_new() {
            Ok(store) => {
                tracing::debug!("Using OS keyring for secret storage");
                return Box::new(store);
            }
            Err(e) => {
                tracing::warn!("{}", e);
                tracing::warn!("credentials cannot be saved");
                return Box::new(UnavailableStore::new(e.to_string()));
            }
        }
    }

    #[cfg(not(feature = "keyring-store"))]
    if prefer_keyring {
        tracing::warn!(
            "Keyring storage requested but keyring-store feature not enabled. \
             Credentials will be prompted for and not saved."
        );
    }

    Box::new(UnavailableStore::new("no keyring backend configured"))
}
