//! OS keyring-backed secret storage implementation.

use keyring::Entry;

use super::{Secret, SecretStore, StoreError};

/// OS keyring-backed secret store.
///
/// This store uses the platform's native keyring service:
/// - macOS: Keychain
/// - Linux: kernel keyutils
/// - Windows: Credential Manager
///
/// # Storage Key Format
///
/// The namespace is the keyring *service* and the key is the keyring *user*,
/// so `(db.example.com, "username")` and `(db.example.com, "alice")` are two
/// independent keyring entries.
///
/// # Example
///
/// ```rust,ignore
/// use dbcred_core::store::{KeyringStore, SecretStore, Secret};
///
/// let store = KeyringStore::try_new().unwrap();
/// store.set("db.example.com", "alice", &Secret::new("secret1")).unwrap();
/// ```
#[derive(Debug, Default)]
pub struct KeyringStore {
    _private: (),
}

impl KeyringStore {
    /// Try to create a new keyring store.
    ///
    /// Probes the platform backend with a read of a sentinel entry and returns
    /// [`StoreError::Unavailable`] if no backend can be reached.
    pub fn try_new() -> Result<Self, StoreError> {
        let probe = Entry::new("dbcred", "__availability_check__").map_err(|e| {
            StoreError::Unavailable {
                message: format!("keyring backend not available: {}", e),
            }
        })?;

        match probe.get_password() {
            Ok(_) | Err(keyring::Error::NoEntry) => Ok(Self { _private: () }),
            Err(e) => Err(StoreError::Unavailable {
                message: format!("keyring backend not available: {}", e),
            }),
        }
    }

    /// Create a keyring entry for the given namespace and key.
    fn create_entry(&self, namespace: &str, key: &str) -> Result<Entry, StoreError> {
        Entry::new(namespace, key).map_err(map_keyring_error)
    }
}

fn map_keyring_error(err: keyring::Error) -> StoreError {
    match err {
        keyring::Error::NoStorageAccess(e) => StoreError::Unavailable {
            message: format!("cannot access keyring storage: {}", e),
        },
        keyring::Error::PlatformFailure(e) => StoreError::Backend {
            message: format!("platform keyring failure: {}", e),
        },
        keyring::Error::Invalid(attr, reason) => StoreError::Backend {
            message: format!("invalid keyring attribute {}: {}", attr, reason),
        },
        keyring::Error::Ambiguous(_) => StoreError::Backend {
            message: "ambiguous keyring entry".to_string(),
        },
        e => StoreError::Backend {
            message: format!("keyring error: {}", e),
        },
    }
}

impl SecretStore for KeyringStore {
    fn get(&self, namespace: &str, key: &str) -> Result<Option<Secret>, StoreError> {
        let entry = self.create_entry(namespace, key)?;

        match entry.get_password() {
            Ok(password) => {
                tracing::debug!(namespace, key, "found keyring entry");
                Ok(Some(Secret::new(password)))
            }
            Err(keyring::Error::NoEntry) => {
                tracing::debug!(namespace, key, "no keyring entry");
                Ok(None)
            }
            Err(e) => Err(map_keyring_error(e)),
        }
    }

    fn set(&self, namespace: &str, key: &str, secret: &Secret) -> Result<(), StoreError> {
        let entry = self.create_entry(namespace, key)?;

        entry
            .set_password(secret.expose())
            .map_err(map_keyring_error)?;
        tracing::debug!(namespace, key, "stored keyring entry");
        Ok(())
    }
}
