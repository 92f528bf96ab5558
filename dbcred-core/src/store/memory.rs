//! In-memory secret storage implementation.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::{Secret, SecretStore, StoreError};

/// In-memory secret store for testing and development.
///
/// This store is not persistent; data is lost when the process exits.
pub struct MemoryStore {
    data: RwLock<HashMap<(String, String), Secret>>,
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
        }
    }

    /// Create a memory store with initial `(namespace, key, value)` entries.
    pub fn with_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str, &'a str)>) -> Self {
        let data = entries
            .into_iter()
            .map(|(ns, key, value)| ((ns.to_string(), key.to_string()), Secret::new(value)))
            .collect();
        Self {
            data: RwLock::new(data),
        }
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("entries", &self.len())
            .finish()
    }
}

impl SecretStore for MemoryStore {
    fn get(&self, namespace: &str, key: &str) -> Result<Option<Secret>, StoreError> {
        let data = self.data.read();
        Ok(data.get(&(namespace.to_string(), key.to_string())).cloned())
    }

    fn set(&self, namespace: &str, key: &str, secret: &Secret) -> Result<(), StoreError> {
        let mut data = self.data.write();
        data.insert((namespace.to_string(), key.to_string()), secret.clone());
        Ok(())
    }
}
