use std::collections::HashMap;

use super::CacheEntry;
use crate::error::SqlDbalError;

/// Key-value storage behind the query cache.
///
/// Implementations only store and fetch; expiry is decided by
/// [`QueryCache`](super::QueryCache).
pub trait CacheStore: Send {
    /// Fetch the entry stored under `fingerprint`, `Ok(None)` when absent.
    ///
    /// # Errors
    /// Returns `SqlDbalError` when the backing storage cannot be read.
    fn get(&self, fingerprint: &str) -> Result<Option<CacheEntry>, SqlDbalError>;

    /// Store or overwrite an entry.
    ///
    /// # Errors
    /// Returns `SqlDbalError` when the backing storage cannot be written.
    fn put(&mut self, entry: CacheEntry) -> Result<(), SqlDbalError>;

    /// # Errors
    /// Returns `SqlDbalError` when the backing storage cannot be modified.
    fn remove(&mut self, fingerprint: &str) -> Result<(), SqlDbalError>;

    /// # Errors
    /// Returns `SqlDbalError` when the backing storage cannot be modified.
    fn clear(&mut self) -> Result<(), SqlDbalError>;
}

/// In-process store, lost when the engine is dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, CacheEntry>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CacheStore for MemoryStore {
    fn get(&self, fingerprint: &str) -> Result<Option<CacheEntry>, SqlDbalError> {
        Ok(self.entries.get(fingerprint).cloned())
    }

    fn put(&mut self, entry: CacheEntry) -> Result<(), SqlDbalError> {
        self.entries.insert(entry.fingerprint.clone(), entry);
        Ok(())
    }

    fn remove(&mut self, fingerprint: &str) -> Result<(), SqlDbalError> {
        self.entries.remove(fingerprint);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), SqlDbalError> {
        self.entries.clear();
        Ok(())
    }
}
