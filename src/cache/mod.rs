//! Query result cache keyed by the literal statement text.
//!
//! Caching is best-effort: a store that cannot be read or written behaves like
//! an empty cache and never fails the query that consulted it.

mod disk;
mod store;

pub use disk::DiskStore;
pub use store::{CacheStore, MemoryStore};

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::CacheConfig;
use crate::results::{ColumnInfo, ResultSet};
use crate::types::RowValues;

/// What a cache hit restores into the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CachedValue {
    Mutation {
        rows_affected: usize,
        insert_id: Option<i64>,
    },
    Read {
        columns: Vec<ColumnInfo>,
        rows: Vec<Vec<RowValues>>,
    },
}

impl CachedValue {
    #[must_use]
    pub fn from_result_set(result_set: &ResultSet) -> Self {
        CachedValue::Read {
            columns: result_set.columns().to_vec(),
            rows: result_set.to_value_rows(),
        }
    }

    /// Value returned by `query()` for this entry.
    #[must_use]
    pub fn return_value(&self) -> usize {
        match self {
            CachedValue::Mutation { rows_affected, .. } => *rows_affected,
            CachedValue::Read { rows, .. } => rows.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub fingerprint: String,
    pub value: CachedValue,
    pub created_at: DateTime<Utc>,
}

/// Cache key for a statement. Bound parameters are part of the key.
#[must_use]
pub fn fingerprint(query: &str, params: &[RowValues]) -> String {
    if params.is_empty() {
        return query.to_string();
    }
    let encoded = serde_json::to_string(params).unwrap_or_else(|_| format!("{params:?}"));
    format!("{query}\u{1f}{encoded}")
}

/// TTL and read/insert policy on top of a [`CacheStore`].
pub struct QueryCache {
    store: Box<dyn CacheStore>,
    ttl: Duration,
    cache_queries: bool,
    cache_inserts: bool,
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("ttl", &self.ttl)
            .field("cache_queries", &self.cache_queries)
            .field("cache_inserts", &self.cache_inserts)
            .finish_non_exhaustive()
    }
}

impl QueryCache {
    /// Build a cache from config, on disk when a directory is set.
    #[must_use]
    pub fn from_config(config: &CacheConfig) -> Self {
        let store: Box<dyn CacheStore> = match &config.directory {
            Some(dir) => Box::new(DiskStore::new(dir.clone())),
            None => Box::new(MemoryStore::new()),
        };
        tracing::info!(
            ttl_seconds = config.ttl.as_secs(),
            cache_queries = config.cache_queries,
            cache_inserts = config.cache_inserts,
            directory = ?config.directory,
            "initializing query cache"
        );
        Self::with_store(store, config)
    }

    #[must_use]
    pub fn with_store(store: Box<dyn CacheStore>, config: &CacheConfig) -> Self {
        Self {
            store,
            ttl: config.ttl,
            cache_queries: config.cache_queries,
            cache_inserts: config.cache_inserts,
        }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Whether statements of this kind are cached at all.
    #[must_use]
    pub fn applies_to(&self, is_mutation: bool) -> bool {
        if is_mutation {
            self.cache_inserts
        } else {
            self.cache_queries
        }
    }

    /// Fresh entry for `fingerprint`, or `None` on miss, expiry or store failure.
    /// Expired entries are evicted.
    pub fn get(&mut self, fingerprint: &str) -> Option<CachedValue> {
        let entry = match self.store.get(fingerprint) {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(e) => {
                tracing::debug!(error = %e, "query cache read failed, treating as miss");
                return None;
            }
        };
        if self.is_expired(&entry, Utc::now()) {
            if let Err(e) = self.store.remove(fingerprint) {
                tracing::debug!(error = %e, "query cache eviction failed");
            }
            return None;
        }
        Some(entry.value)
    }

    /// Store a value unless the policy excludes it. Store failures are swallowed.
    pub fn put(&mut self, fingerprint: &str, value: CachedValue, is_mutation: bool) {
        if !self.applies_to(is_mutation) {
            return;
        }
        let entry = CacheEntry {
            fingerprint: fingerprint.to_string(),
            value,
            created_at: Utc::now(),
        };
        if let Err(e) = self.store.put(entry) {
            tracing::debug!(error = %e, "query cache write failed, skipping");
        }
    }

    /// Store a prebuilt entry as-is, keeping its timestamp.
    pub fn put_entry(&mut self, entry: CacheEntry) {
        if let Err(e) = self.store.put(entry) {
            tracing::debug!(error = %e, "query cache write failed, skipping");
        }
    }

    pub fn clear(&mut self) {
        if let Err(e) = self.store.clear() {
            tracing::debug!(error = %e, "query cache clear failed");
        }
    }

    fn is_expired(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        // entries stamped in the future count as fresh
        (now - entry.created_at)
            .to_std()
            .is_ok_and(|age| age > self.ttl)
    }
}
