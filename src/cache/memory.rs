//! In-process store client with per-entry expiry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry as MapEntry;

use crate::cache::params::{CacheOptions, ServerAddr};
use crate::cache::timeout::Expiry;
use crate::cache::{CacheError, ClientFactory, StoreClient};

struct CacheEntry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    /// An expiry beyond what `Instant` can represent never expires.
    fn new(value: Vec<u8>, expiry: Expiry) -> Self {
        Self {
            value,
            expires_at: expiry
                .as_duration()
                .and_then(|d| Instant::now().checked_add(d)),
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| Instant::now() >= exp)
    }
}

/// Store client keeping entries in a concurrent map.
///
/// Expired entries are treated as absent and dropped when next touched.
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<String, CacheEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl StoreClient for MemoryStore {
    async fn add(&self, key: &str, value: Vec<u8>, expiry: Expiry) -> Result<bool, CacheError> {
        match self.entries.entry(key.to_string()) {
            MapEntry::Occupied(mut occupied) => {
                if !occupied.get().is_expired() {
                    return Ok(false);
                }
                if expiry.is_immediate() {
                    occupied.remove();
                } else {
                    occupied.insert(CacheEntry::new(value, expiry));
                }
                Ok(true)
            }
            MapEntry::Vacant(vacant) => {
                if !expiry.is_immediate() {
                    vacant.insert(CacheEntry::new(value, expiry));
                }
                Ok(true)
            }
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, expiry: Expiry) -> Result<(), CacheError> {
        if expiry.is_immediate() {
            self.entries.remove(key);
        } else {
            self.entries
                .insert(key.to_string(), CacheEntry::new(value, expiry));
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired() {
                return Ok(Some(entry.value.clone()));
            }
        } else {
            return Ok(None);
        }
        // Entry expired, remove it
        self.entries.remove_if(key, |_, entry| entry.is_expired());
        Ok(None)
    }

    async fn get_many(&self, keys: &[String]) -> Result<HashMap<String, Vec<u8>>, CacheError> {
        let mut found = HashMap::with_capacity(keys.len());
        for key in keys {
            if let Some(value) = self.get(key).await? {
                found.insert(key.clone(), value);
            }
        }
        Ok(found)
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        self.entries.clear();
        Ok(())
    }
}

/// Factory for [`MemoryStore`]. Server addresses are validated but unused.
#[derive(Debug, Default, Clone, Copy)]
pub struct MemoryClientFactory;

#[async_trait]
impl ClientFactory for MemoryClientFactory {
    async fn connect(
        &self,
        _servers: &[ServerAddr],
        store_name: &str,
        _options: &CacheOptions,
    ) -> Result<Arc<dyn StoreClient>, CacheError> {
        tracing::debug!(store = store_name, "Creating in-memory store client");
        Ok(Arc::new(MemoryStore::new()))
    }
}
