//! Store client seams.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::cache::params::{CacheOptions, ServerAddr};
use crate::cache::timeout::Expiry;
use crate::cache::CacheError;

/// Primitive operations of a store client.
///
/// Keys are already resolved; clients never see logical keys or versions.
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Store the value only if the key is absent. Returns whether it was absent.
    async fn add(&self, key: &str, value: Vec<u8>, expiry: Expiry) -> Result<bool, CacheError>;

    async fn set(&self, key: &str, value: Vec<u8>, expiry: Expiry) -> Result<(), CacheError>;

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Fetch several keys. Missing keys are left out of the result.
    async fn get_many(&self, keys: &[String]) -> Result<HashMap<String, Vec<u8>>, CacheError>;

    /// Remove a key. Removing an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Remove every key of this client's store.
    async fn clear(&self) -> Result<(), CacheError>;
}

/// Builds a store client from validated connection parameters.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    async fn connect(
        &self,
        servers: &[ServerAddr],
        store_name: &str,
        options: &CacheOptions,
    ) -> Result<Arc<dyn StoreClient>, CacheError>;
}
