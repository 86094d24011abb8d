//! Cache facade: configuration validation, lazy client, key and timeout
//! resolution in front of a store client.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::cache::key::{DefaultKeyResolver, KeyResolver};
use crate::cache::memory::MemoryClientFactory;
use crate::cache::params::{Backend, CacheParams, ServerAddr, store_name, validate_servers};
use crate::cache::redis::RedisClientFactory;
use crate::cache::timeout::{DefaultTimeoutResolver, Timeout, TimeoutResolver};
use crate::cache::{CacheError, ClientFactory, StoreClient};

/// Generic cache operations on top of one lazily created store client.
///
/// One facade is meant to be shared (behind an `Arc` or a `&'static`) by
/// every caller. The client is created by the first operation that needs it
/// and reused afterwards; concurrent first calls wait for a single
/// construction. A failed construction is not memoized.
pub struct CacheFacade {
    servers: Vec<ServerAddr>,
    store_name: String,
    params: CacheParams,
    factory: Arc<dyn ClientFactory>,
    key_resolver: Arc<dyn KeyResolver>,
    timeout_resolver: Arc<dyn TimeoutResolver>,
    client: OnceCell<Arc<dyn StoreClient>>,
}

impl CacheFacade {
    /// Create a facade whose client factory is picked from `params.backend`.
    ///
    /// Validates the parameters; never contacts the store.
    pub fn new(servers: Vec<ServerAddr>, params: CacheParams) -> Result<Self, CacheError> {
        let factory: Arc<dyn ClientFactory> = match params.backend {
            Backend::Redis => Arc::new(RedisClientFactory),
            Backend::Memory => Arc::new(MemoryClientFactory),
        };
        Self::with_factory(servers, params, factory)
    }

    /// Create a facade around an explicit client factory.
    pub fn with_factory(
        servers: Vec<ServerAddr>,
        params: CacheParams,
        factory: Arc<dyn ClientFactory>,
    ) -> Result<Self, CacheError> {
        validate_servers(&servers)?;
        let store_name = store_name(&params.options)?;

        Ok(Self {
            key_resolver: Arc::new(DefaultKeyResolver::new(params.key_prefix.clone())),
            timeout_resolver: Arc::new(DefaultTimeoutResolver::new(params.timeout)),
            servers,
            store_name,
            params,
            factory,
            client: OnceCell::new(),
        })
    }

    pub fn with_key_resolver(mut self, resolver: Arc<dyn KeyResolver>) -> Self {
        self.key_resolver = resolver;
        self
    }

    pub fn with_timeout_resolver(mut self, resolver: Arc<dyn TimeoutResolver>) -> Self {
        self.timeout_resolver = resolver;
        self
    }

    pub fn store_name(&self) -> &str {
        &self.store_name
    }

    pub fn servers(&self) -> &[ServerAddr] {
        &self.servers
    }

    pub fn params(&self) -> &CacheParams {
        &self.params
    }

    /// Whether the store client has been created yet.
    pub fn is_connected(&self) -> bool {
        self.client.initialized()
    }

    /// The shared store client, created on first use.
    pub async fn client(&self) -> Result<&Arc<dyn StoreClient>, CacheError> {
        self.client
            .get_or_try_init(|| async {
                tracing::info!(
                    store = %self.store_name,
                    servers = self.servers.len(),
                    backend = ?self.params.backend,
                    "Creating cache store client"
                );
                self.factory
                    .connect(&self.servers, &self.store_name, &self.params.options)
                    .await
            })
            .await
    }

    fn make_key(&self, key: &str, version: Option<i64>) -> String {
        self.key_resolver
            .make_key(key, version.unwrap_or(self.params.version))
    }

    // ========================================================================
    // Cache operations
    // ========================================================================

    /// Store the value only if the key is absent. Returns whether it was stored.
    pub async fn add(
        &self,
        key: &str,
        value: impl Into<Vec<u8>>,
        timeout: Timeout,
        version: Option<i64>,
    ) -> Result<bool, CacheError> {
        let key = self.make_key(key, version);
        let expiry = self.timeout_resolver.resolve(timeout);
        let stored = self.client().await?.add(&key, value.into(), expiry).await?;
        tracing::debug!(key = %key, stored, "cache add");
        Ok(stored)
    }

    /// Store the value unconditionally.
    pub async fn set(
        &self,
        key: &str,
        value: impl Into<Vec<u8>>,
        timeout: Timeout,
        version: Option<i64>,
    ) -> Result<(), CacheError> {
        let key = self.make_key(key, version);
        let expiry = self.timeout_resolver.resolve(timeout);
        tracing::debug!(key = %key, ?expiry, "cache set");
        self.client().await?.set(&key, value.into(), expiry).await
    }

    /// Fetch a value, `None` when absent or expired.
    pub async fn get(&self, key: &str, version: Option<i64>) -> Result<Option<Vec<u8>>, CacheError> {
        let key = self.make_key(key, version);
        let value = self.client().await?.get(&key).await?;
        tracing::debug!(key = %key, hit = value.is_some(), "cache get");
        Ok(value)
    }

    /// Fetch a value, falling back to `default` when absent or expired.
    pub async fn get_or(
        &self,
        key: &str,
        default: impl Into<Vec<u8>>,
        version: Option<i64>,
    ) -> Result<Vec<u8>, CacheError> {
        Ok(self
            .get(key, version)
            .await?
            .unwrap_or_else(|| default.into()))
    }

    /// Fetch several keys at once.
    ///
    /// The result maps the caller's logical keys to their values; keys with
    /// no stored value are left out.
    pub async fn get_many<K: AsRef<str>>(
        &self,
        keys: &[K],
        version: Option<i64>,
    ) -> Result<HashMap<String, Vec<u8>>, CacheError> {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }

        let resolved: Vec<(String, String)> = keys
            .iter()
            .map(|k| (k.as_ref().to_string(), self.make_key(k.as_ref(), version)))
            .collect();
        let store_keys: Vec<String> = resolved.iter().map(|(_, s)| s.clone()).collect();

        let mut found = self.client().await?.get_many(&store_keys).await?;
        tracing::debug!(requested = keys.len(), hits = found.len(), "cache get_many");

        Ok(resolved
            .into_iter()
            .filter_map(|(logical, store_key)| found.remove(&store_key).map(|v| (logical, v)))
            .collect())
    }

    /// Remove a key. Succeeds whether or not the key existed.
    pub async fn delete(&self, key: &str, version: Option<i64>) -> Result<(), CacheError> {
        let key = self.make_key(key, version);
        tracing::debug!(key = %key, "cache delete");
        self.client().await?.delete(&key).await
    }

    /// Remove every key of this facade's store.
    pub async fn clear(&self) -> Result<(), CacheError> {
        tracing::debug!(store = %self.store_name, "cache clear");
        self.client().await?.clear().await
    }

    // ========================================================================
    // Conveniences built on the primitives
    // ========================================================================

    pub async fn has_key(&self, key: &str, version: Option<i64>) -> Result<bool, CacheError> {
        Ok(self.get(key, version).await?.is_some())
    }

    /// Set every entry with the same timeout and version.
    pub async fn set_many<K, V, I>(
        &self,
        entries: I,
        timeout: Timeout,
        version: Option<i64>,
    ) -> Result<(), CacheError>
    where
        K: AsRef<str>,
        V: Into<Vec<u8>>,
        I: IntoIterator<Item = (K, V)>,
    {
        for (key, value) in entries {
            self.set(key.as_ref(), value, timeout, version).await?;
        }
        Ok(())
    }

    pub async fn delete_many<K: AsRef<str>>(
        &self,
        keys: &[K],
        version: Option<i64>,
    ) -> Result<(), CacheError> {
        for key in keys {
            self.delete(key.as_ref(), version).await?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for CacheFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheFacade")
            .field("servers", &self.servers)
            .field("store_name", &self.store_name)
            .field("backend", &self.params.backend)
            .field("connected", &self.is_connected())
            .finish()
    }
}
