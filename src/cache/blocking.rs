//! Blocking wrapper for callers without an async runtime.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::runtime::{Builder, Runtime};

use crate::cache::timeout::Timeout;
use crate::cache::{CacheError, CacheFacade};

/// Runs every facade operation to completion on a private runtime.
///
/// The runtime keeps one worker thread alive, so background tasks spawned
/// while the store client is created here (connection drivers, pool
/// reapers) keep running between blocking calls and serve async callers of
/// a shared facade as well.
///
/// Must not be used from inside an async context: blocking on the private
/// runtime from a Tokio worker panics.
pub struct BlockingCache {
    inner: Arc<CacheFacade>,
    runtime: Runtime,
}

impl BlockingCache {
    pub fn new(facade: CacheFacade) -> Result<Self, CacheError> {
        Self::from_shared(Arc::new(facade))
    }

    /// Wrap a facade that async callers keep using as well.
    pub fn from_shared(inner: Arc<CacheFacade>) -> Result<Self, CacheError> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("cluster-cache-blocking")
            .enable_all()
            .build()
            .map_err(|e| CacheError::backend("runtime", e))?;
        Ok(Self { inner, runtime })
    }

    pub fn facade(&self) -> &Arc<CacheFacade> {
        &self.inner
    }

    pub fn add(
        &self,
        key: &str,
        value: impl Into<Vec<u8>>,
        timeout: Timeout,
        version: Option<i64>,
    ) -> Result<bool, CacheError> {
        self.runtime
            .block_on(self.inner.add(key, value, timeout, version))
    }

    pub fn set(
        &self,
        key: &str,
        value: impl Into<Vec<u8>>,
        timeout: Timeout,
        version: Option<i64>,
    ) -> Result<(), CacheError> {
        self.runtime
            .block_on(self.inner.set(key, value, timeout, version))
    }

    pub fn get(&self, key: &str, version: Option<i64>) -> Result<Option<Vec<u8>>, CacheError> {
        self.runtime.block_on(self.inner.get(key, version))
    }

    pub fn get_or(
        &self,
        key: &str,
        default: impl Into<Vec<u8>>,
        version: Option<i64>,
    ) -> Result<Vec<u8>, CacheError> {
        self.runtime
            .block_on(self.inner.get_or(key, default, version))
    }

    pub fn get_many<K: AsRef<str>>(
        &self,
        keys: &[K],
        version: Option<i64>,
    ) -> Result<HashMap<String, Vec<u8>>, CacheError> {
        self.runtime.block_on(self.inner.get_many(keys, version))
    }

    pub fn delete(&self, key: &str, version: Option<i64>) -> Result<(), CacheError> {
        self.runtime.block_on(self.inner.delete(key, version))
    }

    pub fn clear(&self) -> Result<(), CacheError> {
        self.runtime.block_on(self.inner.clear())
    }

    pub fn has_key(&self, key: &str, version: Option<i64>) -> Result<bool, CacheError> {
        self.runtime.block_on(self.inner.has_key(key, version))
    }
}
