//! Settings structures deserialized from the layered configuration.

use serde::{Deserialize, Serialize};

use crate::cache::{
    Backend, CacheError, CacheFacade, CacheOptions, CacheParams, DEFAULT_TIMEOUT_SECONDS,
    ServerAddr,
};
use crate::logger::LoggerConfig;

fn default_version() -> i64 {
    1
}

fn default_timeout() -> Option<u64> {
    Some(DEFAULT_TIMEOUT_SECONDS)
}

// ============================================================================
// Cache Configuration
// ============================================================================

/// `[cache]` section: the server list plus the facade parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cluster nodes as `(address, node_id)` pairs
    #[serde(default)]
    pub servers: Vec<ServerAddr>,

    /// Store client implementation
    #[serde(default)]
    pub backend: Backend,

    /// Prefix prepended to every key
    #[serde(default)]
    pub key_prefix: String,

    /// Key version used when callers do not pass one
    #[serde(default = "default_version")]
    pub version: i64,

    /// Default expiry in seconds
    #[serde(default = "default_timeout")]
    pub timeout: Option<u64>,

    /// Store options; `store_name` is required, the rest goes to the client
    #[serde(default)]
    pub options: CacheOptions,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            servers: Vec::new(),
            backend: Backend::default(),
            key_prefix: String::new(),
            version: default_version(),
            timeout: default_timeout(),
            options: CacheOptions::new(),
        }
    }
}

impl CacheConfig {
    pub fn to_params(&self) -> CacheParams {
        CacheParams {
            backend: self.backend,
            key_prefix: self.key_prefix.clone(),
            version: self.version,
            timeout: self.timeout,
            options: self.options.clone(),
        }
    }

    /// Build a facade from this section. Does not connect.
    pub fn build_facade(&self) -> Result<CacheFacade, CacheError> {
        CacheFacade::new(self.servers.clone(), self.to_params())
    }
}

// ============================================================================
// Main Settings Structure
// ============================================================================

/// Complete settings loaded from TOML files and environment variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Logger configuration
    #[serde(default)]
    pub logger: LoggerConfig,

    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
}
