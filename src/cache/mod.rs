//! Cache facade over a distributed key-value store.
//!
//! The facade validates its configuration, creates one store client on first
//! use and forwards the cache operations to it after resolving keys and
//! timeouts:
//! - `add`, `set`, `get`, `get_many`, `delete`, `clear`
//! - `get_or`, `has_key`, `set_many`, `delete_many` built on top of those
//!
//! Two store clients are provided:
//! - Redis (one pool per node, keys routed by rendezvous hashing on node id)
//! - Memory (in-process, per-entry expiry)
//!
//! # Configuration
//!
//! ```toml
//! [cache]
//! backend = "redis"  # or "memory"
//! key_prefix = "app"
//! version = 1
//! timeout = 300
//! servers = [
//!     { address = "redis://10.0.0.1:6379", node_id = 0 },
//!     ["redis://10.0.0.2:6379", 1],
//! ]
//!
//! [cache.options]
//! store_name = "sessions"  # required
//! pool_size = 4
//! connection_timeout = 5
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let facade = CacheFacade::new(servers, CacheParams::for_store("sessions"))?;
//! facade.set("user:1", b"alice".to_vec(), Timeout::Default, None).await?;
//! let hit = facade.get("user:1", None).await?;
//! ```

mod blocking;
mod error;
mod facade;
mod key;
mod memory;
mod params;
mod redis;
mod timeout;
mod traits;

pub use blocking::BlockingCache;
pub use error::CacheError;
pub use facade::CacheFacade;
pub use key::{DefaultKeyResolver, KeyResolver, MAX_KEY_LENGTH, key_warning};
pub use memory::{MemoryClientFactory, MemoryStore};
pub use params::{
    Backend, CacheOptions, CacheParams, STORE_NAME_OPTION, ServerAddr, store_name,
    validate_servers,
};
pub use self::redis::{RedisClientFactory, RedisStore, select_node};
pub use timeout::{
    DEFAULT_TIMEOUT_SECONDS, DefaultTimeoutResolver, Expiry, Timeout, TimeoutResolver,
};
pub use traits::{ClientFactory, StoreClient};
