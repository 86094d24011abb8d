//! cluster-cache
//!
//! A cache facade over a distributed key-value store cluster: configuration
//! validation, a lazily created shared store client, key versioning and
//! timeout resolution in front of `add`, `get`, `get_many`, `set`, `delete`
//! and `clear`.

use shadow_rs::shadow;
shadow!(build);

pub mod cache;
pub mod cli;
pub mod config;
pub mod logger;

pub use cache::{CacheError, CacheFacade, CacheParams, ServerAddr, Timeout};

pub fn pkg_version() -> &'static str {
    build::PKG_VERSION
}
