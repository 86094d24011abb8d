//! Caller timeouts and the expiries they resolve to.

use std::time::Duration;

/// Default expiry applied when the configuration does not specify one.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 300;

/// Timeout as supplied by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Timeout {
    /// Use the facade's configured default.
    #[default]
    Default,
    /// Keep the entry until it is deleted or evicted by the store.
    Never,
    /// Expire after the given number of seconds. Zero means already expired.
    Seconds(u64),
}

impl From<u64> for Timeout {
    fn from(seconds: u64) -> Self {
        Timeout::Seconds(seconds)
    }
}

impl From<Option<u64>> for Timeout {
    fn from(seconds: Option<u64>) -> Self {
        seconds.map_or(Timeout::Never, Timeout::Seconds)
    }
}

/// Effective expiry handed to a store client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    Never,
    After(Duration),
}

impl Expiry {
    /// An expiry of zero: the entry must not be observable after the write.
    pub fn is_immediate(&self) -> bool {
        matches!(self, Expiry::After(d) if d.is_zero())
    }

    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            Expiry::Never => None,
            Expiry::After(d) => Some(*d),
        }
    }
}

/// Maps a caller timeout to a concrete expiry.
pub trait TimeoutResolver: Send + Sync {
    fn resolve(&self, timeout: Timeout) -> Expiry;
}

/// Resolver backed by a configured default, `None` meaning never expire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultTimeoutResolver {
    default_seconds: Option<u64>,
}

impl DefaultTimeoutResolver {
    pub fn new(default_seconds: Option<u64>) -> Self {
        Self { default_seconds }
    }
}

impl Default for DefaultTimeoutResolver {
    fn default() -> Self {
        Self::new(Some(DEFAULT_TIMEOUT_SECONDS))
    }
}

impl TimeoutResolver for DefaultTimeoutResolver {
    fn resolve(&self, timeout: Timeout) -> Expiry {
        let seconds = match timeout {
            Timeout::Default => self.default_seconds,
            Timeout::Never => None,
            Timeout::Seconds(s) => Some(s),
        };
        match seconds {
            Some(s) => Expiry::After(Duration::from_secs(s)),
            None => Expiry::Never,
        }
    }
}
