//! Key resolution: logical key + version -> opaque store key.

/// Longest key most stores accept without complaint.
pub const MAX_KEY_LENGTH: usize = 250;

/// Folds a logical key and a version into the key sent to the store.
///
/// Implementations must be deterministic and must not map the same logical
/// key under two different versions to the same string.
pub trait KeyResolver: Send + Sync {
    fn make_key(&self, key: &str, version: i64) -> String;
}

/// `prefix:version:key`, warning about keys that stores tend to reject.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefaultKeyResolver {
    prefix: String,
}

impl DefaultKeyResolver {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl KeyResolver for DefaultKeyResolver {
    fn make_key(&self, key: &str, version: i64) -> String {
        let resolved = format!("{}:{}:{}", self.prefix, version, key);
        if let Some(problem) = key_warning(&resolved) {
            tracing::warn!(key = %resolved, "{}", problem);
        }
        resolved
    }
}

/// Describe why a resolved key may be rejected by the store, if it might.
pub fn key_warning(key: &str) -> Option<String> {
    if key.len() > MAX_KEY_LENGTH {
        return Some(format!(
            "Cache key is {} bytes long, longer than the {} bytes most stores accept",
            key.len(),
            MAX_KEY_LENGTH
        ));
    }
    if key.chars().any(|c| c.is_control() || c == ' ') {
        return Some("Cache key contains spaces or control characters".to_string());
    }
    None
}
