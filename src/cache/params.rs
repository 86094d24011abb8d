//! Construction parameters for a cache facade.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::cache::CacheError;
use crate::cache::timeout::DEFAULT_TIMEOUT_SECONDS;

/// Option key naming the store inside the cluster.
pub const STORE_NAME_OPTION: &str = "store_name";

/// Free-form options. Only `store_name` is interpreted by the facade; the
/// rest is handed to the client factory untouched.
pub type CacheOptions = BTreeMap<String, serde_json::Value>;

/// One node of the store cluster.
///
/// Deserializes from a table (`{ address = "...", node_id = 0 }`) as well as
/// from a two-element array (`["...", 0]`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServerAddr {
    pub address: String,
    pub node_id: u32,
}

impl ServerAddr {
    pub fn new(address: impl Into<String>, node_id: u32) -> Self {
        Self {
            address: address.into(),
            node_id,
        }
    }
}

impl<S: Into<String>> From<(S, u32)> for ServerAddr {
    fn from((address, node_id): (S, u32)) -> Self {
        Self::new(address, node_id)
    }
}

/// Store client implementation backing a facade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Redis,
    Memory,
}

/// Everything a facade needs apart from the server list.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheParams {
    pub backend: Backend,
    /// Prepended to every logical key by the default key resolver.
    pub key_prefix: String,
    /// Version used when a caller does not pass one.
    pub version: i64,
    /// Default expiry in seconds, `None` for entries that never expire.
    pub timeout: Option<u64>,
    pub options: CacheOptions,
}

impl CacheParams {
    /// Parameters for the given store name with every other field defaulted.
    pub fn for_store(store_name: impl Into<String>) -> Self {
        let mut params = Self::default();
        params.options.insert(
            STORE_NAME_OPTION.to_string(),
            serde_json::Value::String(store_name.into()),
        );
        params
    }

    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }
}

impl Default for CacheParams {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            key_prefix: String::new(),
            version: 1,
            timeout: Some(DEFAULT_TIMEOUT_SECONDS),
            options: CacheOptions::new(),
        }
    }
}

/// Check the server list: non-empty, no blank address, unique node ids.
pub fn validate_servers(servers: &[ServerAddr]) -> Result<(), CacheError> {
    if servers.is_empty() {
        return Err(CacheError::configuration(
            "servers",
            "At least one (address, node_id) pair is required.",
        ));
    }

    let mut seen = HashSet::with_capacity(servers.len());
    for server in servers {
        if server.address.trim().is_empty() {
            return Err(CacheError::configuration(
                "servers",
                format!("Server with node_id {} has an empty address.", server.node_id),
            ));
        }
        if !seen.insert(server.node_id) {
            return Err(CacheError::configuration(
                "servers",
                format!("node_id {} is used by more than one server.", server.node_id),
            ));
        }
    }

    Ok(())
}

/// Extract the required store name from the options.
pub fn store_name(options: &CacheOptions) -> Result<String, CacheError> {
    match options.get(STORE_NAME_OPTION) {
        None => Err(CacheError::configuration(
            "options.store_name",
            "You must give a store_name.",
        )),
        Some(serde_json::Value::String(name)) if name.trim().is_empty() => Err(
            CacheError::configuration("options.store_name", "store_name must not be empty."),
        ),
        // `:` separates the store name from the key, so a name containing it
        // would share its namespace with another store
        Some(serde_json::Value::String(name)) if name.contains(':') => {
            Err(CacheError::configuration(
                "options.store_name",
                format!("store_name must not contain ':', got {:?}", name),
            ))
        }
        Some(serde_json::Value::String(name)) => Ok(name.clone()),
        Some(other) => Err(CacheError::configuration(
            "options.store_name",
            format!("store_name must be a string, got {}", other),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_servers_empty() {
        let err = validate_servers(&[]).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_validate_servers_blank_address() {
        let err = validate_servers(&[ServerAddr::new("  ", 0)]).unwrap_err();
        assert!(err.to_string().contains("empty address"));
    }

    #[test]
    fn test_validate_servers_duplicate_node_id() {
        let servers = vec![ServerAddr::new("a:6379", 1), ServerAddr::new("b:6379", 1)];
        let err = validate_servers(&servers).unwrap_err();
        assert!(err.to_string().contains("node_id 1"));
    }

    #[test]
    fn test_validate_servers_ok() {
        let servers: Vec<ServerAddr> = vec![("a:6379", 0).into(), ("b:6379", 1).into()];
        assert!(validate_servers(&servers).is_ok());
    }

    #[test]
    fn test_store_name_required() {
        assert!(store_name(&CacheOptions::new()).unwrap_err().is_configuration());
    }

    #[test]
    fn test_store_name_type_checked() {
        let mut options = CacheOptions::new();
        options.insert(STORE_NAME_OPTION.to_string(), json!(42));
        assert!(store_name(&options).is_err());

        options.insert(STORE_NAME_OPTION.to_string(), json!(""));
        assert!(store_name(&options).is_err());

        options.insert(STORE_NAME_OPTION.to_string(), json!("sessions"));
        assert_eq!(store_name(&options).unwrap(), "sessions");
    }

    #[test]
    fn test_store_name_rejects_separator() {
        let mut options = CacheOptions::new();
        options.insert(STORE_NAME_OPTION.to_string(), json!("a:b"));
        let err = store_name(&options).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("':'"));

        options.insert(STORE_NAME_OPTION.to_string(), json!("a-b.c"));
        assert_eq!(store_name(&options).unwrap(), "a-b.c");
    }

    #[test]
    fn test_for_store_defaults() {
        let params = CacheParams::for_store("sessions");
        assert_eq!(params.backend, Backend::Redis);
        assert_eq!(params.version, 1);
        assert_eq!(params.timeout, Some(DEFAULT_TIMEOUT_SECONDS));
        assert_eq!(store_name(&params.options).unwrap(), "sessions");
    }

    #[test]
    fn test_server_addr_deserializes_from_table_and_array() {
        #[derive(Deserialize)]
        struct Servers {
            servers: Vec<ServerAddr>,
        }

        let parsed: Servers = toml::from_str(
            r#"servers = [{ address = "redis://a:6379", node_id = 0 }, ["redis://b:6379", 1]]"#,
        )
        .unwrap();
        assert_eq!(
            parsed.servers,
            vec![
                ServerAddr::new("redis://a:6379", 0),
                ServerAddr::new("redis://b:6379", 1)
            ]
        );
    }
}
