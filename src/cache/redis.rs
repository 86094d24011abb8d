//! Redis cluster store client using one bb8 connection pool per node.
//!
//! Keys are spread over the nodes with rendezvous hashing on the node id, so
//! every process that shares a server list routes a key to the same node
//! regardless of the order the servers are listed in.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bb8::{Pool, PooledConnection};
use futures::future::try_join_all;
use redis::aio::MultiplexedConnection;
use redis::{Client, RedisError};
use sha2::{Digest, Sha256};

use crate::cache::params::{CacheOptions, ServerAddr};
use crate::cache::timeout::Expiry;
use crate::cache::{CacheError, ClientFactory, StoreClient};

type RedisPool = Pool<Client>;

const DEFAULT_POOL_SIZE: u32 = 4;
const DEFAULT_CONNECTION_TIMEOUT: u64 = 5;

/// Largest `PX` the server accepts once its own clock is added, with room to
/// spare. Longer expiries are stored without one.
const MAX_EXPIRY_MILLIS: u64 = i64::MAX as u64 / 2;

struct Node {
    node_id: u32,
    pool: RedisPool,
}

/// Redis-backed store client spanning every configured node.
pub struct RedisStore {
    nodes: Vec<Node>,
    node_ids: Vec<u32>,
    namespace: String,
}

impl RedisStore {
    pub async fn connect(
        servers: &[ServerAddr],
        store_name: &str,
        pool_size: u32,
        connection_timeout: Duration,
    ) -> Result<Self, CacheError> {
        let mut nodes = Vec::with_capacity(servers.len());
        for server in servers {
            let url = normalize_address(&server.address);
            let client =
                Client::open(url.as_str()).map_err(|e| CacheError::backend("connect", e))?;

            let pool = Pool::builder()
                .max_size(pool_size)
                .connection_timeout(connection_timeout)
                .build(client)
                .await
                .map_err(|e| CacheError::backend("connect", e))?;

            tracing::debug!(node_id = server.node_id, url = %url, "Connected Redis node pool");
            nodes.push(Node {
                node_id: server.node_id,
                pool,
            });
        }

        let node_ids = nodes.iter().map(|n| n.node_id).collect();
        Ok(Self {
            nodes,
            node_ids,
            namespace: store_name.to_string(),
        })
    }

    fn namespaced_key(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }

    fn node_for(&self, key: &str) -> &Node {
        &self.nodes[select_node(&self.node_ids, key)]
    }

    async fn get_conn<'a>(
        node: &'a Node,
        operation: &'static str,
    ) -> Result<PooledConnection<'a, Client>, CacheError> {
        node.pool
            .get()
            .await
            .map_err(|e| CacheError::backend(operation, e))
    }
}

#[async_trait]
impl StoreClient for RedisStore {
    async fn add(&self, key: &str, value: Vec<u8>, expiry: Expiry) -> Result<bool, CacheError> {
        let node = self.node_for(key);
        let mut conn = Self::get_conn(node, "add").await?;
        let namespaced = self.namespaced_key(key);
        let conn_ref: &mut MultiplexedConnection = &mut conn;

        if expiry.is_immediate() {
            let exists: bool = redis::cmd("EXISTS")
                .arg(&namespaced)
                .query_async(conn_ref)
                .await
                .map_err(|e: RedisError| CacheError::backend("add", e))?;
            return Ok(!exists);
        }

        let mut cmd = redis::cmd("SET");
        cmd.arg(&namespaced).arg(value).arg("NX");
        if let Some(ms) = expiry_millis(expiry) {
            cmd.arg("PX").arg(ms);
        }
        let reply: Option<String> = cmd
            .query_async(conn_ref)
            .await
            .map_err(|e: RedisError| CacheError::backend("add", e))?;
        Ok(reply.is_some())
    }

    async fn set(&self, key: &str, value: Vec<u8>, expiry: Expiry) -> Result<(), CacheError> {
        if expiry.is_immediate() {
            return self.delete(key).await;
        }

        let node = self.node_for(key);
        let mut conn = Self::get_conn(node, "set").await?;
        let namespaced = self.namespaced_key(key);

        let mut cmd = redis::cmd("SET");
        cmd.arg(&namespaced).arg(value);
        if let Some(ms) = expiry_millis(expiry) {
            cmd.arg("PX").arg(ms);
        }

        let conn_ref: &mut MultiplexedConnection = &mut conn;
        let _: () = cmd
            .query_async(conn_ref)
            .await
            .map_err(|e: RedisError| CacheError::backend("set", e))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let node = self.node_for(key);
        let mut conn = Self::get_conn(node, "get").await?;
        let namespaced = self.namespaced_key(key);

        let conn_ref: &mut MultiplexedConnection = &mut conn;
        redis::cmd("GET")
            .arg(&namespaced)
            .query_async(conn_ref)
            .await
            .map_err(|e: RedisError| CacheError::backend("get", e))
    }

    async fn get_many(&self, keys: &[String]) -> Result<HashMap<String, Vec<u8>>, CacheError> {
        let mut by_node: HashMap<usize, Vec<&String>> = HashMap::new();
        for key in keys {
            by_node
                .entry(select_node(&self.node_ids, key))
                .or_default()
                .push(key);
        }

        let lookups = by_node.into_iter().map(|(index, group)| async move {
            let node = &self.nodes[index];
            let mut conn = Self::get_conn(node, "get_many").await?;
            let namespaced: Vec<String> = group.iter().map(|k| self.namespaced_key(k)).collect();

            let conn_ref: &mut MultiplexedConnection = &mut conn;
            let values: Vec<Option<Vec<u8>>> = redis::cmd("MGET")
                .arg(&namespaced)
                .query_async(conn_ref)
                .await
                .map_err(|e: RedisError| CacheError::backend("get_many", e))?;

            Ok::<_, CacheError>(
                group
                    .into_iter()
                    .zip(values)
                    .filter_map(|(key, value)| value.map(|v| (key.clone(), v)))
                    .collect::<Vec<_>>(),
            )
        });

        Ok(try_join_all(lookups).await?.into_iter().flatten().collect())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let node = self.node_for(key);
        let mut conn = Self::get_conn(node, "delete").await?;
        let namespaced = self.namespaced_key(key);

        let conn_ref: &mut MultiplexedConnection = &mut conn;
        let _: () = redis::cmd("DEL")
            .arg(&namespaced)
            .query_async(conn_ref)
            .await
            .map_err(|e: RedisError| CacheError::backend("delete", e))?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        let pattern = format!("{}:*", escape_glob(&self.namespace));

        for node in &self.nodes {
            let mut conn = Self::get_conn(node, "clear").await?;

            let conn_ref: &mut MultiplexedConnection = &mut conn;
            let keys: Vec<String> = redis::cmd("KEYS")
                .arg(&pattern)
                .query_async(conn_ref)
                .await
                .map_err(|e: RedisError| CacheError::backend("clear", e))?;

            if !keys.is_empty() {
                let conn_ref: &mut MultiplexedConnection = &mut conn;
                let _: () = redis::cmd("DEL")
                    .arg(&keys)
                    .query_async(conn_ref)
                    .await
                    .map_err(|e: RedisError| CacheError::backend("clear", e))?;
            }
            tracing::debug!(node_id = node.node_id, removed = keys.len(), "Cleared node");
        }

        Ok(())
    }
}

/// Factory for [`RedisStore`].
///
/// Reads `pool_size` and `connection_timeout` (seconds) from the options when
/// present with the right type; everything else is ignored.
#[derive(Debug, Default, Clone, Copy)]
pub struct RedisClientFactory;

#[async_trait]
impl ClientFactory for RedisClientFactory {
    async fn connect(
        &self,
        servers: &[ServerAddr],
        store_name: &str,
        options: &CacheOptions,
    ) -> Result<Arc<dyn StoreClient>, CacheError> {
        let pool_size = options
            .get("pool_size")
            .and_then(|v| v.as_u64())
            .and_then(|v| u32::try_from(v).ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_POOL_SIZE);
        let connection_timeout = options
            .get("connection_timeout")
            .and_then(|v| v.as_u64())
            .unwrap_or(DEFAULT_CONNECTION_TIMEOUT);

        let store = RedisStore::connect(
            servers,
            store_name,
            pool_size,
            Duration::from_secs(connection_timeout),
        )
        .await?;
        Ok(Arc::new(store))
    }
}

/// Pick the node with the highest `sha256(node_id || key)` score.
///
/// `node_ids` must be non-empty.
pub fn select_node(node_ids: &[u32], key: &str) -> usize {
    let mut best = 0;
    let mut best_score = 0u64;
    for (index, node_id) in node_ids.iter().enumerate() {
        let score = rendezvous_score(*node_id, key);
        if index == 0 || score > best_score || (score == best_score && *node_id < node_ids[best]) {
            best = index;
            best_score = score;
        }
    }
    best
}

fn rendezvous_score(node_id: u32, key: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(node_id.to_be_bytes());
    hasher.update(key.as_bytes());
    let digest = hasher.finalize();
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(prefix)
}

/// `PX` argument for an expiry, `None` when the entry should not expire.
fn expiry_millis(expiry: Expiry) -> Option<u64> {
    expiry
        .as_duration()
        .and_then(|d| u64::try_from(d.as_millis()).ok())
        .filter(|ms| *ms <= MAX_EXPIRY_MILLIS)
        .map(|ms| ms.max(1))
}

fn normalize_address(address: &str) -> String {
    let trimmed = address.trim();
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("redis://{}", trimmed)
    }
}

fn escape_glob(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
