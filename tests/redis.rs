//! Redis store client against a live server.
//!
//! Ignored by default. Run against a disposable Redis instance with
//! `REDIS_URL=redis://127.0.0.1:6379 cargo test --test redis -- --ignored`
//! (`REDIS_URL` defaults to that address).
//! Two node ids are mapped onto the same server so per-node grouping is
//! exercised without a real cluster.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use cluster_cache::cache::{
    BlockingCache, CacheFacade, CacheParams, Expiry, RedisStore, ServerAddr, StoreClient,
    Timeout, TimeoutResolver, select_node,
};

fn redis_url() -> String {
    std::env::var("REDIS_URL")
        .ok()
        .filter(|url| !url.trim().is_empty())
        .unwrap_or_else(|| "redis://127.0.0.1:6379".to_string())
}

/// Store name unique to this process and call, so runs never see each other.
fn unique_store(label: &str) -> String {
    static NEXT: AtomicUsize = AtomicUsize::new(0);
    format!(
        "it-{}-{}-{}",
        label,
        std::process::id(),
        NEXT.fetch_add(1, Ordering::SeqCst)
    )
}

fn two_nodes(url: &str) -> Vec<ServerAddr> {
    vec![ServerAddr::new(url, 0), ServerAddr::new(url, 1)]
}

async fn connect(url: &str, store_name: &str) -> RedisStore {
    RedisStore::connect(&two_nodes(url), store_name, 2, Duration::from_secs(5))
        .await
        .unwrap()
}

fn facade(url: &str, store_name: &str) -> CacheFacade {
    CacheFacade::new(two_nodes(url), CacheParams::for_store(store_name)).unwrap()
}

struct ExpireEverything;

impl TimeoutResolver for ExpireEverything {
    fn resolve(&self, _timeout: Timeout) -> Expiry {
        Expiry::After(Duration::ZERO)
    }
}

#[tokio::test]
#[ignore = "requires a Redis server"]
async fn add_stores_only_once() {
    let url = redis_url();
    let store = connect(&url, &unique_store("add")).await;

    assert!(store.add("k", b"v1".to_vec(), Expiry::Never).await.unwrap());
    assert!(!store.add("k", b"v2".to_vec(), Expiry::Never).await.unwrap());
    assert_eq!(store.get("k").await.unwrap(), Some(b"v1".to_vec()));

    store.clear().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a Redis server"]
async fn add_with_expiry_sets_ttl() {
    let url = redis_url();
    let store = connect(&url, &unique_store("ttl")).await;

    let short = Expiry::After(Duration::from_millis(50));
    assert!(store.add("k", b"v".to_vec(), short).await.unwrap());
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(store.get("k").await.unwrap(), None);
    assert!(store.add("k", b"again".to_vec(), short).await.unwrap());

    store.clear().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a Redis server"]
async fn immediate_expiry_add_reports_absence_without_storing() {
    let url = redis_url();
    let name = unique_store("immediate");
    let expiring = facade(&url, &name).with_timeout_resolver(Arc::new(ExpireEverything));
    let regular = facade(&url, &name);

    assert!(expiring.add("k", "v", Timeout::Default, None).await.unwrap());
    assert_eq!(regular.get("k", None).await.unwrap(), None);

    regular.set("k", "held", Timeout::Never, None).await.unwrap();
    assert!(!expiring.add("k", "v", Timeout::Default, None).await.unwrap());
    assert_eq!(regular.get("k", None).await.unwrap(), Some(b"held".to_vec()));

    regular.clear().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a Redis server"]
async fn unrepresentable_timeout_is_stored_without_expiry() {
    let url = redis_url();
    let facade = facade(&url, &unique_store("far"));

    facade
        .set("k", "v", Timeout::Seconds(u64::MAX), None)
        .await
        .unwrap();
    assert!(
        facade
            .add("other", "v", Timeout::Seconds(u64::MAX), None)
            .await
            .unwrap()
    );
    assert_eq!(facade.get("k", None).await.unwrap(), Some(b"v".to_vec()));
    assert_eq!(facade.get("other", None).await.unwrap(), Some(b"v".to_vec()));

    facade.clear().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a Redis server"]
async fn get_many_spans_nodes_and_omits_misses() {
    let url = redis_url();
    let store = connect(&url, &unique_store("many")).await;

    // Pick keys until both node ids own at least one stored key
    let ids = [0, 1];
    let mut stored = Vec::new();
    let mut owners = [false; 2];
    for i in 0.. {
        let key = format!("key:{}", i);
        owners[select_node(&ids, &key)] = true;
        stored.push(key);
        if owners.iter().all(|o| *o) && stored.len() >= 4 {
            break;
        }
    }
    for key in &stored {
        store.set(key, key.as_bytes().to_vec(), Expiry::Never).await.unwrap();
    }

    let mut requested = stored.clone();
    requested.push("missing:a".to_string());
    requested.push("missing:b".to_string());

    let found = store.get_many(&requested).await.unwrap();
    assert_eq!(found.len(), stored.len());
    for key in &stored {
        assert_eq!(found.get(key), Some(&key.as_bytes().to_vec()));
    }
    assert!(!found.contains_key("missing:a"));

    store.clear().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a Redis server"]
async fn clear_leaves_other_stores_untouched() {
    let url = redis_url();
    let name = unique_store("clear");
    let cleared = connect(&url, &name).await;
    let neighbour = connect(&url, &format!("{}x", name)).await;

    cleared.set("k", b"v".to_vec(), Expiry::Never).await.unwrap();
    neighbour.set("k", b"kept".to_vec(), Expiry::Never).await.unwrap();

    cleared.clear().await.unwrap();
    assert_eq!(cleared.get("k").await.unwrap(), None);
    assert_eq!(neighbour.get("k").await.unwrap(), Some(b"kept".to_vec()));

    neighbour.clear().await.unwrap();
}

#[test]
#[ignore = "requires a Redis server"]
fn blocking_first_use_keeps_serving_async_callers() {
    let url = redis_url();
    let facade = Arc::new(facade(&url, &unique_store("blocking")));
    let cache = BlockingCache::from_shared(facade.clone()).unwrap();

    cache.set("k", "v", Timeout::Default, None).unwrap();
    assert!(facade.is_connected());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let value = runtime
        .block_on(async {
            tokio::time::timeout(Duration::from_secs(5), facade.get("k", None)).await
        })
        .expect("redis connection stalled outside blocking calls")
        .unwrap();
    assert_eq!(value, Some(b"v".to_vec()));

    cache.clear().unwrap();
}
