//! Memory Store Module
//!
//! In-process flat store with TTL expiration, optional LRU capacity and a
//! Keyv-style key namespace. Also answers the `LIKE` key scans the facade issues,
//! so prefix enumeration can be exercised without a database.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::{
    current_timestamp_ms, like_match, FlatStore, KeyRow, LruTracker, RawQuery, StoreStats,
    StoredEntry,
};
use crate::config::Config;
use crate::error::{CacheError, Result};

// == Store State ==
#[derive(Debug, Default)]
struct StoreState {
    /// Physical key -> entry
    entries: HashMap<String, StoredEntry>,
    lru: LruTracker,
    stats: StoreStats,
}

impl StoreState {
    fn remove(&mut self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.lru.remove(key);
        }
        removed
    }
}

// == Memory Store ==
/// Flat store kept in a `HashMap` behind a tokio `RwLock`.
///
/// Keys are stored as `<namespace>:<key>` when a namespace is set, the same
/// physical layout a Keyv-backed table uses.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
    namespace: Option<String>,
    max_entries: Option<usize>,
    default_ttl: Option<Duration>,
}

impl MemoryStore {
    // == Constructor ==
    /// Creates an unbounded store without namespace or default TTL.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store laid out and bounded as configured.
    pub fn from_config(config: &Config) -> Self {
        let mut store = Self::new()
            .with_capacity(config.max_entries)
            .with_default_ttl(config.default_ttl());
        store.namespace = config.namespace.clone();
        store
    }

    /// Bounds the store; the least recently used entry is evicted when full.
    pub fn with_capacity(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries);
        self
    }

    /// Prefixes every physical key with `<namespace>:`.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// TTL applied to writes that carry none.
    pub fn with_default_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    fn physical_key(&self, key: &str) -> String {
        match &self.namespace {
            Some(ns) => format!("{}:{}", ns, key),
            None => key.to_string(),
        }
    }

    // == Stats ==
    pub async fn stats(&self) -> StoreStats {
        let state = self.state.read().await;
        let mut stats = state.stats.clone();
        stats.total_entries = state.entries.len();
        stats
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    // == Cleanup Expired ==
    /// Removes all expired entries, returning how many were dropped.
    pub async fn cleanup_expired(&self) -> usize {
        let now = current_timestamp_ms();
        let mut state = self.state.write().await;
        let expired: Vec<String> = state
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            state.remove(key);
        }
        expired.len()
    }
}

#[async_trait]
impl FlatStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let key = self.physical_key(key);
        let mut state = self.state.write().await;

        let value = match state.entries.get(&key).map(StoredEntry::is_expired) {
            Some(true) => {
                state.remove(&key);
                None
            }
            Some(false) => state.entries.get(&key).map(|entry| entry.value.clone()),
            None => None,
        };

        match value {
            Some(value) => {
                state.stats.record_hit();
                state.lru.touch(&key);
                Ok(Some(value))
            }
            None => {
                state.stats.record_miss();
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<bool> {
        let key = self.physical_key(key);
        let mut state = self.state.write().await;

        let is_overwrite = state.entries.contains_key(&key);
        if let Some(max) = self.max_entries {
            if !is_overwrite && state.entries.len() >= max {
                match state.lru.evict_oldest() {
                    Some(evicted) => {
                        state.entries.remove(&evicted);
                        state.stats.record_eviction();
                        debug!(key = %evicted, "Evicted least recently used entry");
                    }
                    None => {
                        return Err(CacheError::Store(
                            "Store is full and eviction failed".to_string(),
                        ))
                    }
                }
            }
        }

        let entry = StoredEntry::new(value, ttl.or(self.default_ttl));
        state.entries.insert(key.clone(), entry);
        state.lru.touch(&key);
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let key = self.physical_key(key);
        Ok(self.state.write().await.remove(&key))
    }

    async fn clear(&self) -> Result<()> {
        let mut state = self.state.write().await;
        state.entries.clear();
        state.lru.clear();
        Ok(())
    }

    fn raw_query(&self) -> Option<&dyn RawQuery> {
        Some(self)
    }
}

// == Raw Query ==
/// The one statement shape the memory store understands:
/// `SELECT key[, value] FROM <table> WHERE key LIKE $1`.
#[derive(Debug, PartialEq, Eq)]
struct KeyScan {
    with_value: bool,
}

fn parse_key_scan(sql: &str) -> Result<KeyScan> {
    let unsupported = || CacheError::Unsupported(format!("memory store cannot run: {}", sql));

    let normalized = sql.trim().trim_end_matches(';').to_ascii_lowercase();
    let rest = normalized.strip_prefix("select").ok_or_else(unsupported)?;
    let (columns, rest) = rest.split_once(" from ").ok_or_else(unsupported)?;
    let columns: String = columns.chars().filter(|c| !c.is_whitespace()).collect();
    let with_value = match columns.as_str() {
        "key" => false,
        "key,value" => true,
        _ => return Err(unsupported()),
    };

    // Table name is not checked: the memory store has a single table.
    let mut words = rest.split_whitespace();
    words.next().ok_or_else(unsupported)?;
    let tail: Vec<&str> = words.collect();
    if tail != ["where", "key", "like", "$1"] {
        return Err(unsupported());
    }
    Ok(KeyScan { with_value })
}

#[async_trait]
impl RawQuery for MemoryStore {
    async fn query(&self, sql: &str, params: &[String]) -> Result<Vec<KeyRow>> {
        let scan = parse_key_scan(sql)?;
        let pattern = params
            .first()
            .ok_or_else(|| CacheError::InvalidRequest("missing parameter $1".to_string()))?;

        let now = current_timestamp_ms();
        let state = self.state.read().await;
        let rows = state
            .entries
            .iter()
            .filter(|(key, entry)| !entry.is_expired_at(now) && like_match(pattern, key))
            .map(|(key, entry)| KeyRow {
                key: key.clone(),
                value: scan.with_value.then(|| entry.value.clone()),
            })
            .collect();
        Ok(rows)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_set_and_get() {
        let store = MemoryStore::new();
        assert!(store.set("key1", "\"value1\"".to_string(), None).await.unwrap());
        assert_eq!(store.get("key1").await.unwrap().as_deref(), Some("\"value1\""));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_store_get_nonexistent() {
        let store = MemoryStore::new();
        assert_eq!(store.get("nonexistent").await.unwrap(), None);
        assert_eq!(store.stats().await.misses, 1);
    }

    #[tokio::test]
    async fn test_store_delete() {
        let store = MemoryStore::new();
        store.set("key1", "1".to_string(), None).await.unwrap();
        assert!(store.delete("key1").await.unwrap());
        assert!(!store.delete("key1").await.unwrap());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_store_overwrite() {
        let store = MemoryStore::new();
        store.set("key1", "1".to_string(), None).await.unwrap();
        store.set("key1", "2".to_string(), None).await.unwrap();
        assert_eq!(store.get("key1").await.unwrap().as_deref(), Some("2"));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_store_ttl_expiration() {
        let store = MemoryStore::new();
        store
            .set("key1", "1".to_string(), Some(Duration::from_millis(50)))
            .await
            .unwrap();
        assert!(store.get("key1").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(store.get("key1").await.unwrap(), None);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_store_default_ttl_applies() {
        let store = MemoryStore::new().with_default_ttl(Some(Duration::ZERO));
        store.set("key1", "1".to_string(), None).await.unwrap();
        assert_eq!(store.get("key1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_store_lru_eviction() {
        let store = MemoryStore::new().with_capacity(3);
        for key in ["key1", "key2", "key3"] {
            store.set(key, "v".to_string(), None).await.unwrap();
        }
        // key1 becomes most recently used, so key2 is evicted next
        store.get("key1").await.unwrap();
        store.set("key4", "v".to_string(), None).await.unwrap();

        assert_eq!(store.len().await, 3);
        assert!(store.get("key1").await.unwrap().is_some());
        assert!(store.get("key2").await.unwrap().is_none());
        assert_eq!(store.stats().await.evictions, 1);
    }

    #[tokio::test]
    async fn test_store_cleanup_expired() {
        let store = MemoryStore::new();
        store
            .set("short", "1".to_string(), Some(Duration::ZERO))
            .await
            .unwrap();
        store
            .set("long", "1".to_string(), Some(Duration::from_secs(60)))
            .await
            .unwrap();

        assert_eq!(store.cleanup_expired().await, 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_namespace_prefixes_physical_keys() {
        let store = MemoryStore::new().with_namespace("keyv");
        store.set("user:1", "1".to_string(), None).await.unwrap();

        let rows = store
            .query("SELECT key FROM public.keyv WHERE key LIKE $1", &["keyv:user:%".to_string()])
            .await
            .unwrap();
        assert_eq!(rows, vec![KeyRow::new("keyv:user:1")]);

        let rows = store
            .query("SELECT key FROM keyv WHERE key LIKE $1", &["user:%".to_string()])
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_query_with_value_column() {
        let store = MemoryStore::new();
        store.set("a", "\"x\"".to_string(), None).await.unwrap();
        let rows = store
            .query("select key, value from t where key like $1;", &["a".to_string()])
            .await
            .unwrap();
        assert_eq!(rows[0].value.as_deref(), Some("\"x\""));
    }

    #[tokio::test]
    async fn test_query_rejects_other_statements() {
        let store = MemoryStore::new();
        let result = store.query("DELETE FROM keyv", &[]).await;
        assert!(matches!(result, Err(CacheError::Unsupported(_))));

        let result = store
            .query("SELECT key FROM keyv WHERE key LIKE $1", &[])
            .await;
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_clear_empties_everything() {
        let store = MemoryStore::new().with_namespace("ns");
        store.set("a", "1".to_string(), None).await.unwrap();
        store.set("b", "1".to_string(), None).await.unwrap();
        store.clear().await.unwrap();
        assert!(store.is_empty().await);
    }
}
