//! Facade Module
//!
//! Redis-style command surface over a flat key-value store.
//!
//! Every value handed to [`CacheFacade::set`] is stored as its JSON encoding and
//! every value read back is JSON-decoded, so `get` after `set` returns an equal
//! value for strings, numbers, booleans, null, arrays and maps alike. Store
//! failures are logged through the injected [`CacheLog`] and turned into the
//! operation's empty result; nothing here returns an error.

mod hash;
mod scanner;
mod unsupported;


use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::config::Config;
use crate::log::{tracing_log, CacheLog};
use crate::store::FlatStore;

pub use scanner::{KeyScanner, PatternKind};

/// Status reply of successful writes.
pub const OK: &str = "OK";

// == Key List ==
/// One key or many, for commands that accept either.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyList {
    One(String),
    Many(Vec<String>),
}

impl KeyList {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            KeyList::One(key) => vec![key],
            KeyList::Many(keys) => keys,
        }
    }
}

impl From<&str> for KeyList {
    fn from(key: &str) -> Self {
        KeyList::One(key.to_string())
    }
}

impl From<String> for KeyList {
    fn from(key: String) -> Self {
        KeyList::One(key)
    }
}

impl From<Vec<String>> for KeyList {
    fn from(keys: Vec<String>) -> Self {
        KeyList::Many(keys)
    }
}

impl From<Vec<&str>> for KeyList {
    fn from(keys: Vec<&str>) -> Self {
        KeyList::Many(keys.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for KeyList {
    fn from(keys: &[&str]) -> Self {
        KeyList::Many(keys.iter().map(|k| k.to_string()).collect())
    }
}

// == Batch Entry ==
/// One write of an [`CacheFacade::mset`] batch.
#[derive(Debug, Clone)]
pub struct MsetEntry {
    pub key: String,
    pub value: Value,
    pub ttl: Option<Duration>,
}

impl MsetEntry {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
            ttl: None,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

// == Codec ==
/// Canonical JSON encoding of a value, strings included.
pub fn encode<V: Serialize + ?Sized>(value: &V) -> serde_json::Result<String> {
    serde_json::to_string(value)
}

/// Decodes stored text; text that is not JSON comes back as a plain string.
pub fn decode(raw: String) -> Value {
    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(_) => Value::String(raw),
    }
}

// == Cache Facade ==
/// Command shim over a shared [`FlatStore`] handle.
///
/// Cloning is cheap; clones share the store and the logger. There is no locking:
/// concurrent calls interleave as the store allows.
#[derive(Clone)]
pub struct CacheFacade {
    store: Arc<dyn FlatStore>,
    scanner: KeyScanner,
    log: Arc<dyn CacheLog>,
}

impl std::fmt::Debug for CacheFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheFacade")
            .field("scanner", &self.scanner)
            .finish_non_exhaustive()
    }
}

impl CacheFacade {
    // == Constructor ==
    /// Wraps `store` with the default scanner layout and `tracing` logging.
    pub fn new(store: Arc<dyn FlatStore>) -> Self {
        Self {
            store,
            scanner: KeyScanner::default(),
            log: tracing_log(),
        }
    }

    /// Wraps `store`, scanning keys with the layout described by `config`.
    pub fn from_config(store: Arc<dyn FlatStore>, config: &Config) -> Self {
        Self::new(store).with_scanner(config.scanner())
    }

    pub fn with_logger(mut self, log: Arc<dyn CacheLog>) -> Self {
        self.log = log;
        self
    }

    pub fn with_scanner(mut self, scanner: KeyScanner) -> Self {
        self.scanner = scanner;
        self
    }

    /// The underlying flat store.
    pub fn store(&self) -> &Arc<dyn FlatStore> {
        &self.store
    }

    pub(crate) fn log(&self) -> &dyn CacheLog {
        self.log.as_ref()
    }

    // == Set ==
    /// Stores `value` under `key`, overwriting unconditionally.
    ///
    /// Returns `Some("OK")`, or `None` for an empty key or any failure.
    pub async fn set<V: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &V,
        ttl: Option<Duration>,
    ) -> Option<&'static str> {
        if key.is_empty() {
            return None;
        }
        let raw = match encode(value) {
            Ok(raw) => raw,
            Err(e) => {
                self.log
                    .error("set", &format!("Failed to encode value for key {}: {}", key, e));
                return None;
            }
        };
        match self.store.set(key, raw, ttl).await {
            Ok(true) => Some(OK),
            Ok(false) => None,
            Err(e) => {
                self.log.error("set", &format!("Failed to set key {}: {}", key, e));
                None
            }
        }
    }

    // == Get ==
    /// Decoded value of `key`; `None` for a miss, an empty or `"*"` key, or an error.
    pub async fn get(&self, key: &str) -> Option<Value> {
        if key.is_empty() || key == "*" {
            return None;
        }
        match self.store.get(key).await {
            Ok(raw) => raw.map(decode),
            Err(e) => {
                self.log.error("get", &format!("Failed to get key {}: {}", key, e));
                None
            }
        }
    }

    /// [`get`](Self::get) decoded into `T`; a value of another shape reads as a miss.
    pub async fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get(key).await?;
        match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(e) => {
                self.log
                    .warn("get", &format!("Cached value for key {} has another shape: {}", key, e));
                None
            }
        }
    }

    // == Delete ==
    pub(crate) async fn delete_one(&self, op: &str, key: &str) -> bool {
        match self.store.delete(key).await {
            Ok(removed) => removed,
            Err(e) => {
                self.log.error(op, &format!("Failed to delete key {}: {}", key, e));
                false
            }
        }
    }

    /// Deletes one key or many in parallel; returns how many were removed.
    ///
    /// Empty keys and the wildcard `"*"` are skipped, never expanded.
    pub async fn del(&self, keys: impl Into<KeyList>) -> usize {
        let keys: Vec<String> = keys
            .into()
            .into_vec()
            .into_iter()
            .filter(|key| {
                if key == "*" {
                    self.log.warn("del", "Refusing to delete wildcard key \"*\"");
                }
                !key.is_empty() && key != "*"
            })
            .collect();

        join_all(keys.iter().map(|key| self.delete_one("del", key)))
            .await
            .into_iter()
            .filter(|removed| *removed)
            .count()
    }

    // == Existence ==
    pub async fn has_key(&self, key: &str) -> bool {
        if key.is_empty() {
            return false;
        }
        match self.store.get(key).await {
            Ok(raw) => raw.is_some(),
            Err(e) => {
                self.log
                    .error("exists", &format!("Failed to check key {}: {}", key, e));
                false
            }
        }
    }

    /// `1` if `key` holds a value, else `0`.
    pub async fn exists(&self, key: &str) -> i64 {
        i64::from(self.has_key(key).await)
    }

    // == Guarded Set ==
    /// Sets `key` only if it holds nothing; `1` if written, `0` otherwise.
    ///
    /// Not atomic: a writer landing between the existence check and the write is
    /// not detected, and both callers may see `1`.
    pub async fn setnx<V: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &V,
        ttl: Option<Duration>,
    ) -> i64 {
        if key.is_empty() || self.has_key(key).await {
            return 0;
        }
        i64::from(self.set(key, value, ttl).await.is_some())
    }

    /// Overwrites `key` only if it already holds a value.
    ///
    /// Same check-then-act window as [`setnx`](Self::setnx).
    pub async fn setex<V: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &V,
        ttl: Option<Duration>,
    ) -> Option<&'static str> {
        if !self.has_key(key).await {
            return None;
        }
        self.set(key, value, ttl).await
    }

    // == String Length ==
    /// Length of a string value in UTF-16 code units, the same measure for the
    /// JSON text of anything else, `0` when absent.
    pub async fn strlen(&self, key: &str) -> usize {
        match self.get(key).await {
            None => 0,
            Some(Value::String(s)) => s.encode_utf16().count(),
            Some(other) => other.to_string().encode_utf16().count(),
        }
    }

    // == Batch ==
    /// Values for `keys`, in order; failed reads are `None`.
    pub async fn mget<S: AsRef<str>>(&self, keys: &[S]) -> Vec<Option<Value>> {
        join_all(keys.iter().map(|key| self.get(key.as_ref()))).await
    }

    /// Writes every entry in parallel; one success flag per entry, in order.
    pub async fn mset(&self, entries: &[MsetEntry]) -> Vec<bool> {
        join_all(entries.iter().map(|entry| async move {
            self.set(&entry.key, &entry.value, entry.ttl).await.is_some()
        }))
        .await
    }

    /// Deletes every key in parallel; one removal flag per key, in order.
    pub async fn mdelete<S: AsRef<str>>(&self, keys: &[S]) -> Vec<bool> {
        join_all(keys.iter().map(|key| self.delete_one("mdelete", key.as_ref()))).await
    }

    // == Reset ==
    /// Empties the whole store, not just this facade's namespace.
    pub async fn reset(&self) -> bool {
        match self.store.clear().await {
            Ok(()) => true,
            Err(e) => {
                self.log.error("reset", &format!("Failed to clear store: {}", e));
                false
            }
        }
    }

    /// Alias of [`reset`](Self::reset).
    pub async fn clear(&self) -> bool {
        self.reset().await
    }

    // == Keys ==
    /// Keys matching `pattern`: an exact key, or a prefix ending in `*`.
    ///
    /// `"*"`, empty patterns and wildcards anywhere but the end yield nothing.
    /// Order of the result is unspecified.
    pub async fn keys(&self, pattern: &str) -> Vec<String> {
        let keys = self
            .scanner
            .scan(self.store.as_ref(), self.log.as_ref(), pattern)
            .await;
        self.log
            .debug("keys", &format!("Pattern {} matched {} keys", pattern, keys.len()));
        keys
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::{CacheError, Result};
    use crate::store::MemoryStore;

    /// Logger that keeps every event for assertions.
    #[derive(Default)]
    pub struct RecordingLog {
        pub events: Mutex<Vec<(String, String, String)>>,
    }

    impl RecordingLog {
        pub fn count(&self, level: &str, op: &str) -> usize {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter(|(l, o, _)| l == level && o == op)
                .count()
        }

        fn push(&self, level: &str, op: &str, message: &str) {
            self.events
                .lock()
                .unwrap()
                .push((level.to_string(), op.to_string(), message.to_string()));
        }
    }

    impl CacheLog for RecordingLog {
        fn debug(&self, op: &str, message: &str) {
            self.push("debug", op, message);
        }
        fn warn(&self, op: &str, message: &str) {
            self.push("warn", op, message);
        }
        fn error(&self, op: &str, message: &str) {
            self.push("error", op, message);
        }
    }

    /// Store whose every operation fails.
    pub struct BrokenStore;

    #[async_trait]
    impl FlatStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(CacheError::Store("connection refused".into()))
        }
        async fn set(&self, _key: &str, _value: String, _ttl: Option<Duration>) -> Result<bool> {
            Err(CacheError::Store("connection refused".into()))
        }
        async fn delete(&self, _key: &str) -> Result<bool> {
            Err(CacheError::Store("connection refused".into()))
        }
        async fn clear(&self) -> Result<()> {
            Err(CacheError::Store("connection refused".into()))
        }
    }

    pub fn memory_facade() -> CacheFacade {
        CacheFacade::new(Arc::new(MemoryStore::new().with_namespace("keyv")))
    }
}
