//! Store Module
//!
//! The flat key-value store the facade is layered on, plus reference backends.
//!
//! A flat store only offers `get`, `set`, `delete` and `clear` over raw strings.
//! Backends that persist rows in a SQL table may additionally expose
//! [`RawQuery`], which the facade uses for prefix key scans.

mod entry;
mod like;
mod lru;
mod memory;
#[cfg(feature = "postgres")]
mod postgres;
mod stats;

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;

pub use entry::{current_timestamp_ms, StoredEntry};
pub use like::{escape_like, like_match};
pub use lru::LruTracker;
pub use memory::MemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;
pub use stats::StoreStats;

// == Flat Store ==
/// Minimal key-value store contract.
///
/// Values are opaque strings; TTLs are enforced by the store itself.
#[async_trait]
pub trait FlatStore: Send + Sync {
    /// Raw value for `key`, or `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, overwriting unconditionally.
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<bool>;

    /// Removes `key`; `true` if something was removed.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Removes every entry of the store.
    async fn clear(&self) -> Result<()>;

    /// Raw query access to the store's persistence, when it has any.
    fn raw_query(&self) -> Option<&dyn RawQuery> {
        None
    }
}

// == Raw Query ==
/// One row returned by a raw key query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyRow {
    /// Physical key, including any prefix the store applies
    pub key: String,
    /// Raw value, when the query selected it
    pub value: Option<String>,
}

impl KeyRow {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
        }
    }
}

/// SQL access bypassing the get/set interface.
#[async_trait]
pub trait RawQuery: Send + Sync {
    /// Runs `sql` with positional `$n` parameters and returns the selected rows.
    async fn query(&self, sql: &str, params: &[String]) -> Result<Vec<KeyRow>>;
}
