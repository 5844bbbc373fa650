//! Hash commands emulated with composite keys.
//!
//! Field `F` of hash `H` lives under the flat key `H:F`. No record of the hash
//! itself exists, so its fields can only be enumerated through `keys("H:*")`.

use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use serde_json::{Map, Value};

use super::{CacheFacade, KeyList};

fn field_key(hash: &str, field: &str) -> String {
    format!("{}:{}", hash, field)
}

impl CacheFacade {
    /// Sets `field` of `hash`; `None` for an empty hash or field name.
    pub async fn hset<V: Serialize + ?Sized>(
        &self,
        hash: &str,
        field: &str,
        value: &V,
    ) -> Option<&'static str> {
        if hash.is_empty() || field.is_empty() {
            return None;
        }
        self.set(&field_key(hash, field), value, None).await
    }

    pub async fn hget(&self, hash: &str, field: &str) -> Option<Value> {
        if hash.is_empty() || field.is_empty() {
            return None;
        }
        self.get(&field_key(hash, field)).await
    }

    pub async fn hexists(&self, hash: &str, field: &str) -> i64 {
        if hash.is_empty() || field.is_empty() {
            return 0;
        }
        self.exists(&field_key(hash, field)).await
    }

    /// Deletes one field or many, each independently; returns how many existed.
    pub async fn hdel(&self, hash: &str, fields: impl Into<KeyList>) -> usize {
        let fields = fields.into().into_vec();
        if hash.is_empty() || fields.is_empty() {
            return 0;
        }
        let keys: Vec<String> = fields.iter().map(|f| field_key(hash, f)).collect();
        join_all(keys.iter().map(|key| self.delete_one("hdel", key)))
            .await
            .into_iter()
            .filter(|removed| *removed)
            .count()
    }

    /// Writes every field in parallel; returns how many writes succeeded.
    pub async fn hmset(
        &self,
        hash: &str,
        fields: &Map<String, Value>,
        ttl: Option<Duration>,
    ) -> usize {
        if hash.is_empty() {
            return 0;
        }
        let writes = fields.iter().map(|(field, value)| {
            let key = field_key(hash, field);
            async move { self.set(&key, value, ttl).await.is_some() }
        });
        join_all(writes).await.into_iter().filter(|ok| *ok).count()
    }
}
