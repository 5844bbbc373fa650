//! Redis commands the flat store cannot back.
//!
//! These answer with fixed replies and log a warning on every call. They are
//! permanent stubs: a flat store has no TTL introspection, lists, or hash
//! metadata to build them on.

use serde_json::{Map, Value};

use super::CacheFacade;

impl CacheFacade {
    fn unsupported(&self, op: &str) {
        self.log()
            .warn(op, &format!("{} is not supported by the flat store", op));
    }

    /// Always `-1`.
    pub async fn ttl(&self, _key: &str) -> i64 {
        self.unsupported("ttl");
        -1
    }

    pub async fn llen(&self, _key: &str) -> i64 {
        self.unsupported("llen");
        0
    }

    pub async fn lpush(&self, _key: &str, _values: &[Value]) -> i64 {
        self.unsupported("lpush");
        0
    }

    pub async fn rpush(&self, _key: &str, _values: &[Value]) -> i64 {
        self.unsupported("rpush");
        0
    }

    pub async fn lpop(&self, _key: &str) -> Option<Value> {
        self.unsupported("lpop");
        None
    }

    pub async fn rpop(&self, _key: &str) -> Option<Value> {
        self.unsupported("rpop");
        None
    }

    pub async fn lrange(&self, _key: &str, _start: i64, _stop: i64) -> Vec<Value> {
        self.unsupported("lrange");
        Vec::new()
    }

    /// Always empty; use `keys("hash:*")` to find a hash's fields.
    pub async fn hgetall(&self, _hash: &str) -> Map<String, Value> {
        self.unsupported("hgetall");
        Map::new()
    }

    pub async fn hkeys(&self, _hash: &str) -> Vec<String> {
        self.unsupported("hkeys");
        Vec::new()
    }

    pub async fn hvals(&self, _hash: &str) -> Vec<Value> {
        self.unsupported("hvals");
        Vec::new()
    }

    pub async fn hlen(&self, _hash: &str) -> i64 {
        self.unsupported("hlen");
        0
    }

    pub async fn command_stats(&self) -> Map<String, Value> {
        self.unsupported("command_stats");
        Map::new()
    }

    pub async fn db_size(&self) -> i64 {
        self.unsupported("db_size");
        0
    }
}
