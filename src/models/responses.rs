//! Response DTOs for the command API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use serde_json::Value;

use crate::store::StoreStats;

/// Response body for `GET /get/:key` and `GET /hget/:key/:field`.
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// The decoded value
    pub value: Value,
}

impl GetResponse {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            field: None,
            value,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

/// Status reply of a write: `"OK"`, or `null` when nothing was written.
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub key: String,
    pub status: Option<String>,
}

impl StatusResponse {
    pub fn new(key: impl Into<String>, status: Option<&str>) -> Self {
        Self {
            key: key.into(),
            status: status.map(str::to_string),
        }
    }
}

/// Integer reply of `setnx`, `del`, `exists`, `strlen`, `hdel`.
#[derive(Debug, Clone, Serialize)]
pub struct IntegerResponse {
    pub key: String,
    pub result: i64,
}

impl IntegerResponse {
    pub fn new(key: impl Into<String>, result: i64) -> Self {
        Self {
            key: key.into(),
            result,
        }
    }
}

/// Response body for `GET /keys`; keys are sorted.
#[derive(Debug, Clone, Serialize)]
pub struct KeysResponse {
    pub pattern: String,
    pub keys: Vec<String>,
}

impl KeysResponse {
    pub fn new(pattern: impl Into<String>, mut keys: Vec<String>) -> Self {
        keys.sort();
        Self {
            pattern: pattern.into(),
            keys,
        }
    }
}

/// Response body for `GET /stats`.
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub total_entries: usize,
    pub hit_rate: f64,
}

impl From<StoreStats> for StatsResponse {
    fn from(stats: StoreStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            hits: stats.hits,
            misses: stats.misses,
            evictions: stats.evictions,
            total_entries: stats.total_entries,
        }
    }
}

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    /// Current timestamp in RFC 3339 format
    pub timestamp: String,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_response_keeps_json_shape() {
        let resp = GetResponse::new("user:1", json!({"id": 1}));
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json, json!({"key": "user:1", "value": {"id": 1}}));

        let resp = GetResponse::new("h", json!("v")).with_field("f");
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["field"], "f");
    }

    #[test]
    fn test_status_response_null_when_not_written() {
        let json = serde_json::to_value(StatusResponse::new("k", None)).unwrap();
        assert_eq!(json, json!({"key": "k", "status": null}));
    }

    #[test]
    fn test_keys_response_sorted() {
        let resp = KeysResponse::new("user:*", vec!["user:2".into(), "user:1".into()]);
        assert_eq!(resp.keys, vec!["user:1", "user:2"]);
    }

    #[test]
    fn test_stats_response_hit_rate() {
        let stats = StoreStats {
            hits: 80,
            misses: 20,
            evictions: 5,
            total_entries: 100,
        };
        let resp = StatsResponse::from(stats);
        assert!((resp.hit_rate - 0.8).abs() < 0.001);
        assert_eq!(resp.total_entries, 100);
    }

    #[test]
    fn test_health_response_serialize() {
        let json = serde_json::to_string(&HealthResponse::healthy()).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }
}
