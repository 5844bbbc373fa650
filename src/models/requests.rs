//! Request DTOs for the command API
//!
//! Defines the structure of incoming HTTP request bodies.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

/// Maximum key length accepted over HTTP; matches the database key column.
pub const MAX_KEY_LENGTH: usize = 255;

fn validate_key(label: &str, key: &str) -> Option<String> {
    if key.is_empty() {
        return Some(format!("{} cannot be empty", label));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Some(format!(
            "{} exceeds maximum length of {} bytes",
            label, MAX_KEY_LENGTH
        ));
    }
    None
}

/// Request body for `PUT /set`, `PUT /setnx` and `PUT /setex`.
///
/// `value` is any JSON value; `ttl` is in milliseconds.
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    pub key: String,
    pub value: Value,
    #[serde(default)]
    pub ttl: Option<u64>,
}

impl SetRequest {
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        validate_key("Key", &self.key)
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl.map(Duration::from_millis)
    }
}

/// Request body for `PUT /hset`.
#[derive(Debug, Clone, Deserialize)]
pub struct HashSetRequest {
    pub key: String,
    pub field: String,
    pub value: Value,
}

impl HashSetRequest {
    pub fn validate(&self) -> Option<String> {
        validate_key("Key", &self.key)
            .or_else(|| validate_key("Field", &self.field))
            .or_else(|| {
                // The composite key `key:field` must fit as well
                (self.key.len() + 1 + self.field.len() > MAX_KEY_LENGTH)
                    .then(|| "Key and field together exceed the maximum key length".to_string())
            })
    }
}

/// Query string of `GET /keys`.
#[derive(Debug, Clone, Deserialize)]
pub struct KeysQuery {
    #[serde(default)]
    pub pattern: String,
}
