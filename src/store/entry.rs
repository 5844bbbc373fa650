//! Stored Entry Module
//!
//! A raw (already JSON-encoded) value held by the memory store, with its expiry.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

// == Stored Entry ==
/// One row of the memory store.
#[derive(Debug, Clone)]
pub struct StoredEntry {
    /// Raw value text as handed to the store
    pub value: String,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
}

impl StoredEntry {
    /// Creates an entry expiring `ttl` from now, or never.
    pub fn new(value: String, ttl: Option<Duration>) -> Self {
        let expires_at =
            ttl.map(|ttl| current_timestamp_ms().saturating_add(ttl.as_millis() as u64));
        Self { value, expires_at }
    }

    /// An entry is expired once the current time reaches its expiration time.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        self.expires_at.is_some_and(|expires| now_ms >= expires)
    }
}

/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_without_ttl_never_expires() {
        let entry = StoredEntry::new("\"v\"".to_string(), None);
        assert!(entry.expires_at.is_none());
        assert!(!entry.is_expired_at(u64::MAX));
    }

    #[test]
    fn test_entry_with_ttl() {
        let entry = StoredEntry::new("1".to_string(), Some(Duration::from_secs(60)));
        assert!(!entry.is_expired());
        let expires = entry.expires_at.unwrap();
        assert!(entry.is_expired_at(expires));
        assert!(!entry.is_expired_at(expires - 1));
    }

    #[test]
    fn test_zero_ttl_is_expired_immediately() {
        let entry = StoredEntry::new("1".to_string(), Some(Duration::ZERO));
        assert!(entry.is_expired());
    }
}
