//! Configuration Module
//!
//! Handles loading cache shim configuration from environment variables.

use std::env;
use std::time::Duration;

use crate::facade::KeyScanner;

/// Cache shim configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries the in-memory store can hold
    pub max_entries: usize,
    /// Default TTL in milliseconds for entries written without one (None = never expire)
    pub default_ttl_ms: Option<u64>,
    /// HTTP server port
    pub server_port: u16,
    /// Background cleanup task interval in seconds
    pub cleanup_interval: u64,
    /// Namespace the flat store prefixes physical keys with
    pub namespace: Option<String>,
    /// Table holding one row per key
    pub table: String,
    /// Schema of the table
    pub schema: String,
    /// PostgreSQL connection string, if a database-backed store is used
    pub database_url: Option<String>,
    /// Create the table as UNLOGGED (faster, not crash-safe)
    pub use_unlogged_table: bool,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_ENTRIES` - Maximum in-memory entries (default: 1000)
    /// - `DEFAULT_TTL_MS` - Default TTL in milliseconds (default: unset)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Cleanup frequency in seconds (default: 1)
    /// - `CACHE_NAMESPACE` - Physical key namespace (default: "keyv", empty disables)
    /// - `CACHE_TABLE` - Table name (default: "keyv")
    /// - `CACHE_SCHEMA` - Schema name (default: "public")
    /// - `DATABASE_URL` - PostgreSQL connection string (default: unset)
    /// - `USE_UNLOGGED_TABLE` - "true" or "1" to create an UNLOGGED table
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_entries: parse_var("MAX_ENTRIES").unwrap_or(defaults.max_entries),
            default_ttl_ms: parse_var("DEFAULT_TTL_MS"),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            cleanup_interval: parse_var("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
            namespace: match env::var("CACHE_NAMESPACE") {
                Ok(ns) if ns.is_empty() => None,
                Ok(ns) => Some(ns),
                Err(_) => defaults.namespace,
            },
            table: env::var("CACHE_TABLE").unwrap_or(defaults.table),
            schema: env::var("CACHE_SCHEMA").unwrap_or(defaults.schema),
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
            use_unlogged_table: env::var("USE_UNLOGGED_TABLE")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        }
    }

    /// Default TTL as a Duration.
    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl_ms.map(Duration::from_millis)
    }

    /// Builds the key scanner matching this store layout.
    pub fn scanner(&self) -> KeyScanner {
        KeyScanner::new(&self.schema, &self.table, self.namespace.as_deref())
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            default_ttl_ms: None,
            server_port: 3000,
            cleanup_interval: 1,
            namespace: Some("keyv".to_string()),
            table: "keyv".to_string(),
            schema: "public".to_string(),
            database_url: None,
            use_unlogged_table: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.max_entries, 1000);
        assert_eq!(config.default_ttl_ms, None);
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.cleanup_interval, 1);
        assert_eq!(config.namespace.as_deref(), Some("keyv"));
        assert_eq!(config.table, "keyv");
        assert!(!config.use_unlogged_table);
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("MAX_ENTRIES");
        env::remove_var("DEFAULT_TTL_MS");
        env::remove_var("SERVER_PORT");
        env::remove_var("CLEANUP_INTERVAL");
        env::remove_var("CACHE_NAMESPACE");
        env::remove_var("CACHE_TABLE");
        env::remove_var("CACHE_SCHEMA");

        let config = Config::from_env();
        assert_eq!(config.max_entries, 1000);
        assert_eq!(config.default_ttl(), None);
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.namespace.as_deref(), Some("keyv"));
        assert_eq!(config.schema, "public");
    }
}
