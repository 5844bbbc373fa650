//! PostgreSQL flat store.
//!
//! One row per key in `<schema>.<table>`; values are opaque text and expiry is an
//! absolute Unix millisecond timestamp checked on read.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_postgres::{Config as PoolConfig, ManagerConfig, Pool, RecyclingMethod, Runtime};
use tokio_postgres::types::ToSql;
use tokio_postgres::NoTls;
use tracing::info;

use super::{current_timestamp_ms, FlatStore, KeyRow, RawQuery};
use crate::config::Config;
use crate::error::{CacheError, Result};

pub struct PostgresStore {
    pool: Pool,
    /// Quoted `"schema"."table"`
    table: String,
    namespace: Option<String>,
    unlogged: bool,
}

fn validate_identifier(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.len() <= 63
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(CacheError::InvalidRequest(format!("invalid identifier: {}", name)))
    }
}

/// Absolute expiry in ms for a `BIGINT` column, clamped instead of wrapping.
fn expiry_ms(ttl: Duration) -> i64 {
    let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
    let at = current_timestamp_ms().saturating_add(ttl_ms);
    i64::try_from(at).unwrap_or(i64::MAX)
}

impl PostgresStore {
    pub fn new(
        url: &str,
        schema: &str,
        table: &str,
        namespace: Option<String>,
        unlogged: bool,
    ) -> Result<Self> {
        validate_identifier(schema)?;
        validate_identifier(table)?;

        let mut cfg = PoolConfig::new();
        cfg.url = Some(url.into());
        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| CacheError::Store(e.to_string()))?;

        Ok(Self {
            pool,
            table: format!("\"{}\".\"{}\"", schema, table),
            namespace,
            unlogged,
        })
    }

    /// Builds the store from `DATABASE_URL` and the table settings.
    pub fn from_config(config: &Config) -> Result<Self> {
        let url = config
            .database_url
            .as_deref()
            .ok_or_else(|| CacheError::InvalidRequest("DATABASE_URL is not set".to_string()))?;
        Self::new(
            url,
            &config.schema,
            &config.table,
            config.namespace.clone(),
            config.use_unlogged_table,
        )
    }

    /// Creates the key table if it does not exist yet.
    pub async fn init_schema(&self) -> Result<()> {
        let unlogged = if self.unlogged { "UNLOGGED " } else { "" };
        let sql = format!(
            "CREATE {}TABLE IF NOT EXISTS {} (key VARCHAR(255) PRIMARY KEY, value TEXT, expires BIGINT)",
            unlogged, self.table
        );
        self.pool.get().await?.batch_execute(&sql).await?;
        info!(table = %self.table, "PostgreSQL cache table initialized");
        Ok(())
    }

    fn physical_key(&self, key: &str) -> String {
        match &self.namespace {
            Some(ns) => format!("{}:{}", ns, key),
            None => key.to_string(),
        }
    }
}

#[async_trait]
impl FlatStore for PostgresStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let key = self.physical_key(key);
        let conn = self.pool.get().await?;
        let sql = format!("SELECT value, expires FROM {} WHERE key = $1", self.table);
        let Some(row) = conn.query_opt(sql.as_str(), &[&key]).await? else {
            return Ok(None);
        };

        let expires: Option<i64> = row.try_get("expires")?;
        let now = i64::try_from(current_timestamp_ms()).unwrap_or(i64::MAX);
        if expires.is_some_and(|at| now >= at) {
            let sql = format!("DELETE FROM {} WHERE key = $1", self.table);
            conn.execute(sql.as_str(), &[&key]).await?;
            return Ok(None);
        }
        Ok(row.try_get("value")?)
    }

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<bool> {
        let key = self.physical_key(key);
        let expires = ttl.map(expiry_ms);
        let sql = format!(
            "INSERT INTO {} (key, value, expires) VALUES ($1, $2, $3) \
             ON CONFLICT (key) DO UPDATE SET value = excluded.value, expires = excluded.expires",
            self.table
        );
        let written = self
            .pool
            .get()
            .await?
            .execute(sql.as_str(), &[&key, &value, &expires])
            .await?;
        Ok(written > 0)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let key = self.physical_key(key);
        let sql = format!("DELETE FROM {} WHERE key = $1", self.table);
        let removed = self.pool.get().await?.execute(sql.as_str(), &[&key]).await?;
        Ok(removed > 0)
    }

    async fn clear(&self) -> Result<()> {
        let sql = format!("DELETE FROM {}", self.table);
        self.pool.get().await?.execute(sql.as_str(), &[]).await?;
        Ok(())
    }

    fn raw_query(&self) -> Option<&dyn RawQuery> {
        Some(self)
    }
}

#[async_trait]
impl RawQuery for PostgresStore {
    async fn query(&self, sql: &str, params: &[String]) -> Result<Vec<KeyRow>> {
        let params: Vec<&(dyn ToSql + Sync)> =
            params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();
        let rows = self.pool.get().await?.query(sql, &params).await?;
        rows.iter()
            .map(|row| -> Result<KeyRow> {
                Ok(KeyRow {
                    key: row.try_get("key")?,
                    value: row.try_get::<_, Option<String>>("value").ok().flatten(),
                })
            })
            .collect()
    }
}
