//! API Handlers
//!
//! HTTP request handlers for each command endpoint. Handlers call the facade
//! only; the memory store handle is kept for statistics.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use tracing::info;

use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::facade::CacheFacade;
use crate::models::{
    GetResponse, HashSetRequest, HealthResponse, IntegerResponse, KeysQuery, KeysResponse,
    SetRequest, StatsResponse, StatusResponse,
};
use crate::store::MemoryStore;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub cache: CacheFacade,
    pub store: Arc<MemoryStore>,
}

impl AppState {
    /// Serves `store` through a facade with the default key layout.
    pub fn new(store: MemoryStore) -> Self {
        let store = Arc::new(store);
        Self {
            cache: CacheFacade::new(store.clone()),
            store,
        }
    }

    /// Creates the store and facade from configuration.
    pub fn from_config(config: &Config) -> Self {
        let store = Arc::new(MemoryStore::from_config(config));
        Self {
            cache: CacheFacade::from_config(store.clone(), config),
            store,
        }
    }
}

fn validated(error: Option<String>) -> Result<()> {
    match error {
        Some(msg) => Err(CacheError::InvalidRequest(msg)),
        None => Ok(()),
    }
}

// == String Commands ==
/// Handler for PUT /set
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<StatusResponse>> {
    validated(req.validate())?;

    let status = state.cache.set(&req.key, &req.value, req.ttl()).await;
    if status.is_none() {
        return Err(CacheError::Store(format!("Failed to write key {}", req.key)));
    }
    info!(key = %req.key, "Key set");
    Ok(Json(StatusResponse::new(req.key, status)))
}

/// Handler for PUT /setnx
///
/// `result` is 1 when the key was written, 0 when it already held a value.
pub async fn setnx_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<IntegerResponse>> {
    validated(req.validate())?;

    let result = state.cache.setnx(&req.key, &req.value, req.ttl()).await;
    Ok(Json(IntegerResponse::new(req.key, result)))
}

/// Handler for PUT /setex
///
/// Updates an existing key only; `status` is null when the key was absent.
pub async fn setex_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<StatusResponse>> {
    validated(req.validate())?;

    let status = state.cache.setex(&req.key, &req.value, req.ttl()).await;
    Ok(Json(StatusResponse::new(req.key, status)))
}

/// Handler for GET /get/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    let value = state
        .cache
        .get(&key)
        .await
        .ok_or_else(|| CacheError::NotFound(key.clone()))?;
    Ok(Json(GetResponse::new(key, value)))
}

/// Handler for DELETE /del/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<IntegerResponse> {
    let removed = state.cache.del(key.as_str()).await;
    Json(IntegerResponse::new(key, removed as i64))
}

/// Handler for GET /exists/:key
pub async fn exists_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<IntegerResponse> {
    let result = state.cache.exists(&key).await;
    Json(IntegerResponse::new(key, result))
}

/// Handler for GET /strlen/:key
pub async fn strlen_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<IntegerResponse> {
    let len = state.cache.strlen(&key).await;
    Json(IntegerResponse::new(key, len as i64))
}

// == Hash Commands ==
/// Handler for PUT /hset
pub async fn hset_handler(
    State(state): State<AppState>,
    Json(req): Json<HashSetRequest>,
) -> Result<Json<StatusResponse>> {
    validated(req.validate())?;

    let status = state.cache.hset(&req.key, &req.field, &req.value).await;
    if status.is_none() {
        return Err(CacheError::Store(format!(
            "Failed to write field {} of {}",
            req.field, req.key
        )));
    }
    Ok(Json(StatusResponse::new(req.key, status)))
}

/// Handler for GET /hget/:key/:field
pub async fn hget_handler(
    State(state): State<AppState>,
    Path((key, field)): Path<(String, String)>,
) -> Result<Json<GetResponse>> {
    let value = state
        .cache
        .hget(&key, &field)
        .await
        .ok_or_else(|| CacheError::NotFound(format!("{}:{}", key, field)))?;
    Ok(Json(GetResponse::new(key, value).with_field(field)))
}

/// Handler for DELETE /hdel/:key/:field
pub async fn hdel_handler(
    State(state): State<AppState>,
    Path((key, field)): Path<(String, String)>,
) -> Json<IntegerResponse> {
    let removed = state.cache.hdel(&key, field).await;
    Json(IntegerResponse::new(key, removed as i64))
}

// == Keyspace ==
/// Handler for GET /keys?pattern=
///
/// Only exact keys and trailing-`*` prefixes match; anything else is empty.
pub async fn keys_handler(
    State(state): State<AppState>,
    Query(query): Query<KeysQuery>,
) -> Json<KeysResponse> {
    let keys = state.cache.keys(&query.pattern).await;
    Json(KeysResponse::new(query.pattern, keys))
}

/// Handler for POST /reset
pub async fn reset_handler(State(state): State<AppState>) -> Result<Json<StatusResponse>> {
    if !state.cache.reset().await {
        return Err(CacheError::Store("Failed to clear store".to_string()));
    }
    info!("Store cleared");
    Ok(Json(StatusResponse::new("*", Some(crate::facade::OK))))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::from(state.store.stats().await))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
