//! API Routes
//!
//! Configures the Axum router with all command endpoints.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    delete_handler, exists_handler, get_handler, hdel_handler, health_handler, hget_handler,
    hset_handler, keys_handler, reset_handler, set_handler, setex_handler, setnx_handler,
    stats_handler, strlen_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/set", put(set_handler))
        .route("/setnx", put(setnx_handler))
        .route("/setex", put(setex_handler))
        .route("/get/:key", get(get_handler))
        .route("/del/:key", delete(delete_handler))
        .route("/exists/:key", get(exists_handler))
        .route("/strlen/:key", get(strlen_handler))
        .route("/hset", put(hset_handler))
        .route("/hget/:key/:field", get(hget_handler))
        .route("/hdel/:key/:field", delete(hdel_handler))
        .route("/keys", get(keys_handler))
        .route("/reset", post(reset_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
