//! API Module
//!
//! HTTP command surface over the cache facade.
//!
//! # Endpoints
//! - `PUT /set`, `PUT /setnx`, `PUT /setex` - Write a JSON value
//! - `GET /get/:key` - Read a value
//! - `DELETE /del/:key` - Delete a key
//! - `GET /exists/:key`, `GET /strlen/:key` - Inspect a key
//! - `PUT /hset`, `GET /hget/:key/:field`, `DELETE /hdel/:key/:field` - Hash fields
//! - `GET /keys?pattern=` - Exact or trailing-wildcard key listing
//! - `POST /reset` - Clear the store
//! - `GET /stats` - Memory store statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
