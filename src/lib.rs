//! Cache Shim - declarative method caching over a flat key-value store
//!
//! Provides cache policies that wrap async operations (read-through,
//! write-through, conditional write, eviction) and a Redis-style command facade
//! emulating existence checks, guarded sets, hash fields and prefix key listing
//! on top of a store that only offers get, set, delete and clear.

pub mod api;
pub mod aspect;
pub mod config;
pub mod error;
pub mod facade;
pub mod key;
pub mod log;
pub mod models;
pub mod store;
pub mod tasks;

pub use api::AppState;
pub use aspect::{CachePolicy, Cached, PolicyKind};
pub use config::Config;
pub use error::{CacheError, Result};
pub use facade::{CacheFacade, KeyList, KeyScanner, MsetEntry};
pub use key::{resolve_key, KeyTemplate, ParamNames};
pub use log::{CacheLog, TracingLog};
pub use store::{FlatStore, KeyRow, MemoryStore, RawQuery};
pub use tasks::spawn_cleanup_task;
