//! Logging collaborator injected into the facade.
//!
//! Store operations report through a [`CacheLog`] handed to the facade instead of
//! calling global macros directly, so embedders and tests can observe them.

use std::sync::Arc;

use tracing::{debug, error, warn};

/// Structured log sink used by [`crate::facade::CacheFacade`].
///
/// `op` is the facade operation (`"get"`, `"hset"`, ...); `message` is free text.
pub trait CacheLog: Send + Sync {
    fn debug(&self, op: &str, message: &str);
    fn warn(&self, op: &str, message: &str);
    fn error(&self, op: &str, message: &str);
}

/// Default sink forwarding to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl CacheLog for TracingLog {
    fn debug(&self, op: &str, message: &str) {
        debug!(op, "{}", message);
    }

    fn warn(&self, op: &str, message: &str) {
        warn!(op, "{}", message);
    }

    fn error(&self, op: &str, message: &str) {
        error!(op, "{}", message);
    }
}

/// Shared handle to the default sink.
pub fn tracing_log() -> Arc<dyn CacheLog> {
    Arc::new(TracingLog)
}
