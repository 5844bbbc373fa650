//! Aspect Module
//!
//! Cache policies that wrap async operations with read-through, write-through,
//! conditional-write and eviction behavior.
//!
//! A [`CachePolicy`] is built once per operation: a name prefix, a key template
//! and the operation's parameter names. Each call binds the arguments, resolves
//! the key and consults the [`CacheFacade`]. Cache failures are absorbed by the
//! facade; only the wrapped operation's own error ever reaches the caller.
//!
//! ```ignore
//! let policy = CachePolicy::cacheable("user:", "{user_id}", Some(Duration::from_secs(60)))
//!     .with_params(ParamNames::new(["user_id"]));
//! let user = policy
//!     .apply(&facade, &[json!(42)], || repo.find_user(42))
//!     .await?;
//! ```

mod wrap;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::facade::CacheFacade;
use crate::key::{KeyTemplate, ParamNames};

pub use wrap::Cached;

/// Decides from `(result, args)` whether a fresh result is written to the cache.
pub type Predicate = Arc<dyn Fn(&Value, &[Value]) -> bool + Send + Sync>;

// == Policy Kind ==
#[derive(Clone)]
pub enum PolicyKind {
    /// Serve hits from the cache; compute and store on a miss.
    Cacheable,
    /// Always compute, then overwrite the cache entry.
    CachePut,
    /// Compute, then delete the cache entry.
    CacheEvict,
    /// Like `Cacheable`, but a miss is only stored when the predicate agrees.
    CacheConditional(Predicate),
}

impl PolicyKind {
    pub fn name(&self) -> &'static str {
        match self {
            PolicyKind::Cacheable => "cacheable",
            PolicyKind::CachePut => "cache_put",
            PolicyKind::CacheEvict => "cache_evict",
            PolicyKind::CacheConditional(_) => "cache_conditional",
        }
    }
}

impl std::fmt::Debug for PolicyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// == Cache Policy ==
#[derive(Debug, Clone)]
pub struct CachePolicy {
    name_prefix: String,
    template: KeyTemplate,
    params: ParamNames,
    ttl: Option<Duration>,
    kind: PolicyKind,
}

impl CachePolicy {
    fn new(
        kind: PolicyKind,
        name_prefix: impl Into<String>,
        template: impl Into<KeyTemplate>,
        ttl: Option<Duration>,
    ) -> Self {
        Self {
            name_prefix: name_prefix.into(),
            template: template.into(),
            params: ParamNames::default(),
            ttl,
            kind,
        }
    }

    // == Factories ==
    /// Read-through caching under `name_prefix + template`.
    pub fn cacheable(
        name_prefix: impl Into<String>,
        template: impl Into<KeyTemplate>,
        ttl: Option<Duration>,
    ) -> Self {
        Self::new(PolicyKind::Cacheable, name_prefix, template, ttl)
    }

    /// Write-through: the entry is refreshed after every successful call.
    pub fn cache_put(
        name_prefix: impl Into<String>,
        template: impl Into<KeyTemplate>,
        ttl: Option<Duration>,
    ) -> Self {
        Self::new(PolicyKind::CachePut, name_prefix, template, ttl)
    }

    /// Deletes the entry after every successful call.
    pub fn cache_evict(name_prefix: impl Into<String>, template: impl Into<KeyTemplate>) -> Self {
        Self::new(PolicyKind::CacheEvict, name_prefix, template, None)
    }

    /// Read-through caching where `predicate(result, args)` gates each write.
    pub fn cache_conditional<P>(
        name_prefix: impl Into<String>,
        template: impl Into<KeyTemplate>,
        predicate: P,
        ttl: Option<Duration>,
    ) -> Self
    where
        P: Fn(&Value, &[Value]) -> bool + Send + Sync + 'static,
    {
        Self::new(
            PolicyKind::CacheConditional(Arc::new(predicate)),
            name_prefix,
            template,
            ttl,
        )
    }

    /// Declares the wrapped operation's parameter names for `{name}` placeholders.
    pub fn with_params(mut self, params: ParamNames) -> Self {
        self.params = params;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn kind(&self) -> &PolicyKind {
        &self.kind
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Full cache key for `args`, or `None` when the template cannot be resolved.
    pub fn resolve_key(&self, args: &[Value]) -> Option<String> {
        let key = self.template.resolve(&self.params, args)?;
        Some(format!("{}{}", self.name_prefix, key))
    }

    /// Binds `target` to `facade` under this policy.
    pub fn wrap<F>(self, facade: CacheFacade, target: F) -> Cached<F> {
        Cached::new(facade, self, target)
    }

    // == Apply ==
    /// Runs one call of `target` with `args` under this policy.
    ///
    /// `args` only feed key resolution and the predicate; `target` already has
    /// whatever it needs captured.
    pub async fn apply<T, E, F, Fut>(
        &self,
        facade: &CacheFacade,
        args: &[Value],
        target: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        match &self.kind {
            PolicyKind::Cacheable => self.read_through(facade, args, target, None).await,
            PolicyKind::CacheConditional(predicate) => {
                self.read_through(facade, args, target, Some(predicate)).await
            }
            PolicyKind::CachePut => {
                let result = target().await?;
                if let Some(key) = self.resolve_key(args) {
                    facade.set(&key, &result, self.ttl).await;
                }
                Ok(result)
            }
            PolicyKind::CacheEvict => {
                let result = target().await?;
                self.evict(facade, args).await;
                Ok(result)
            }
        }
    }

    async fn read_through<T, E, F, Fut>(
        &self,
        facade: &CacheFacade,
        args: &[Value],
        target: F,
        predicate: Option<&Predicate>,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let op = self.kind.name();
        let Some(key) = self.resolve_key(args) else {
            return target().await;
        };

        if let Some(hit) = facade.get_as::<T>(&key).await {
            facade.log().debug(op, &format!("Cache hit for key {}", key));
            return Ok(hit);
        }
        facade.log().debug(op, &format!("Cache miss for key {}", key));

        let result = target().await?;

        let store = match predicate {
            None => true,
            Some(predicate) => match serde_json::to_value(&result) {
                Ok(value) => predicate(&value, args),
                Err(e) => {
                    facade
                        .log()
                        .warn(op, &format!("Cannot evaluate condition for key {}: {}", key, e));
                    false
                }
            },
        };
        if store {
            facade.set(&key, &result, self.ttl).await;
        }
        Ok(result)
    }

    async fn evict(&self, facade: &CacheFacade, args: &[Value]) {
        let op = self.kind.name();
        let Some(resolved) = self.template.resolve(&self.params, args) else {
            return;
        };
        if resolved == "*" {
            facade.log().warn(
                op,
                &format!(
                    "Wildcard eviction under {} is not supported; nothing deleted",
                    self.name_prefix
                ),
            );
            return;
        }
        let key = format!("{}{}", self.name_prefix, resolved);
        if facade.del(key.as_str()).await > 0 {
            facade.log().debug(op, &format!("Evicted key {}", key));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;
    use crate::facade::test_support::{memory_facade, BrokenStore, RecordingLog};

    fn counting<'a, T: 'a>(
        calls: &'a AtomicUsize,
        value: T,
    ) -> impl FnOnce() -> std::future::Ready<Result<T, String>> + 'a {
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok(value))
        }
    }

    #[test]
    fn test_resolve_key_with_prefix() {
        let policy = CachePolicy::cacheable("user:", "{0}:{kind}", None)
            .with_params(ParamNames::new(["id", "kind"]));
        assert_eq!(
            policy.resolve_key(&[json!(7), json!("full")]).as_deref(),
            Some("user:7:full")
        );
        assert_eq!(policy.resolve_key(&[json!(7)]), None);
    }

    #[tokio::test]
    async fn test_cacheable_runs_target_once() {
        let cache = memory_facade();
        let calls = AtomicUsize::new(0);
        let policy = CachePolicy::cacheable("user:", "{0}", None);
        let args = [json!(123)];

        let first: Result<Value, String> = policy
            .apply(&cache, &args, counting(&calls, json!({"id": 123})))
            .await;
        let second: Result<Value, String> = policy
            .apply(&cache, &args, counting(&calls, json!({"id": 999})))
            .await;

        assert_eq!(first, Ok(json!({"id": 123})));
        assert_eq!(second, Ok(json!({"id": 123})));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get("user:123").await, Some(json!({"id": 123})));
    }

    #[tokio::test]
    async fn test_cacheable_does_not_cache_errors() {
        let cache = memory_facade();
        let policy = CachePolicy::cacheable("user:", "{0}", None);
        let args = [json!(1)];

        for _ in 0..2 {
            let result: Result<String, String> = policy
                .apply(&cache, &args, || async { Err("db down".to_string()) })
                .await;
            assert_eq!(result, Err("db down".to_string()));
        }
        assert!(!cache.has_key("user:1").await);

        let result: Result<String, String> = policy
            .apply(&cache, &args, || async { Ok("alice".to_string()) })
            .await;
        assert_eq!(result, Ok("alice".to_string()));
        assert_eq!(cache.get("user:1").await, Some(json!("alice")));
    }

    #[tokio::test]
    async fn test_unresolvable_key_bypasses_cache() {
        let cache = memory_facade();
        let calls = AtomicUsize::new(0);
        let policy = CachePolicy::cacheable("user:", "{user_id}", None);

        for _ in 0..2 {
            let _: Result<i32, String> =
                policy.apply(&cache, &[json!(1)], counting(&calls, 5)).await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(cache.keys("user:*").await.is_empty());
    }

    #[tokio::test]
    async fn test_ttl_is_applied() {
        let cache = memory_facade();
        let calls = AtomicUsize::new(0);
        let policy = CachePolicy::cacheable("t:", "{0}", None).with_ttl(Duration::ZERO);

        for _ in 0..2 {
            let _: Result<i32, String> =
                policy.apply(&cache, &[json!(1)], counting(&calls, 5)).await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cache_put_overwrites() {
        let cache = memory_facade();
        cache.set("user:1", &json!({"name": "old"}), None).await;
        let policy = CachePolicy::cache_put("user:", "{0}", None);

        let result: Result<Value, String> = policy
            .apply(&cache, &[json!(1)], || async { Ok(json!({"name": "new"})) })
            .await;
        assert_eq!(result, Ok(json!({"name": "new"})));
        assert_eq!(cache.get("user:1").await, Some(json!({"name": "new"})));
    }

    #[tokio::test]
    async fn test_cache_put_error_leaves_entry() {
        let cache = memory_facade();
        cache.set("user:1", "old", None).await;
        let policy = CachePolicy::cache_put("user:", "{0}", None);

        let result: Result<String, String> = policy
            .apply(&cache, &[json!(1)], || async { Err("boom".to_string()) })
            .await;
        assert!(result.is_err());
        assert_eq!(cache.get("user:1").await, Some(json!("old")));
    }

    #[tokio::test]
    async fn test_evict_then_recompute() {
        let cache = memory_facade();
        let calls = AtomicUsize::new(0);
        let read = CachePolicy::cacheable("user:", "{0}", None);
        let evict = CachePolicy::cache_evict("user:", "{0}");
        let args = [json!(5)];

        let _: Result<i32, String> = read.apply(&cache, &args, counting(&calls, 1)).await;
        let _: Result<(), String> = evict.apply(&cache, &args, || async { Ok(()) }).await;
        assert!(!cache.has_key("user:5").await);

        let _: Result<i32, String> = read.apply(&cache, &args, counting(&calls, 1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_evict_skipped_when_target_fails() {
        let cache = memory_facade();
        cache.set("user:5", &1, None).await;
        let evict = CachePolicy::cache_evict("user:", "{0}");

        let result: Result<(), String> = evict
            .apply(&cache, &[json!(5)], || async { Err("nope".to_string()) })
            .await;
        assert!(result.is_err());
        assert!(cache.has_key("user:5").await);
    }

    #[tokio::test]
    async fn test_evict_wildcard_deletes_nothing() {
        let log = Arc::new(RecordingLog::default());
        let cache = memory_facade().with_logger(log.clone());
        cache.set("user:1", &1, None).await;
        let evict = CachePolicy::cache_evict("user:", "*");

        let result: Result<i32, String> = evict.apply(&cache, &[], || async { Ok(3) }).await;
        assert_eq!(result, Ok(3));
        assert!(cache.has_key("user:1").await);
        assert_eq!(log.count("warn", "cache_evict"), 1);
    }

    #[tokio::test]
    async fn test_conditional_false_never_writes() {
        let cache = memory_facade();
        let calls = AtomicUsize::new(0);
        let policy = CachePolicy::cache_conditional("c:", "{0}", |_, _| false, None);

        for _ in 0..3 {
            let _: Result<i32, String> =
                policy.apply(&cache, &[json!(1)], counting(&calls, 4)).await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(!cache.has_key("c:1").await);
    }

    #[tokio::test]
    async fn test_conditional_sees_result_and_args() {
        let cache = memory_facade();
        let calls = AtomicUsize::new(0);
        let policy = CachePolicy::cache_conditional(
            "c:",
            "{0}",
            |result, args| result.as_array().is_some_and(|r| !r.is_empty()) && args.len() == 1,
            None,
        );

        let _: Result<Vec<i32>, String> =
            policy.apply(&cache, &[json!("a")], counting(&calls, vec![])).await;
        let _: Result<Vec<i32>, String> =
            policy.apply(&cache, &[json!("a")], counting(&calls, vec![])).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let _: Result<Vec<i32>, String> =
            policy.apply(&cache, &[json!("b")], counting(&calls, vec![1])).await;
        let hit: Result<Vec<i32>, String> =
            policy.apply(&cache, &[json!("b")], counting(&calls, vec![9])).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(hit, Ok(vec![1]));
    }

    #[tokio::test]
    async fn test_conditional_predicate_skipped_on_hit() {
        let cache = memory_facade();
        let calls = AtomicUsize::new(0);
        let checks = Arc::new(AtomicUsize::new(0));
        let seen = checks.clone();
        let policy = CachePolicy::cache_conditional(
            "c:",
            "{0}",
            move |_, _| {
                seen.fetch_add(1, Ordering::SeqCst);
                true
            },
            None,
        );

        let first: Result<i32, String> =
            policy.apply(&cache, &[json!(1)], counting(&calls, 7)).await;
        assert_eq!(first, Ok(7));
        assert_eq!(checks.load(Ordering::SeqCst), 1);

        for _ in 0..2 {
            let hit: Result<i32, String> =
                policy.apply(&cache, &[json!(1)], counting(&calls, 8)).await;
            assert_eq!(hit, Ok(7));
        }
        assert_eq!(checks.load(Ordering::SeqCst), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_mismatched_cached_shape_is_a_miss() {
        let cache = memory_facade();
        cache.set("n:1", "not a number", None).await;
        let calls = AtomicUsize::new(0);
        let policy = CachePolicy::cacheable("n:", "{0}", None);

        let result: Result<i64, String> =
            policy.apply(&cache, &[json!(1)], counting(&calls, 10)).await;
        assert_eq!(result, Ok(10));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get("n:1").await, Some(json!(10)));
    }

    #[tokio::test]
    async fn test_broken_store_degrades_to_always_compute() {
        let log = Arc::new(RecordingLog::default());
        let cache = CacheFacade::new(Arc::new(BrokenStore)).with_logger(log.clone());
        let calls = AtomicUsize::new(0);
        let read = CachePolicy::cacheable("user:", "{0}", None);
        let evict = CachePolicy::cache_evict("user:", "{0}");

        for _ in 0..2 {
            let result: Result<i32, String> =
                read.apply(&cache, &[json!(1)], counting(&calls, 8)).await;
            assert_eq!(result, Ok(8));
        }
        let result: Result<i32, String> =
            evict.apply(&cache, &[json!(1)], || async { Ok(1) }).await;
        assert_eq!(result, Ok(1));

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(log.count("error", "get"), 2);
        assert_eq!(log.count("error", "set"), 2);
        assert_eq!(log.count("error", "del"), 1);
    }
}
