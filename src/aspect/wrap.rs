//! A cache policy bound to its facade and operation.

use std::future::Future;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::CachePolicy;
use crate::facade::CacheFacade;

/// Operation wrapped by a [`CachePolicy`]; built with [`CachePolicy::wrap`].
///
/// The target receives the call's arguments, so the same values drive both the
/// computation and the cache key.
#[derive(Debug, Clone)]
pub struct Cached<F> {
    facade: CacheFacade,
    policy: CachePolicy,
    target: F,
}

impl<F> Cached<F> {
    pub(super) fn new(facade: CacheFacade, policy: CachePolicy, target: F) -> Self {
        Self {
            facade,
            policy,
            target,
        }
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    pub async fn call<T, E, Fut>(&self, args: Vec<Value>) -> Result<T, E>
    where
        F: Fn(Vec<Value>) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        T: Serialize + DeserializeOwned,
    {
        let target_args = args.clone();
        self.policy
            .apply(&self.facade, &args, || (self.target)(target_args))
            .await
    }
}
