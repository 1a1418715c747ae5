//! Write operations that invalidate cached queries on success

use crate::key::QueryKey;
use crate::state::{MutationState, MutationStatus};
use crate::store::{BoxFuture, QueryCache};
use chrono::Utc;
use loyalty_core::Result;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

type MutationFn<V, T> = Arc<dyn Fn(V) -> BoxFuture<Result<T>> + Send + Sync>;

/// A single request/response write bound to a cache.
///
/// Each [`mutate`](Mutation::mutate) call moves the state to loading, then to
/// success or error. Only after a success is recorded are the configured key
/// prefixes invalidated; a failure leaves the cache untouched.
pub struct Mutation<V, T> {
    cache: Arc<QueryCache>,
    run: MutationFn<V, T>,
    invalidates: Vec<QueryKey>,
    state: watch::Sender<MutationState<T>>,
}

impl<V, T> Mutation<V, T>
where
    V: Send + 'static,
    T: Send + Sync + 'static,
{
    pub fn new<F, Fut>(cache: Arc<QueryCache>, run: F) -> Self
    where
        F: Fn(V) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let run: MutationFn<V, T> = Arc::new(move |variables| -> BoxFuture<Result<T>> {
            Box::pin(run(variables))
        });
        let (state, _) = watch::channel(MutationState::idle());
        Self {
            cache,
            run,
            invalidates: Vec::new(),
            state,
        }
    }

    /// Invalidate every query under `prefix` after each successful run
    pub fn invalidates(mut self, prefix: impl Into<QueryKey>) -> Self {
        self.invalidates.push(prefix.into());
        self
    }

    pub fn state(&self) -> MutationState<T> {
        self.state.borrow().clone()
    }

    /// Receiver that sees every state transition of this mutation
    pub fn subscribe(&self) -> watch::Receiver<MutationState<T>> {
        self.state.subscribe()
    }

    /// Run the write. Errors are recorded in the state and returned as-is.
    pub async fn mutate(&self, variables: V) -> Result<Arc<T>> {
        let submitted_at = Utc::now();
        self.state.send_modify(|s| {
            s.status = MutationStatus::Loading;
            s.error = None;
            s.submitted_at = Some(submitted_at);
        });

        match (self.run)(variables).await {
            Ok(data) => {
                let data = Arc::new(data);
                self.state.send_modify(|s| {
                    s.status = MutationStatus::Success;
                    s.data = Some(Arc::clone(&data));
                    s.error = None;
                });
                for prefix in &self.invalidates {
                    self.cache.invalidate_queries(prefix);
                }
                Ok(data)
            }
            Err(err) => {
                debug!(error = %err, "mutation failed, cache left untouched");
                self.state.send_modify(|s| {
                    s.status = MutationStatus::Error;
                    s.error = Some(err.clone());
                });
                Err(err)
            }
        }
    }

    /// Back to idle, forgetting the last data and error
    pub fn reset(&self) {
        self.state.send_replace(MutationState::idle());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use loyalty_core::Error;
    use std::time::Duration;

    fn cache() -> Arc<QueryCache> {
        Arc::new(QueryCache::new(CacheConfig::new(
            Duration::from_secs(60),
            Duration::from_secs(60),
        )))
    }

    #[tokio::test]
    async fn test_success_invalidates_prefix() {
        let cache = cache();
        cache.set_query_data(QueryKey::from(["loyalty", "ranks"]), 1_u8);
        cache.set_query_data(QueryKey::from(["other"]), 2_u8);

        let mutation = Mutation::new(Arc::clone(&cache), |n: i64| async move { Ok(n * 2) })
            .invalidates(["loyalty"]);
        assert_eq!(mutation.state().status, MutationStatus::Idle);

        let out = mutation.mutate(21).await.unwrap();

        assert_eq!(*out, 42);
        assert!(mutation.state().is_success());
        assert_eq!(mutation.state().data.as_deref(), Some(&42));
        assert_eq!(cache.is_stale(&QueryKey::from(["loyalty", "ranks"])), Some(true));
        assert_eq!(cache.is_stale(&QueryKey::from(["other"])), Some(false));
    }

    #[tokio::test]
    async fn test_failure_leaves_cache_untouched() {
        let cache = cache();
        cache.set_query_data(QueryKey::from(["loyalty", "ranks"]), 1_u8);

        let mutation = Mutation::new(Arc::clone(&cache), |_: ()| async move {
            Err::<u8, _>(Error::ApiError {
                status: 500,
                message: "internal".to_string(),
            })
        })
        .invalidates(["loyalty"]);

        let err = mutation.mutate(()).await.unwrap_err();

        assert_eq!(err.status(), Some(500));
        let state = mutation.state();
        assert!(state.is_error());
        assert_eq!(state.error, Some(err));
        assert_eq!(cache.is_stale(&QueryKey::from(["loyalty", "ranks"])), Some(false));
    }

    #[tokio::test]
    async fn test_reset_returns_to_idle() {
        let mutation = Mutation::new(cache(), |_: ()| async move { Ok(()) });
        mutation.mutate(()).await.unwrap();
        mutation.reset();
        assert_eq!(mutation.state().status, MutationStatus::Idle);
        assert!(mutation.state().data.is_none());
    }
}
