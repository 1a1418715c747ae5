//! Live handle on a cached query

use crate::key::QueryKey;
use crate::state::{QueryState, QueryStatus};
use crate::store::{downcast, settled_outcome, ErasedState, QueryCache};
use loyalty_core::{Error, Result};
use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::watch;

/// Subscription to one cache entry.
///
/// Keeps the entry alive (it is not garbage collected while any observer
/// exists) and exposes its state as it moves through idle, loading, success
/// and error. Dropping the observer releases the subscription.
pub struct QueryObserver<T> {
    cache: Arc<QueryCache>,
    key: QueryKey,
    entry_id: u64,
    receiver: watch::Receiver<ErasedState>,
    _data: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> QueryObserver<T> {
    pub(crate) fn new(
        cache: Arc<QueryCache>,
        key: QueryKey,
        entry_id: u64,
        receiver: watch::Receiver<ErasedState>,
    ) -> Self {
        Self {
            cache,
            key,
            entry_id,
            receiver,
            _data: PhantomData,
        }
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Latest state of the entry
    pub fn state(&self) -> QueryState<T> {
        self.receiver.borrow().clone().downcast()
    }

    /// Wait for the next state transition and return the new state
    pub async fn changed(&mut self) -> Result<QueryState<T>> {
        self.receiver
            .changed()
            .await
            .map_err(|_| Error::Unknown(format!("query {} was removed", self.key)))?;
        Ok(self.state())
    }

    /// Wait for any in-flight fetch to settle and return its outcome.
    ///
    /// An entry that was never fetched (subscribed outside a runtime) is
    /// fetched here.
    pub async fn result(&mut self) -> Result<Arc<T>> {
        let settled = self
            .receiver
            .wait_for(|s| !s.is_fetching)
            .await
            .map_err(|_| Error::Unknown(format!("query {} was removed", self.key)))?
            .clone();

        if settled.status == QueryStatus::Idle {
            return self.cache.fetch_registered(&self.key, false).await;
        }
        let value = settled_outcome(&self.key, settled)?;
        downcast(&self.key, value)
    }

    /// Fetch again even if the cached data is fresh
    pub async fn refetch(&self) -> Result<Arc<T>> {
        self.cache.fetch_registered(&self.key, true).await
    }
}

impl<T> Drop for QueryObserver<T> {
    fn drop(&mut self) {
        self.cache.release(&self.key, self.entry_id);
    }
}
