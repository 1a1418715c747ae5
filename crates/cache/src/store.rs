//! In-memory query cache with prefix invalidation and in-flight de-duplication

use crate::config::CacheConfig;
use crate::key::QueryKey;
use crate::observer::QueryObserver;
use crate::state::{QueryState, QueryStatus};
use chrono::Utc;
use loyalty_core::{Error, Result};
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Boxed future returned by type-erased fetchers and mutation functions
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

pub(crate) type CachedValue = Arc<dyn Any + Send + Sync>;
pub(crate) type ErasedState = QueryState<dyn Any + Send + Sync>;
pub(crate) type Fetcher = Arc<dyn Fn() -> BoxFuture<Result<CachedValue>> + Send + Sync>;

/// What a caller has to do to get an entry's data
enum FetchPlan {
    /// Data is fresh, no request needed
    Fresh(CachedValue),
    /// Another caller's request is in flight; wait on it
    Join(watch::Receiver<ErasedState>),
    /// Caller owns the request; the entry is already marked as fetching
    Start { fetcher: Fetcher, generation: u64 },
    /// No data and nothing registered that could fetch it
    Unfetchable,
}

struct CacheEntry {
    /// Distinguishes this entry from earlier ones removed under the same key
    id: u64,
    state: watch::Sender<ErasedState>,
    fetcher: Option<Fetcher>,
    fetched_at: Option<Instant>,
    /// Bumped on every invalidation so in-flight fetches can tell they are outdated
    generation: u64,
    observers: usize,
    inactive_since: Instant,
}

impl CacheEntry {
    fn new(id: u64) -> Self {
        let (state, _) = watch::channel(QueryState::idle());
        Self {
            id,
            state,
            fetcher: None,
            fetched_at: None,
            generation: 0,
            observers: 0,
            inactive_since: Instant::now(),
        }
    }

    fn is_fetching(&self) -> bool {
        self.state.borrow().is_fetching
    }

    fn is_stale(&self, config: &CacheConfig) -> bool {
        let state = self.state.borrow();
        if state.data.is_none() || state.is_invalidated || state.status == QueryStatus::Error {
            return true;
        }
        match self.fetched_at {
            Some(at) => at.elapsed() >= config.stale_time,
            None => true,
        }
    }

    fn plan_fetch(&mut self, fetcher: Option<Fetcher>, force: bool, config: &CacheConfig) -> FetchPlan {
        if let Some(fetcher) = fetcher {
            self.fetcher = Some(fetcher);
        }
        if self.is_fetching() {
            return FetchPlan::Join(self.state.subscribe());
        }

        let data = self.state.borrow().data.clone();
        if !force && !self.is_stale(config) {
            if let Some(data) = data {
                return FetchPlan::Fresh(data);
            }
        }

        let Some(fetcher) = self.fetcher.clone() else {
            return match data {
                Some(data) => FetchPlan::Fresh(data),
                None => FetchPlan::Unfetchable,
            };
        };

        self.state.send_modify(|s| {
            s.is_fetching = true;
            if s.data.is_none() {
                s.status = QueryStatus::Loading;
            }
        });
        FetchPlan::Start {
            fetcher,
            generation: self.generation,
        }
    }

    fn can_evict(&self, config: &CacheConfig) -> bool {
        self.observers == 0
            && !self.is_fetching()
            && self.inactive_since.elapsed() >= config.gc_time
    }
}

/// Process-wide query cache, passed explicitly (usually as `Arc<QueryCache>`)
///
/// Entries are keyed by [`QueryKey`] and hold type-erased data. At most one
/// fetch per key runs at a time; concurrent readers join it.
pub struct QueryCache {
    entries: RwLock<HashMap<QueryKey, CacheEntry>>,
    next_entry_id: AtomicU64,
    config: CacheConfig,
}

impl QueryCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            next_entry_id: AtomicU64::new(0),
            config,
        }
    }

    /// Entry for `key`, created empty if missing
    fn entry_mut<'a>(
        &self,
        entries: &'a mut HashMap<QueryKey, CacheEntry>,
        key: QueryKey,
    ) -> &'a mut CacheEntry {
        entries
            .entry(key)
            .or_insert_with(|| CacheEntry::new(self.next_entry_id.fetch_add(1, Ordering::Relaxed)))
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<QueryKey, CacheEntry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<QueryKey, CacheEntry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register an observer for `key`.
    ///
    /// A missing or stale entry is fetched in the background on the current
    /// tokio runtime; outside a runtime the first [`QueryObserver::result`]
    /// call performs the fetch instead.
    pub fn subscribe<T, F, Fut>(self: &Arc<Self>, key: QueryKey, fetch: F) -> QueryObserver<T>
    where
        T: Any + Send + Sync,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        self.collect_garbage();

        let fetcher = erase(fetch);
        let runtime = Handle::try_current().ok();

        let (entry_id, receiver, plan) = {
            let mut entries = self.write();
            let entry = self.entry_mut(&mut entries, key.clone());
            entry.observers += 1;
            let receiver = entry.state.subscribe();
            let plan = if runtime.is_some() {
                Some(entry.plan_fetch(Some(fetcher), false, &self.config))
            } else {
                entry.fetcher = Some(fetcher);
                None
            };
            (entry.id, receiver, plan)
        };

        if let (Some(runtime), Some(FetchPlan::Start { fetcher, generation })) = (&runtime, plan) {
            debug!(%key, "subscription triggered fetch");
            self.spawn_fetch(runtime, key.clone(), fetcher, generation);
        }

        QueryObserver::new(Arc::clone(self), key, entry_id, receiver)
    }

    /// Fresh cached data, the result of an in-flight fetch, or a new fetch
    pub async fn fetch_query<T, F, Fut>(self: &Arc<Self>, key: QueryKey, fetch: F) -> Result<Arc<T>>
    where
        T: Any + Send + Sync,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let plan = {
            let mut entries = self.write();
            let entry = self.entry_mut(&mut entries, key.clone());
            entry.inactive_since = Instant::now();
            entry.plan_fetch(Some(erase(fetch)), false, &self.config)
        };
        let value = self.execute(&key, plan).await?;
        downcast(&key, value)
    }

    /// Fetch through the entry's registered fetcher; `force` ignores freshness
    pub(crate) async fn fetch_registered<T>(self: &Arc<Self>, key: &QueryKey, force: bool) -> Result<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        let plan = {
            let mut entries = self.write();
            let entry = self.entry_mut(&mut entries, key.clone());
            entry.plan_fetch(None, force, &self.config)
        };
        let value = self.execute(key, plan).await?;
        downcast(key, value)
    }

    async fn execute(self: &Arc<Self>, key: &QueryKey, plan: FetchPlan) -> Result<CachedValue> {
        match plan {
            FetchPlan::Fresh(value) => {
                debug!(%key, "cache hit");
                Ok(value)
            }
            FetchPlan::Join(receiver) => {
                debug!(%key, "joining in-flight fetch");
                wait_settled(key, receiver).await
            }
            FetchPlan::Start { fetcher, generation } => {
                self.complete_fetch(key.clone(), fetcher, generation).await
            }
            FetchPlan::Unfetchable => Err(Error::Unknown(format!(
                "no fetcher registered for query {key}"
            ))),
        }
    }

    fn spawn_fetch(self: &Arc<Self>, runtime: &Handle, key: QueryKey, fetcher: Fetcher, generation: u64) {
        let cache = Arc::clone(self);
        runtime.spawn(async move {
            if let Err(e) = cache.complete_fetch(key.clone(), fetcher, generation).await {
                debug!(%key, error = %e, "background fetch failed");
            }
        });
    }

    async fn complete_fetch(
        self: &Arc<Self>,
        key: QueryKey,
        fetcher: Fetcher,
        generation: u64,
    ) -> Result<CachedValue> {
        debug!(%key, "fetching query");
        let mut in_flight = InFlight {
            cache: self,
            key: &key,
            generation,
            finished: false,
        };
        let result = fetcher().await;
        in_flight.finished = true;
        self.settle(&key, generation, &result);
        result
    }

    /// Record a finished fetch and refetch if the entry was invalidated meanwhile
    fn settle(self: &Arc<Self>, key: &QueryKey, generation: u64, result: &Result<CachedValue>) {
        let runtime = Handle::try_current().ok();

        let follow_up = {
            let mut entries = self.write();
            let Some(entry) = entries.get_mut(key) else {
                return;
            };

            let invalidated_meanwhile = entry.generation != generation;
            let now = Utc::now();
            entry.state.send_modify(|s| {
                s.is_fetching = false;
                s.is_invalidated = invalidated_meanwhile;
                match result {
                    Ok(value) => {
                        s.status = QueryStatus::Success;
                        s.data = Some(Arc::clone(value));
                        s.error = None;
                        s.data_updated_at = Some(now);
                    }
                    Err(e) => {
                        s.status = QueryStatus::Error;
                        s.error = Some(e.clone());
                        s.error_updated_at = Some(now);
                    }
                }
            });
            if result.is_ok() {
                entry.fetched_at = Some(Instant::now());
            }
            if entry.observers == 0 {
                entry.inactive_since = Instant::now();
            }

            if invalidated_meanwhile && entry.observers > 0 && runtime.is_some() {
                match entry.plan_fetch(None, false, &self.config) {
                    FetchPlan::Start { fetcher, generation } => Some((fetcher, generation)),
                    _ => None,
                }
            } else {
                None
            }
        };

        if let (Some(runtime), Some((fetcher, generation))) = (runtime, follow_up) {
            debug!(%key, "refetching query invalidated during fetch");
            self.spawn_fetch(&runtime, key.clone(), fetcher, generation);
        }
    }

    /// Mark every entry under `prefix` stale; observed entries refetch right away.
    ///
    /// Returns the number of entries matched.
    pub fn invalidate_queries(self: &Arc<Self>, prefix: &QueryKey) -> usize {
        let runtime = Handle::try_current().ok();
        let mut refetches = Vec::new();

        let matched = {
            let mut entries = self.write();
            let mut matched = 0;
            for (key, entry) in entries.iter_mut().filter(|(key, _)| key.starts_with(prefix)) {
                matched += 1;
                entry.generation += 1;
                entry.state.send_modify(|s| s.is_invalidated = true);

                if entry.observers > 0 && runtime.is_some() {
                    if let FetchPlan::Start { fetcher, generation } =
                        entry.plan_fetch(None, false, &self.config)
                    {
                        refetches.push((key.clone(), fetcher, generation));
                    }
                }
            }
            matched
        };

        debug!(%prefix, matched, active = refetches.len(), "invalidated queries");

        if let Some(runtime) = runtime {
            for (key, fetcher, generation) in refetches {
                self.spawn_fetch(&runtime, key, fetcher, generation);
            }
        }
        matched
    }

    /// Evict unobserved, idle entries past the GC window
    pub fn collect_garbage(&self) -> usize {
        let mut entries = self.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.can_evict(&self.config));
        let evicted = before - entries.len();
        if evicted > 0 {
            debug!(evicted, "collected unobserved queries");
        }
        evicted
    }

    /// Drop one observer of the entry `entry_id`; a newer entry under the same key is left alone
    pub(crate) fn release(&self, key: &QueryKey, entry_id: u64) {
        let mut entries = self.write();
        if let Some(entry) = entries.get_mut(key).filter(|entry| entry.id == entry_id) {
            entry.observers = entry.observers.saturating_sub(1);
            if entry.observers == 0 {
                entry.inactive_since = Instant::now();
            }
        }
    }

    /// Cached data for `key`, regardless of freshness
    pub fn get_query_data<T: Any + Send + Sync>(&self, key: &QueryKey) -> Option<Arc<T>> {
        let entries = self.read();
        let data = entries.get(key)?.state.borrow().data.clone()?;
        data.downcast::<T>().ok()
    }

    /// Seed or overwrite an entry as freshly fetched
    pub fn set_query_data<T: Any + Send + Sync>(&self, key: QueryKey, value: T) {
        let mut entries = self.write();
        let entry = self.entry_mut(&mut entries, key);
        let value: CachedValue = Arc::new(value);
        let now = Utc::now();
        entry.state.send_modify(|s| {
            s.status = QueryStatus::Success;
            s.data = Some(value);
            s.error = None;
            s.is_invalidated = false;
            s.data_updated_at = Some(now);
        });
        entry.fetched_at = Some(Instant::now());
        if entry.observers == 0 {
            entry.inactive_since = Instant::now();
        }
    }

    /// Current state of `key` viewed as `T`
    pub fn query_state<T: Any + Send + Sync>(&self, key: &QueryKey) -> Option<QueryState<T>> {
        let entries = self.read();
        let state = entries.get(key)?.state.borrow().clone();
        Some(state.downcast())
    }

    /// Whether the next access to `key` would fetch; `None` if there is no entry
    pub fn is_stale(&self, key: &QueryKey) -> Option<bool> {
        let entries = self.read();
        entries.get(key).map(|entry| entry.is_stale(&self.config))
    }

    pub fn observer_count(&self, key: &QueryKey) -> usize {
        self.read().get(key).map(|entry| entry.observers).unwrap_or(0)
    }

    /// Drop every entry under `prefix`. Observers of removed entries see their
    /// channel close.
    pub fn remove_queries(&self, prefix: &QueryKey) -> usize {
        let mut entries = self.write();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        before - entries.len()
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

/// Settles its entry with an error if the fetch never returns (panic or a dropped future)
struct InFlight<'a> {
    cache: &'a Arc<QueryCache>,
    key: &'a QueryKey,
    generation: u64,
    finished: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        warn!(key = %self.key, "fetch ended without a result");
        let aborted: Result<CachedValue> = Err(Error::Unknown(format!(
            "fetch for query {} did not complete",
            self.key
        )));
        self.cache.settle(self.key, self.generation, &aborted);
    }
}

fn erase<T, F, Fut>(fetch: F) -> Fetcher
where
    T: Any + Send + Sync,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    Arc::new(move || -> BoxFuture<Result<CachedValue>> {
        let fut = fetch();
        Box::pin(async move { fut.await.map(|value| Arc::new(value) as CachedValue) })
    })
}

pub(crate) fn downcast<T: Any + Send + Sync>(key: &QueryKey, value: CachedValue) -> Result<Arc<T>> {
    value.downcast::<T>().map_err(|_| {
        Error::InvalidData(format!("cached value for {key} has an unexpected type"))
    })
}

/// Wait for the entry to stop fetching and return its settled outcome
pub(crate) async fn wait_settled(
    key: &QueryKey,
    mut receiver: watch::Receiver<ErasedState>,
) -> Result<CachedValue> {
    let settled = receiver
        .wait_for(|s| !s.is_fetching)
        .await
        .map_err(|_| Error::Unknown(format!("query {key} was removed while fetching")))?
        .clone();
    settled_outcome(key, settled)
}

pub(crate) fn settled_outcome(key: &QueryKey, state: ErasedState) -> Result<CachedValue> {
    match (state.status, state.error, state.data) {
        (QueryStatus::Error, Some(err), _) => Err(err),
        (_, _, Some(data)) => Ok(data),
        _ => Err(Error::Unknown(format!("query {key} has no data"))),
    }
}
