//! Observable state of queries and mutations

use chrono::{DateTime, Utc};
use loyalty_core::Error;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Lifecycle of a query entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    /// Never fetched
    Idle,
    /// First fetch in flight, no data yet
    Loading,
    /// Last fetch succeeded
    Success,
    /// Last fetch failed (previous data, if any, is kept)
    Error,
}

/// Snapshot of a cached query
///
/// `T` is `dyn Any + Send + Sync` inside the cache and the concrete data type
/// once handed to an observer.
pub struct QueryState<T: ?Sized> {
    pub status: QueryStatus,
    pub data: Option<Arc<T>>,
    pub error: Option<Error>,
    /// A fetch is in flight (initial load or background refetch)
    pub is_fetching: bool,
    /// Marked stale by an invalidation and not yet refreshed
    pub is_invalidated: bool,
    pub data_updated_at: Option<DateTime<Utc>>,
    pub error_updated_at: Option<DateTime<Utc>>,
}

impl<T: ?Sized> QueryState<T> {
    pub fn idle() -> Self {
        Self {
            status: QueryStatus::Idle,
            data: None,
            error: None,
            is_fetching: false,
            is_invalidated: false,
            data_updated_at: None,
            error_updated_at: None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }

    pub(crate) fn map_data<U: ?Sized>(self, f: impl FnOnce(Arc<T>) -> Option<Arc<U>>) -> QueryState<U> {
        QueryState {
            status: self.status,
            data: self.data.and_then(f),
            error: self.error,
            is_fetching: self.is_fetching,
            is_invalidated: self.is_invalidated,
            data_updated_at: self.data_updated_at,
            error_updated_at: self.error_updated_at,
        }
    }
}

impl QueryState<dyn Any + Send + Sync> {
    /// View the erased state as a concrete data type; mismatched data reads as absent
    pub fn downcast<T: Any + Send + Sync>(self) -> QueryState<T> {
        self.map_data(|data| data.downcast::<T>().ok())
    }
}

impl<T: ?Sized> Clone for QueryState<T> {
    fn clone(&self) -> Self {
        Self {
            status: self.status,
            data: self.data.clone(),
            error: self.error.clone(),
            is_fetching: self.is_fetching,
            is_invalidated: self.is_invalidated,
            data_updated_at: self.data_updated_at,
            error_updated_at: self.error_updated_at,
        }
    }
}

impl<T: ?Sized> Default for QueryState<T> {
    fn default() -> Self {
        Self::idle()
    }
}

impl<T: ?Sized> fmt::Debug for QueryState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryState")
            .field("status", &self.status)
            .field("has_data", &self.data.is_some())
            .field("error", &self.error)
            .field("is_fetching", &self.is_fetching)
            .field("is_invalidated", &self.is_invalidated)
            .field("data_updated_at", &self.data_updated_at)
            .finish()
    }
}

/// Lifecycle of a mutation: idle -> loading -> success | error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationStatus {
    Idle,
    Loading,
    Success,
    Error,
}

/// Snapshot of a mutation's last run
pub struct MutationState<T> {
    pub status: MutationStatus,
    pub data: Option<Arc<T>>,
    pub error: Option<Error>,
    pub submitted_at: Option<DateTime<Utc>>,
}

impl<T> MutationState<T> {
    pub fn idle() -> Self {
        Self {
            status: MutationStatus::Idle,
            data: None,
            error: None,
            submitted_at: None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status == MutationStatus::Loading
    }

    pub fn is_success(&self) -> bool {
        self.status == MutationStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == MutationStatus::Error
    }
}

impl<T> Clone for MutationState<T> {
    fn clone(&self) -> Self {
        Self {
            status: self.status,
            data: self.data.clone(),
            error: self.error.clone(),
            submitted_at: self.submitted_at,
        }
    }
}

impl<T> Default for MutationState<T> {
    fn default() -> Self {
        Self::idle()
    }
}

impl<T> fmt::Debug for MutationState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationState")
            .field("status", &self.status)
            .field("has_data", &self.data.is_some())
            .field("error", &self.error)
            .field("submitted_at", &self.submitted_at)
            .finish()
    }
}
