//! Loyalty Cache - key-tagged query cache with prefix invalidation
//!
//! An explicit cache service shared by `Arc`. Readers subscribe to entries by
//! [`QueryKey`], writers run through [`Mutation`] and invalidate key prefixes
//! once they succeed.

pub mod config;
pub mod key;
pub mod mutation;
pub mod observer;
pub mod state;
pub mod store;

pub use config::CacheConfig;
pub use key::QueryKey;
pub use mutation::Mutation;
pub use observer::QueryObserver;
pub use state::{MutationState, MutationStatus, QueryState, QueryStatus};
pub use store::{BoxFuture, QueryCache};
