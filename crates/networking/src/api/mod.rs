//! Loyalty data accessors
//!
//! Thin wrappers that pair one HTTP call with a cache entry: two readers
//! (ranks, profiles) and one writer (manual point adjustment) that
//! invalidates the whole loyalty namespace when it succeeds.

mod adjustments;
mod profiles;
mod ranks;

pub use adjustments::*;
pub use profiles::*;
pub use ranks::*;

use crate::http::ApiTransport;
use loyalty_cache::{QueryCache, QueryKey};
use std::sync::Arc;

/// Namespace tag shared by every loyalty cache entry
pub const LOYALTY_NAMESPACE: &str = "loyalty";

/// Prefix matching every loyalty entry
pub fn loyalty_key() -> QueryKey {
    QueryKey::from([LOYALTY_NAMESPACE])
}

/// Shared collaborators of the accessors: the HTTP transport and the query cache
#[derive(Clone)]
pub struct LoyaltyApi {
    transport: Arc<dyn ApiTransport>,
    cache: Arc<QueryCache>,
}

impl LoyaltyApi {
    pub fn new(transport: Arc<dyn ApiTransport>, cache: Arc<QueryCache>) -> Self {
        Self { transport, cache }
    }

    pub fn transport(&self) -> Arc<dyn ApiTransport> {
        Arc::clone(&self.transport)
    }

    pub fn cache(&self) -> Arc<QueryCache> {
        Arc::clone(&self.cache)
    }
}
