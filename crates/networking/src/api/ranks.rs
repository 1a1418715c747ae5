//! Rank (tier definition) reader

use super::{loyalty_key, LoyaltyApi};
use crate::http::ApiTransport;
use loyalty_cache::{QueryKey, QueryObserver};
use loyalty_core::{Rank, Result};
use std::sync::Arc;
use tracing::instrument;

pub const RANKS_PATH: &str = "/loyalty/ranks/";

/// Cache key of the rank list
pub fn ranks_key() -> QueryKey {
    loyalty_key().child("ranks")
}

async fn fetch_rank_list(transport: Arc<dyn ApiTransport>) -> Result<Vec<Rank>> {
    let body = transport.get(RANKS_PATH).await?;
    Ok(serde_json::from_value(body)?)
}

/// Live view of the rank list; fetches on a cache miss
#[instrument(skip(api))]
pub fn ranks_query(api: &LoyaltyApi) -> QueryObserver<Vec<Rank>> {
    let transport = api.transport();
    api.cache()
        .subscribe(ranks_key(), move || fetch_rank_list(Arc::clone(&transport)))
}

/// One-shot read of the rank list through the cache
#[instrument(skip(api))]
pub async fn fetch_ranks(api: &LoyaltyApi) -> Result<Arc<Vec<Rank>>> {
    let transport = api.transport();
    api.cache()
        .fetch_query(ranks_key(), move || fetch_rank_list(Arc::clone(&transport)))
        .await
}
