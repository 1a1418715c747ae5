//! Loyalty profile reader

use super::{loyalty_key, LoyaltyApi};
use crate::http::ApiTransport;
use loyalty_cache::{QueryKey, QueryObserver};
use loyalty_core::{Profile, Result};
use std::sync::Arc;
use tracing::instrument;

pub const PROFILES_PATH: &str = "/loyalty/profiles/";

pub fn profiles_key() -> QueryKey {
    loyalty_key().child("profiles")
}

async fn fetch_profile_list(transport: Arc<dyn ApiTransport>) -> Result<Vec<Profile>> {
    let body = transport.get(PROFILES_PATH).await?;
    Ok(serde_json::from_value(body)?)
}

/// Live view of the profile list; fetches on a cache miss
#[instrument(skip(api))]
pub fn profiles_query(api: &LoyaltyApi) -> QueryObserver<Vec<Profile>> {
    let transport = api.transport();
    api.cache()
        .subscribe(profiles_key(), move || fetch_profile_list(Arc::clone(&transport)))
}

#[instrument(skip(api))]
pub async fn fetch_profiles(api: &LoyaltyApi) -> Result<Arc<Vec<Profile>>> {
    let transport = api.transport();
    api.cache()
        .fetch_query(profiles_key(), move || fetch_profile_list(Arc::clone(&transport)))
        .await
}
