//! Manual point adjustment writer

use super::{loyalty_key, LoyaltyApi};
use crate::http::ApiTransport;
use loyalty_cache::Mutation;
use loyalty_core::{AdjustmentRequest, AdjustmentResponse, Result};
use std::sync::Arc;
use tracing::instrument;

async fn submit_adjustment(
    transport: Arc<dyn ApiTransport>,
    request: AdjustmentRequest,
) -> Result<AdjustmentResponse> {
    let body = serde_json::to_value(request.body())?;
    let response = transport.post(&request.path(), body).await?;
    Ok(AdjustmentResponse(response))
}

/// Point adjustment writer.
///
/// Each successful run marks every `["loyalty", ..]` entry stale so ranks
/// and profiles are refetched. Failures leave the cache as it was.
pub fn adjust_points_mutation(api: &LoyaltyApi) -> Mutation<AdjustmentRequest, AdjustmentResponse> {
    let transport = api.transport();
    Mutation::new(api.cache(), move |request: AdjustmentRequest| {
        submit_adjustment(Arc::clone(&transport), request)
    })
    .invalidates(loyalty_key())
}

/// Submit a single adjustment
#[instrument(skip(api), fields(profile_id = %request.id, delta = request.delta))]
pub async fn adjust_points(
    api: &LoyaltyApi,
    request: AdjustmentRequest,
) -> Result<Arc<AdjustmentResponse>> {
    adjust_points_mutation(api).mutate(request).await
}
