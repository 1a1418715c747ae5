mod common;

use common::{api_with, Call, FakeTransport};
use loyalty_core::{AdjustmentRequest, Error};
use loyalty_networking::api::{
    adjust_points, adjust_points_mutation, fetch_profiles, fetch_ranks, profiles_key,
    profiles_query, ranks_key, ranks_query, PROFILES_PATH, RANKS_PATH,
};
use serde_json::json;

const ADJUST_5: &str = "/loyalty/profiles/5/adjust/";

fn backend() -> std::sync::Arc<FakeTransport> {
    let transport = FakeTransport::new();
    transport.on_get(RANKS_PATH, Ok(json!([{"id": 1, "name": "Bronze"}, {"id": 2, "name": "Gold"}])));
    transport.on_get(PROFILES_PATH, Ok(json!([{"id": 5, "points": 100}])));
    transport.on_post(ADJUST_5, Ok(json!({"id": 5, "points": 110})));
    transport
}

#[tokio::test]
async fn rank_reader_issues_one_get_per_cache_miss() {
    let transport = backend();
    let api = api_with(&transport);

    let mut first = ranks_query(&api);
    let ranks = first.result().await.unwrap();
    assert_eq!(ranks.len(), 2);
    assert_eq!(ranks[1].name.as_deref(), Some("Gold"));

    let mut second = ranks_query(&api);
    second.result().await.unwrap();
    fetch_ranks(&api).await.unwrap();

    assert_eq!(transport.count("GET", RANKS_PATH), 1);
    assert!(first.state().is_success());
}

#[tokio::test]
async fn profile_reader_issues_one_get_per_cache_miss() {
    let transport = backend();
    let api = api_with(&transport);

    let profiles = fetch_profiles(&api).await.unwrap();
    assert_eq!(profiles[0].points, Some(100));

    let mut observer = profiles_query(&api);
    observer.result().await.unwrap();

    assert_eq!(transport.count("GET", PROFILES_PATH), 1);
    assert_eq!(transport.count("GET", RANKS_PATH), 0);
}

#[tokio::test]
async fn adjustment_posts_delta_and_reason() {
    let transport = backend();
    let api = api_with(&transport);

    let response = adjust_points(&api, AdjustmentRequest::new(5, 10, "bonus"))
        .await
        .unwrap();

    assert_eq!(response.as_profile().unwrap().points, Some(110));
    assert_eq!(
        transport.calls(),
        vec![Call {
            method: "POST",
            path: ADJUST_5.to_string(),
            body: Some(json!({"delta": 10, "reason": "bonus"})),
        }]
    );
}

#[tokio::test]
async fn adjustment_with_reference_sends_it() {
    let transport = backend();
    let api = api_with(&transport);

    let request = AdjustmentRequest::new(5, -3, "refund").with_reference("ORD-991");
    adjust_points(&api, request).await.unwrap();

    let calls = transport.calls();
    assert_eq!(
        calls[0].body,
        Some(json!({"delta": -3, "reason": "refund", "reference": "ORD-991"}))
    );
}

#[tokio::test]
async fn successful_adjustment_marks_ranks_and_profiles_stale() {
    let transport = backend();
    let api = api_with(&transport);
    let cache = api.cache();

    fetch_ranks(&api).await.unwrap();
    fetch_profiles(&api).await.unwrap();
    assert_eq!(cache.is_stale(&ranks_key()), Some(false));
    assert_eq!(cache.is_stale(&profiles_key()), Some(false));

    adjust_points(&api, AdjustmentRequest::new(5, 10, "bonus"))
        .await
        .unwrap();

    assert_eq!(cache.is_stale(&ranks_key()), Some(true));
    assert_eq!(cache.is_stale(&profiles_key()), Some(true));

    // next subscription refetches
    let mut ranks = ranks_query(&api);
    ranks.result().await.unwrap();
    let mut profiles = profiles_query(&api);
    profiles.result().await.unwrap();

    assert_eq!(transport.count("GET", RANKS_PATH), 2);
    assert_eq!(transport.count("GET", PROFILES_PATH), 2);
}

#[tokio::test]
async fn active_readers_refetch_after_adjustment() {
    let transport = backend();
    let api = api_with(&transport);

    let mut profiles = profiles_query(&api);
    profiles.result().await.unwrap();

    transport.on_get(PROFILES_PATH, Ok(json!([{"id": 5, "points": 110}])));
    let mutation = adjust_points_mutation(&api);
    mutation.mutate(AdjustmentRequest::new(5, 10, "bonus")).await.unwrap();

    let refreshed = profiles.result().await.unwrap();
    assert_eq!(refreshed[0].points, Some(110));
    assert_eq!(transport.count("GET", PROFILES_PATH), 2);
    assert!(mutation.state().is_success());
}

#[tokio::test]
async fn failed_adjustment_leaves_cache_untouched() {
    let transport = backend();
    transport.on_post(
        ADJUST_5,
        Err(Error::ApiError {
            status: 500,
            message: "internal error".to_string(),
        }),
    );
    let api = api_with(&transport);
    let cache = api.cache();

    fetch_ranks(&api).await.unwrap();
    fetch_profiles(&api).await.unwrap();

    let mutation = adjust_points_mutation(&api);
    let err = mutation
        .mutate(AdjustmentRequest::new(5, 10, "bonus"))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(500));
    let state = mutation.state();
    assert!(state.is_error());
    assert_eq!(state.error, Some(err));
    assert!(state.data.is_none());

    assert_eq!(cache.is_stale(&ranks_key()), Some(false));
    assert_eq!(cache.is_stale(&profiles_key()), Some(false));
    fetch_ranks(&api).await.unwrap();
    assert_eq!(transport.count("GET", RANKS_PATH), 1);
}

#[tokio::test]
async fn concurrent_profile_subscriptions_share_one_request() {
    let transport = backend();
    let gate = transport.hold_gets();
    let api = api_with(&transport);

    let mut first = profiles_query(&api);
    let mut second = profiles_query(&api);
    let third = {
        let api = api.clone();
        tokio::spawn(async move { fetch_profiles(&api).await })
    };

    tokio::task::yield_now().await;
    assert!(first.state().is_loading());
    assert!(second.state().is_fetching);
    gate.notify_one();

    let a = first.result().await.unwrap();
    let b = second.result().await.unwrap();
    let c = third.await.unwrap().unwrap();

    assert_eq!(a, b);
    assert_eq!(b, c);
    assert_eq!(transport.count("GET", PROFILES_PATH), 1);
}

#[tokio::test]
async fn reader_errors_are_relayed_unmodified() {
    let transport = backend();
    transport.on_get(RANKS_PATH, Err(Error::TokenExpired));
    let api = api_with(&transport);

    let mut ranks = ranks_query(&api);
    let err = ranks.result().await.unwrap_err();

    assert_eq!(err, Error::TokenExpired);
    let state = ranks.state();
    assert!(state.is_error());
    assert_eq!(state.error, Some(Error::TokenExpired));
    assert!(state.data.is_none());
}

#[tokio::test]
async fn malformed_reader_response_surfaces_as_error() {
    let transport = backend();
    transport.on_get(PROFILES_PATH, Ok(json!({"detail": "not a list"})));
    let api = api_with(&transport);

    let mut profiles = profiles_query(&api);
    let err = profiles.result().await.unwrap_err();

    assert!(matches!(err, Error::InvalidData(_)));
    assert!(profiles.state().is_error());
}

#[tokio::test]
async fn concurrent_adjustments_each_post_once() {
    let transport = backend();
    transport.on_post("/loyalty/profiles/6/adjust/", Ok(json!({"id": 6})));
    let api = api_with(&transport);
    let mutation = adjust_points_mutation(&api);

    let (a, b) = tokio::join!(
        mutation.mutate(AdjustmentRequest::new(5, 10, "bonus")),
        mutation.mutate(AdjustmentRequest::new(6, -10, "chargeback")),
    );

    assert!(a.is_ok());
    assert!(b.is_ok());
    assert_eq!(transport.count("POST", ADJUST_5), 1);
    assert_eq!(transport.count("POST", "/loyalty/profiles/6/adjust/"), 1);
    assert!(mutation.state().is_success());
}
