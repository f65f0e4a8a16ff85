//! Flow tests against an unreachable backend: the client must keep showing
//! cached data, flag the failure, and never mutate state on a failed call.

use std::time::Duration;

use chrono::Utc;
use securedeal_client::api::ApiClient;
use securedeal_client::cache::CacheStore;
use securedeal_client::deals::{self, DealError};
use securedeal_client::models::{Deal, DealStatus, User};
use securedeal_client::state::DealStore;
use securedeal_client::wizard::{self, DealDraft, WizardError};

// Nothing listens on the discard port; every request fails fast.
const DEAD_API: &str = "http://127.0.0.1:9/api/v1";

fn offline_api() -> ApiClient {
    ApiClient::new(DEAD_API, Duration::from_secs(2)).unwrap()
}

fn sample_user() -> User {
    User {
        id: "u1".into(),
        first_name: "Ada".into(),
        last_name: "L".into(),
        email: "ada@example.com".into(),
        location: None,
        secure_id: "SD-ADA".into(),
        business_name: Some("Ada Studio".into()),
        description: None,
        contacts: vec![],
        wallets: vec![],
    }
}

fn sample_deal(id: &str, status: DealStatus) -> Deal {
    Deal {
        id: id.into(),
        title: "Website Design Project".into(),
        description: "Complete redesign".into(),
        price: 500.0,
        currency: "USDC".into(),
        user_id: "u1".into(),
        secure_id: "SD-SELLER".into(),
        duration: 14,
        deliverables: vec![],
        files: vec![],
        images: vec![],
        progress_status: status,
        request_expiry_date: None,
        created_at: Utc::now(),
        from: None,
        to: None,
    }
}

#[tokio::test]
async fn cached_deals_survive_failed_revalidation() {
    let api = offline_api();
    let cache = CacheStore::open_in_memory().unwrap();
    let user = sample_user();
    cache
        .put_deals(&user.id, &[sample_deal("d1", DealStatus::AwaitingApproval)])
        .unwrap();

    let mut store = DealStore::default();
    deals::sync_deals(&api, &cache, &mut store, &user).await;

    // the cached deal is still rendered and the failure is flagged
    assert_eq!(store.deals.len(), 1);
    assert_eq!(store.deals[0].id, "d1");
    assert_eq!(store.deals[0].progress_status, DealStatus::AwaitingApproval);
    assert!(store.error.is_some());
    assert!(!store.loading);

    // the cache itself is untouched by the failed fetch
    assert_eq!(cache.deals(&user.id).unwrap().len(), 1);
}

#[tokio::test]
async fn failed_transition_leaves_status_unchanged() {
    let api = offline_api();
    let cache = CacheStore::open_in_memory().unwrap();
    let user = sample_user();

    let mut store = DealStore::default();
    store.set_deals(vec![sample_deal("d1", DealStatus::AwaitingApproval)]);
    cache.put_deals(&user.id, &store.deals).unwrap();

    let err = deals::respond_to_request(&api, &cache, &mut store, &user, "d1", true)
        .await
        .unwrap_err();
    assert!(matches!(err, DealError::Api(_)));

    assert_eq!(
        store.find("d1").unwrap().progress_status,
        DealStatus::AwaitingApproval
    );
    assert_eq!(
        cache.deals(&user.id).unwrap()[0].progress_status,
        DealStatus::AwaitingApproval
    );
}

#[tokio::test]
async fn illegal_transitions_are_refused_before_the_network() {
    let api = offline_api();
    let cache = CacheStore::open_in_memory().unwrap();
    let user = sample_user();

    let mut store = DealStore::default();
    store.set_deals(vec![sample_deal("d1", DealStatus::Completed)]);

    // a completed deal cannot be accepted; the refusal is local, so the
    // error is a transition error rather than a transport one
    let err = deals::respond_to_request(&api, &cache, &mut store, &user, "d1", true)
        .await
        .unwrap_err();
    assert!(matches!(err, DealError::InvalidTransition { .. }));

    let err = deals::cancel_deal(&api, &cache, &mut store, &user, "d1")
        .await
        .unwrap_err();
    assert!(matches!(err, DealError::InvalidTransition { .. }));
}

#[tokio::test]
async fn failed_cancel_keeps_deal_and_cache() {
    let api = offline_api();
    let cache = CacheStore::open_in_memory().unwrap();
    let user = sample_user();

    let mut store = DealStore::default();
    store.set_deals(vec![sample_deal("d1", DealStatus::AwaitingPayment)]);
    cache.put_deals(&user.id, &store.deals).unwrap();

    let err = deals::cancel_deal(&api, &cache, &mut store, &user, "d1")
        .await
        .unwrap_err();
    assert!(matches!(err, DealError::Api(_)));
    assert_eq!(
        store.find("d1").unwrap().progress_status,
        DealStatus::AwaitingPayment
    );

    let err = deals::delete_deal(&api, &cache, &mut store, &user, "d1")
        .await
        .unwrap_err();
    assert!(matches!(err, DealError::Api(_)));
    assert_eq!(store.deals.len(), 1);
    assert_eq!(cache.deals(&user.id).unwrap().len(), 1);
}

#[tokio::test]
async fn self_deal_is_rejected_before_any_lookup() {
    let api = offline_api();
    let user = sample_user();

    let draft = DealDraft {
        step: 4,
        title: "Website Design Project".into(),
        price: "500.00".into(),
        currency: "USDC".into(),
        description: "Complete redesign".into(),
        secure_id: user.secure_id.clone(),
        duration: "14".into(),
        deliverables: vec![securedeal_client::models::Deliverable {
            description: "Design mockups".into(),
            completed: false,
        }],
        images: vec![],
        files: vec![],
    };

    // with a dead backend, a network attempt would surface as Api(_);
    // the guard must fire first
    let err = wizard::resolve_counterparty(&api, &user, &draft)
        .await
        .unwrap_err();
    assert!(matches!(err, WizardError::SelfDeal));
}

#[tokio::test]
async fn invalid_draft_never_reaches_the_create_endpoint() {
    let api = offline_api();
    let user = sample_user();

    let mut draft = DealDraft {
        step: 4,
        title: "Website Design Project".into(),
        price: "-1".into(),
        currency: "USDC".into(),
        description: "Complete redesign".into(),
        secure_id: "SD-SELLER".into(),
        duration: "14".into(),
        deliverables: vec![],
        images: vec![],
        files: vec![],
    };

    let err = wizard::resolve_counterparty(&api, &user, &draft)
        .await
        .unwrap_err();
    assert!(matches!(err, WizardError::Validation(_)));

    draft.price = "500.00".into();
    // still no deliverables: step 2 blocks next
    let err = wizard::resolve_counterparty(&api, &user, &draft)
        .await
        .unwrap_err();
    assert!(matches!(err, WizardError::Validation(_)));
}
