//! Deal list synchronization and lifecycle operations.
//!
//! Sync is cache-then-revalidate: the cached list is painted immediately,
//! then a paginated fetch replaces store and cache wholesale on success or
//! sets the error flag on failure without touching what is displayed.
//! Lifecycle operations gate on the status state machine locally, call the
//! remote endpoint, and mutate local state only after confirmed success.

use thiserror::Error;

use crate::api::{ApiClient, ApiError, DealPage};
use crate::cache::CacheStore;
use crate::models::{DealStatus, User};
use crate::state::DealStore;

#[derive(Debug, Error)]
pub enum DealError {
    #[error("deal {0} not found")]
    NotFound(String),
    #[error("cannot move deal from '{from}' to '{to}'")]
    InvalidTransition { from: DealStatus, to: DealStatus },
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Show whatever the cache has before the network round trip resolves.
pub fn paint_cached(cache: &CacheStore, store: &mut DealStore, user_id: &str) {
    match cache.deals(user_id) {
        Ok(deals) if !deals.is_empty() => store.set_deals(deals),
        Ok(_) => {}
        Err(e) => log::warn!("could not read cached deals: {e}"),
    }
}

/// Fold a fetch result into the store and cache. Success replaces both
/// wholesale; failure records the error and leaves displayed data alone.
pub fn apply_fetch(
    cache: &CacheStore,
    store: &mut DealStore,
    user_id: &str,
    result: Result<DealPage, ApiError>,
) {
    match result {
        Ok(page) => {
            if let Err(e) = cache.put_deals(user_id, &page.deals) {
                log::warn!("could not cache deals: {e}");
            }
            store.pagination.total_pages = page.total_pages;
            if page.limit > 0 {
                store.pagination.limit = page.limit;
            }
            store.set_deals(page.deals);
            store.set_error(None);
        }
        Err(e) => {
            log::warn!("deal list fetch failed: {e}");
            store.set_error(Some(e.to_string()));
        }
    }
    store.set_loading(false);
}

pub async fn sync_deals(api: &ApiClient, cache: &CacheStore, store: &mut DealStore, user: &User) {
    store.set_loading(true);
    paint_cached(cache, store, &user.id);
    let result = api
        .user_deals(
            &user.id,
            &user.secure_id,
            store.pagination.page,
            store.pagination.limit,
        )
        .await;
    apply_fetch(cache, store, &user.id, result);
}

/// Accept or decline a deal request addressed to the current user.
pub async fn respond_to_request(
    api: &ApiClient,
    cache: &CacheStore,
    store: &mut DealStore,
    user: &User,
    deal_id: &str,
    accept: bool,
) -> Result<(), DealError> {
    let deal = store
        .find(deal_id)
        .ok_or_else(|| DealError::NotFound(deal_id.to_string()))?
        .clone();
    let target = if accept {
        DealStatus::AwaitingPayment
    } else {
        DealStatus::Declined
    };
    if !deal.progress_status.can_transition_to(target) {
        return Err(DealError::InvalidTransition {
            from: deal.progress_status,
            to: target,
        });
    }

    let decision = if accept { "accepted" } else { "declined" };
    api.accept_request(&user.secure_id, deal_id, decision).await?;

    let mut updated = deal;
    updated.progress_status = target;
    store.replace_deal(updated);
    persist(cache, store, &user.id);
    log::info!("deal {deal_id} {decision}");
    Ok(())
}

/// Cancel a deal the current user created while it awaits payment.
pub async fn cancel_deal(
    api: &ApiClient,
    cache: &CacheStore,
    store: &mut DealStore,
    user: &User,
    deal_id: &str,
) -> Result<(), DealError> {
    let deal = store
        .find(deal_id)
        .ok_or_else(|| DealError::NotFound(deal_id.to_string()))?
        .clone();
    if !deal.progress_status.can_transition_to(DealStatus::Canceled) {
        return Err(DealError::InvalidTransition {
            from: deal.progress_status,
            to: DealStatus::Canceled,
        });
    }

    api.cancel_deal(&user.id, deal_id).await?;

    let mut updated = deal;
    updated.progress_status = DealStatus::Canceled;
    store.replace_deal(updated);
    persist(cache, store, &user.id);
    log::info!("deal {deal_id} canceled");
    Ok(())
}

/// Delete a deal and drop it from the local list.
pub async fn delete_deal(
    api: &ApiClient,
    cache: &CacheStore,
    store: &mut DealStore,
    user: &User,
    deal_id: &str,
) -> Result<(), DealError> {
    if store.find(deal_id).is_none() {
        return Err(DealError::NotFound(deal_id.to_string()));
    }

    api.delete_deal(&user.secure_id, deal_id).await?;

    store.remove(deal_id);
    persist(cache, store, &user.id);
    log::info!("deal {deal_id} deleted");
    Ok(())
}

fn persist(cache: &CacheStore, store: &DealStore, user_id: &str) {
    if let Err(e) = cache.put_deals(user_id, &store.deals) {
        log::warn!("could not cache deals: {e}");
    }
}
