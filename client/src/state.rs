//! In-memory application state: the current user and the deal store.
//!
//! The deal store is the single owner of the deal list. Every successful
//! fetch replaces the list wholesale (last write wins); per-deal updates
//! replace by id and only ever run after the remote call confirmed success.

use crate::models::{Deal, Pagination, User};

#[derive(Debug, Default)]
pub struct DealStore {
    pub deals: Vec<Deal>,
    pub pagination: Pagination,
    pub loading: bool,
    pub error: Option<String>,
}

impl DealStore {
    /// Replace the whole list; no merging with previous contents.
    pub fn set_deals(&mut self, deals: Vec<Deal>) {
        self.deals = deals;
    }

    /// Swap in an updated deal by id. Returns false when the id is unknown.
    pub fn replace_deal(&mut self, updated: Deal) -> bool {
        match self.deals.iter_mut().find(|d| d.id == updated.id) {
            Some(slot) => {
                *slot = updated;
                true
            }
            None => false,
        }
    }

    pub fn prepend(&mut self, deal: Deal) {
        self.deals.insert(0, deal);
    }

    pub fn remove(&mut self, deal_id: &str) {
        self.deals.retain(|d| d.id != deal_id);
    }

    pub fn find(&self, deal_id: &str) -> Option<&Deal> {
        self.deals.iter().find(|d| d.id == deal_id)
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    pub fn set_error(&mut self, error: Option<String>) {
        self.error = error;
    }
}

#[derive(Debug, Default)]
pub struct AppState {
    pub current_user: Option<User>,
    pub deals: DealStore,
}

impl AppState {
    pub fn user(&self) -> Option<&User> {
        self.current_user.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DealStatus;
    use chrono::Utc;

    fn deal(id: &str, status: DealStatus) -> Deal {
        Deal {
            id: id.into(),
            title: format!("deal {id}"),
            description: String::new(),
            price: 10.0,
            currency: "USDC".into(),
            user_id: "u1".into(),
            secure_id: "SD-9".into(),
            duration: 5,
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

    #[test]
    fn set_deals_replaces_wholesale() {
        let mut store = DealStore::default();
        store.set_deals(vec![
            deal("stale-1", DealStatus::AwaitingApproval),
            deal("stale-2", DealStatus::InProgress),
        ]);

        let fetched = vec![deal("d1", DealStatus::AwaitingPayment)];
        store.set_deals(fetched.clone());

        assert_eq!(store.deals, fetched);
    }

    #[test]
    fn replace_deal_swaps_by_id() {
        let mut store = DealStore::default();
        store.set_deals(vec![
            deal("d1", DealStatus::AwaitingApproval),
            deal("d2", DealStatus::AwaitingApproval),
        ]);

        let mut updated = deal("d2", DealStatus::AwaitingApproval);
        updated.progress_status = DealStatus::AwaitingPayment;
        assert!(store.replace_deal(updated));

        assert_eq!(store.deals[0].progress_status, DealStatus::AwaitingApproval);
        assert_eq!(store.deals[1].progress_status, DealStatus::AwaitingPayment);
        assert!(!store.replace_deal(deal("missing", DealStatus::Declined)));
    }

    #[test]
    fn prepend_and_remove() {
        let mut store = DealStore::default();
        store.set_deals(vec![deal("d1", DealStatus::AwaitingApproval)]);
        store.prepend(deal("d0", DealStatus::AwaitingApproval));
        assert_eq!(store.deals[0].id, "d0");

        store.remove("d1");
        assert_eq!(store.deals.len(), 1);
        assert!(store.find("d1").is_none());
    }
}
