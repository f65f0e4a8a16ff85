//! Four-step deal creation wizard.
//!
//! Field values and the current step persist to the cache on every change so
//! an interrupted session resumes where it left off; the draft is cleared
//! only on successful submission. Price and duration stay free-form strings
//! until the step gate parses them, like the form fields they mirror.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::{ApiClient, ApiError, CreateDealRequest};
use crate::cache::CacheStore;
use crate::media::{MediaClient, MediaError};
use crate::models::{Counterparty, Deal, Deliverable, FileRef, ImageRef, User};
use crate::state::DealStore;

pub const FINAL_STEP: u8 = 4;

#[derive(Debug, Error)]
pub enum WizardError {
    #[error("{0}")]
    Validation(String),
    #[error("you cannot create a deal with your own Secure ID; enter the seller's Secure ID")]
    SelfDeal,
    #[error("seller not found; check the SecureDeal ID")]
    SellerNotFound,
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Media(#[from] MediaError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealDraft {
    pub step: u8,
    pub title: String,
    pub price: String,
    pub currency: String,
    pub description: String,
    pub secure_id: String,
    pub duration: String,
    pub deliverables: Vec<Deliverable>,
    pub images: Vec<ImageRef>,
    pub files: Vec<FileRef>,
}

impl Default for DealDraft {
    fn default() -> Self {
        Self {
            step: 1,
            title: String::new(),
            price: String::new(),
            currency: "USDC".to_string(),
            description: String::new(),
            secure_id: String::new(),
            duration: String::new(),
            deliverables: Vec::new(),
            images: Vec::new(),
            files: Vec::new(),
        }
    }
}

pub fn load_or_default(cache: &CacheStore) -> DealDraft {
    match cache.load_draft() {
        Ok(Some(draft)) => draft,
        Ok(None) => DealDraft::default(),
        Err(e) => {
            log::warn!("could not load deal draft: {e}");
            DealDraft::default()
        }
    }
}

pub fn save(cache: &CacheStore, draft: &DealDraft) {
    if let Err(e) = cache.save_draft(draft) {
        log::warn!("could not persist deal draft: {e}");
    }
}

/// Synchronous gate for one wizard step; nothing here touches the network.
pub fn validate_step(draft: &DealDraft, step: u8) -> Result<(), WizardError> {
    match step {
        1 => {
            if draft.title.trim().is_empty() {
                return Err(WizardError::Validation("please enter a deal title".into()));
            }
            match draft.price.trim().parse::<f64>() {
                Ok(price) if price > 0.0 => {}
                _ => {
                    return Err(WizardError::Validation("please enter a valid price".into()));
                }
            }
            if draft.description.trim().is_empty() {
                return Err(WizardError::Validation("please provide a description".into()));
            }
            if draft.secure_id.trim().is_empty() {
                return Err(WizardError::Validation(
                    "please enter the seller's SecureDeal ID".into(),
                ));
            }
            match draft.duration.trim().parse::<u32>() {
                Ok(days) if days > 0 => {}
                _ => {
                    return Err(WizardError::Validation(
                        "please set a valid duration for the deal".into(),
                    ));
                }
            }
            Ok(())
        }
        2 => {
            if draft.deliverables.is_empty() {
                return Err(WizardError::Validation(
                    "please add at least one deliverable".into(),
                ));
            }
            Ok(())
        }
        // Missing agreement documents warn but never block.
        _ => Ok(()),
    }
}

/// Warning shown on the documents step when no agreement was uploaded.
pub fn document_warning(draft: &DealDraft) -> Option<&'static str> {
    if draft.files.is_empty() {
        Some("no agreement documents uploaded; this may affect dispute resolution")
    } else {
        None
    }
}

pub fn advance(cache: &CacheStore, draft: &mut DealDraft) -> Result<(), WizardError> {
    validate_step(draft, draft.step)?;
    if draft.step < FINAL_STEP {
        draft.step += 1;
        save(cache, draft);
    }
    Ok(())
}

pub fn back(cache: &CacheStore, draft: &mut DealDraft) {
    if draft.step > 1 {
        draft.step -= 1;
        save(cache, draft);
    }
}

pub fn add_deliverable(cache: &CacheStore, draft: &mut DealDraft, description: &str) -> bool {
    let description = description.trim();
    if description.is_empty() {
        return false;
    }
    draft.deliverables.push(Deliverable {
        description: description.to_string(),
        completed: false,
    });
    save(cache, draft);
    true
}

pub fn remove_deliverable(cache: &CacheStore, draft: &mut DealDraft, index: usize) -> bool {
    if index >= draft.deliverables.len() {
        return false;
    }
    draft.deliverables.remove(index);
    save(cache, draft);
    true
}

// ── attachments ─────────────────────────────────────────────────────────

/// Upload a document and record it on the draft once the host accepted it.
pub async fn attach_file(
    media: &MediaClient,
    cache: &CacheStore,
    draft: &mut DealDraft,
    path: &std::path::Path,
    progress: impl FnMut(u64, u64) + Send + 'static,
) -> Result<FileRef, WizardError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    let mime_type = crate::media::guess_mime(path).to_string();
    let asset = media.upload(path, progress).await?;
    let file = FileRef {
        public_id: asset.public_id,
        url: asset.secure_url,
        name,
        mime_type,
    };
    draft.files.push(file.clone());
    save(cache, draft);
    Ok(file)
}

pub async fn attach_image(
    media: &MediaClient,
    cache: &CacheStore,
    draft: &mut DealDraft,
    path: &std::path::Path,
    progress: impl FnMut(u64, u64) + Send + 'static,
) -> Result<ImageRef, WizardError> {
    let asset = media.upload(path, progress).await?;
    let image = ImageRef {
        public_id: asset.public_id,
        url: asset.secure_url,
    };
    draft.images.push(image.clone());
    save(cache, draft);
    Ok(image)
}

/// Remove an uploaded file: the remote delete must succeed before the local
/// entry goes away.
pub async fn remove_file(
    media: &MediaClient,
    cache: &CacheStore,
    draft: &mut DealDraft,
    public_id: &str,
) -> Result<(), WizardError> {
    media.delete(public_id).await?;
    draft.files.retain(|f| f.public_id != public_id);
    save(cache, draft);
    Ok(())
}

pub async fn remove_image(
    media: &MediaClient,
    cache: &CacheStore,
    draft: &mut DealDraft,
    public_id: &str,
) -> Result<(), WizardError> {
    media.delete(public_id).await?;
    draft.images.retain(|i| i.public_id != public_id);
    save(cache, draft);
    Ok(())
}

// ── submission ──────────────────────────────────────────────────────────

/// Validate the full draft and resolve the counterparty for confirmation.
///
/// The self-deal guard runs before the lookup call, so naming yourself never
/// reaches the network.
pub async fn resolve_counterparty(
    api: &ApiClient,
    user: &User,
    draft: &DealDraft,
) -> Result<Counterparty, WizardError> {
    for step in 1..=3 {
        validate_step(draft, step)?;
    }
    if draft.secure_id.trim() == user.secure_id {
        return Err(WizardError::SelfDeal);
    }
    match api.get_seller_details(draft.secure_id.trim()).await {
        Ok(counterparty) => Ok(counterparty),
        Err(ApiError::Remote { status: 404, .. }) => Err(WizardError::SellerNotFound),
        Err(e) => Err(e.into()),
    }
}

/// Fire the create call after explicit confirmation. On success the new deal
/// is prepended, the cache rewritten, and the draft cleared.
pub async fn confirm_and_submit(
    api: &ApiClient,
    cache: &CacheStore,
    store: &mut DealStore,
    user: &User,
    draft: &DealDraft,
    counterparty: &Counterparty,
) -> Result<Deal, WizardError> {
    let price = draft
        .price
        .trim()
        .parse::<f64>()
        .map_err(|_| WizardError::Validation("please enter a valid price".into()))?;
    let duration = draft
        .duration
        .trim()
        .parse::<u32>()
        .map_err(|_| WizardError::Validation("please set a valid duration for the deal".into()))?;

    let request = CreateDealRequest {
        title: draft.title.trim().to_string(),
        price,
        currency: draft.currency.clone(),
        description: draft.description.trim().to_string(),
        secure_id: draft.secure_id.trim().to_string(),
        duration,
        deliverables: draft.deliverables.clone(),
        images: draft.images.clone(),
        files: draft.files.clone(),
        user_id: user.id.clone(),
        created_at: chrono::Utc::now(),
        from: user.business_name.clone().unwrap_or_default(),
        to: counterparty.business_name.clone().unwrap_or_default(),
    };

    let deal = api.create_deal(&request).await?;

    if let Err(e) = cache.clear_draft() {
        log::warn!("could not clear submitted draft: {e}");
    }
    store.prepend(deal.clone());
    if let Err(e) = cache.put_deals(&user.id, &store.deals) {
        log::warn!("could not cache deals: {e}");
    }
    log::info!("deal created, waiting for seller to accept");
    Ok(deal)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_draft() -> DealDraft {
        DealDraft {
            step: 1,
            title: "Website Design Project".into(),
            price: "500.00".into(),
            currency: "USDC".into(),
            description: "Complete redesign of the company website".into(),
            secure_id: "SD-SELLER".into(),
            duration: "14".into(),
            deliverables: vec![Deliverable {
                description: "Design mockups".into(),
                completed: false,
            }],
            images: vec![],
            files: vec![],
        }
    }

    #[test]
    fn step_one_rejects_bad_prices() {
        let mut draft = valid_draft();

        draft.price = "0".into();
        assert!(matches!(
            validate_step(&draft, 1),
            Err(WizardError::Validation(_))
        ));

        draft.price = "-25".into();
        assert!(validate_step(&draft, 1).is_err());

        draft.price = "abc".into();
        assert!(validate_step(&draft, 1).is_err());

        draft.price = "500.00".into();
        assert!(validate_step(&draft, 1).is_ok());
    }

    #[test]
    fn step_one_rejects_missing_fields() {
        let mut draft = valid_draft();
        draft.title = "   ".into();
        assert!(validate_step(&draft, 1).is_err());

        let mut draft = valid_draft();
        draft.duration = "0".into();
        assert!(validate_step(&draft, 1).is_err());

        let mut draft = valid_draft();
        draft.duration = "ten".into();
        assert!(validate_step(&draft, 1).is_err());

        let mut draft = valid_draft();
        draft.secure_id.clear();
        assert!(validate_step(&draft, 1).is_err());
    }

    #[test]
    fn step_two_requires_deliverables() {
        let mut draft = valid_draft();
        draft.deliverables.clear();
        assert!(validate_step(&draft, 2).is_err());
    }

    #[test]
    fn missing_documents_warn_without_blocking() {
        let draft = valid_draft();
        assert!(validate_step(&draft, 3).is_ok());
        assert!(document_warning(&draft).is_some());
    }

    #[test]
    fn advance_blocks_on_invalid_step() {
        let cache = CacheStore::open_in_memory().unwrap();
        let mut draft = valid_draft();
        draft.price = "abc".into();
        assert!(advance(&cache, &mut draft).is_err());
        assert_eq!(draft.step, 1);

        draft.price = "500.00".into();
        advance(&cache, &mut draft).unwrap();
        assert_eq!(draft.step, 2);
        // the step survives a reload
        assert_eq!(cache.load_draft().unwrap().unwrap().step, 2);
    }

    #[test]
    fn draft_persists_on_every_change() {
        let cache = CacheStore::open_in_memory().unwrap();
        let mut draft = valid_draft();
        assert!(add_deliverable(&cache, &mut draft, "Frontend implementation"));
        assert!(!add_deliverable(&cache, &mut draft, "   "));

        let reloaded = cache.load_draft().unwrap().unwrap();
        assert_eq!(reloaded.deliverables.len(), 2);

        assert!(remove_deliverable(&cache, &mut draft, 0));
        assert_eq!(cache.load_draft().unwrap().unwrap().deliverables.len(), 1);
    }
}
