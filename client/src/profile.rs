//! Profile management: business details, contact handles, wallet addresses.

use thiserror::Error;

use crate::api::{ApiClient, ApiError, UpdateUserRequest};
use crate::cache::CacheStore;
use crate::models::{Contact, Platform, User, WalletAddress, WalletKind};
use crate::solana::is_valid_solana_address;
use crate::state::AppState;

/// Maximum number of wallet addresses a profile may carry.
pub const MAX_WALLETS: usize = 5;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Add a contact handle. Phone-style handles get the country code prepended
/// (with a leading `0` stripped) unless already internationalized.
pub fn add_contact(
    user: &mut User,
    platform: Platform,
    handle: &str,
    country_code: &str,
) -> Result<(), ProfileError> {
    let handle = handle.trim();
    if handle.is_empty() {
        return Err(ProfileError::Validation(
            "please enter contact information".into(),
        ));
    }
    let username = if matches!(platform, Platform::Phone | Platform::Whatsapp)
        && !handle.starts_with('+')
    {
        let digits = handle.strip_prefix('0').unwrap_or(handle);
        format!("{country_code}{digits}")
    } else {
        handle.to_string()
    };
    user.contacts.push(Contact { platform, username });
    Ok(())
}

pub fn remove_contact(user: &mut User, index: usize) -> bool {
    if index >= user.contacts.len() {
        return false;
    }
    user.contacts.remove(index);
    true
}

/// Add a wallet address after the cap, duplicate, and format checks.
pub fn add_wallet(
    user: &mut User,
    name: &str,
    address: &str,
    kind: WalletKind,
) -> Result<(), ProfileError> {
    if user.wallets.len() >= MAX_WALLETS {
        return Err(ProfileError::Validation(format!(
            "you can only add up to {MAX_WALLETS} wallet addresses"
        )));
    }
    if name.trim().is_empty() || address.trim().is_empty() {
        return Err(ProfileError::Validation(
            "please fill in both wallet name and address".into(),
        ));
    }
    let address = address.trim();
    if user
        .wallets
        .iter()
        .any(|w| w.address.eq_ignore_ascii_case(address))
    {
        return Err(ProfileError::Validation(
            "this wallet address has already been added".into(),
        ));
    }
    if !is_valid_solana_address(address) {
        return Err(ProfileError::Validation(
            kind.invalid_address_message().to_string(),
        ));
    }
    user.wallets.push(WalletAddress {
        name: name.trim().to_string(),
        address: address.to_string(),
        wallet_type: kind,
    });
    Ok(())
}

pub fn remove_wallet(user: &mut User, address: &str) -> bool {
    let before = user.wallets.len();
    user.wallets.retain(|w| w.address != address);
    user.wallets.len() != before
}

/// Persist the profile remotely; local state and cache update only from the
/// server's echo of the user.
pub async fn save_profile(
    api: &ApiClient,
    cache: &CacheStore,
    state: &mut AppState,
    business_name: Option<String>,
    description: Option<String>,
) -> Result<User, ProfileError> {
    let current = state
        .current_user
        .as_ref()
        .ok_or_else(|| ProfileError::Validation("no active session".into()))?;

    let request = UpdateUserRequest {
        business_name: business_name.or_else(|| current.business_name.clone()),
        description: description.or_else(|| current.description.clone()),
        contacts: current.contacts.clone(),
        wallets: current.wallets.clone(),
    };
    let updated = api.update_user(&request).await?;
    if let Err(e) = cache.save_user(&updated) {
        log::warn!("could not cache updated user: {e}");
    }
    state.current_user = Some(updated.clone());
    log::info!("profile saved");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD_ADDR: &str = "3E4kKNEfZVvhh8yAUjJa4brtWCQ7UUCoFePDbKHLb4Eq";

    fn user() -> User {
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

    #[test]
    fn invalid_address_is_rejected_with_wallet_message() {
        let mut user = user();
        let err = add_wallet(
            &mut user,
            "main",
            "0E4kKNEfZVvhh8yAUjJa4brtWCQ7UUCoFePDbKHLb4Eq",
            WalletKind::Phantom,
        )
        .unwrap_err();
        assert!(matches!(err, ProfileError::Validation(ref m)
            if m == WalletKind::Phantom.invalid_address_message()));
        assert!(user.wallets.is_empty());
    }

    #[test]
    fn valid_address_is_added() {
        let mut user = user();
        add_wallet(&mut user, "main", GOOD_ADDR, WalletKind::Solflare).unwrap();
        assert_eq!(user.wallets.len(), 1);
        assert_eq!(user.wallets[0].wallet_type, WalletKind::Solflare);
    }

    #[test]
    fn duplicate_addresses_are_rejected_case_insensitively() {
        let mut user = user();
        add_wallet(&mut user, "main", GOOD_ADDR, WalletKind::Phantom).unwrap();
        let err = add_wallet(
            &mut user,
            "backup",
            &GOOD_ADDR.to_ascii_lowercase(),
            WalletKind::Phantom,
        )
        .unwrap_err();
        assert!(matches!(err, ProfileError::Validation(_)));
        assert_eq!(user.wallets.len(), 1);
    }

    #[test]
    fn wallet_cap_is_enforced() {
        let mut user = user();
        let addrs = (0..MAX_WALLETS)
            .map(|i| {
                let mut a = GOOD_ADDR.to_string();
                // vary the tail within the base58 alphabet
                a.truncate(a.len() - 1);
                a.push(char::from(b'1' + i as u8));
                a
            })
            .collect::<Vec<_>>();
        for (i, addr) in addrs.iter().enumerate() {
            add_wallet(&mut user, &format!("w{i}"), addr, WalletKind::Phantom).unwrap();
        }
        let err = add_wallet(&mut user, "overflow", GOOD_ADDR, WalletKind::Phantom).unwrap_err();
        assert!(matches!(err, ProfileError::Validation(_)));
        assert_eq!(user.wallets.len(), MAX_WALLETS);
    }

    #[test]
    fn phone_handles_get_country_code() {
        let mut user = user();
        add_contact(&mut user, Platform::Phone, "08012345678", "+234").unwrap();
        assert_eq!(user.contacts[0].username, "+2348012345678");

        add_contact(&mut user, Platform::Whatsapp, "+15551234", "+234").unwrap();
        assert_eq!(user.contacts[1].username, "+15551234");

        add_contact(&mut user, Platform::Telegram, "ada_l", "+234").unwrap();
        assert_eq!(user.contacts[2].username, "ada_l");
    }
}
