//! Session lifecycle: OTP, signup, login, logout, and session bootstrap.
//!
//! Bootstrap paints cached state first, then issues the current-user and
//! deal-list fetches together; the two race independently and neither
//! depends on the other's completion.

use thiserror::Error;

use crate::api::{ApiClient, ApiError, SignupRequest};
use crate::cache::{CacheError, CacheStore};
use crate::deals;
use crate::models::User;
use crate::state::{AppState, DealStore};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error("not logged in")]
    NotLoggedIn,
    #[error("session expired, please log in again")]
    SessionExpired,
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Password policy enforced at signup.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    let ok = password.len() >= 8
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| !c.is_ascii_alphanumeric());
    if ok {
        Ok(())
    } else {
        Err(AuthError::Validation(
            "password must be at least 8 characters with upper and lower case letters, a number and a special character"
                .into(),
        ))
    }
}

pub async fn request_login_code(
    api: &ApiClient,
    email: &str,
    password: &str,
) -> Result<(), AuthError> {
    if email.trim().is_empty() {
        return Err(AuthError::Validation(
            "please enter an email address and password".into(),
        ));
    }
    api.send_otp(email, Some(password), "login").await?;
    log::info!("verification code sent to {email}");
    Ok(())
}

pub async fn request_signup_code(api: &ApiClient, email: &str) -> Result<(), AuthError> {
    if email.trim().is_empty() {
        return Err(AuthError::Validation("please enter an email address".into()));
    }
    api.send_otp(email, None, "signup").await?;
    log::info!("verification code sent to {email}");
    Ok(())
}

pub async fn signup(api: &ApiClient, request: &SignupRequest) -> Result<User, AuthError> {
    if request.first_name.trim().is_empty()
        || request.last_name.trim().is_empty()
        || request.email.trim().is_empty()
        || request.verification_code.trim().is_empty()
    {
        return Err(AuthError::Validation(
            "please fill in all required fields".into(),
        ));
    }
    validate_password(&request.password)?;
    let user = api.signup(request).await?;
    log::info!("account created for {}", user.email);
    Ok(user)
}

/// Exchange credentials and the email code for a session. The token and
/// user are persisted before the call returns.
pub async fn login(
    api: &mut ApiClient,
    cache: &CacheStore,
    state: &mut AppState,
    email: &str,
    password: &str,
    verification_code: &str,
) -> Result<User, AuthError> {
    if email.trim().is_empty() || password.is_empty() || verification_code.trim().is_empty() {
        return Err(AuthError::Validation(
            "please fill in all required fields".into(),
        ));
    }
    let resp = api.login(email, password, verification_code).await?;
    cache.save_token(&resp.jwt)?;
    cache.save_user(&resp.user)?;
    api.set_token(Some(resp.jwt));
    state.current_user = Some(resp.user.clone());
    log::info!("logged in as {}", resp.user.email);
    Ok(resp.user)
}

/// Remote logout, then wholesale local teardown: token, user, every cached
/// deal list, and any in-progress draft.
pub async fn logout(
    api: &mut ApiClient,
    cache: &CacheStore,
    state: &mut AppState,
) -> Result<(), AuthError> {
    api.logout().await?;
    cache.clear_all()?;
    api.set_token(None);
    state.current_user = None;
    state.deals = DealStore::default();
    log::info!("logged out");
    Ok(())
}

/// Restore a session at startup.
///
/// With a cached user the deal list is painted from cache and the
/// current-user and deal-list fetches go out together; a failed user
/// refresh degrades to the cached copy unless the server rejected the
/// token. Without a cached user the profile fetch must succeed first.
pub async fn bootstrap(
    api: &ApiClient,
    cache: &CacheStore,
    state: &mut AppState,
) -> Result<(), AuthError> {
    if api.token().is_none() {
        return Err(AuthError::NotLoggedIn);
    }
    if let Some(user) = cache.load_user()? {
        state.current_user = Some(user);
    }

    match state.current_user.clone() {
        Some(user) => {
            state.deals.set_loading(true);
            deals::paint_cached(cache, &mut state.deals, &user.id);

            let (user_result, deals_result) = tokio::join!(
                api.get_current_user(),
                api.user_deals(
                    &user.id,
                    &user.secure_id,
                    state.deals.pagination.page,
                    state.deals.pagination.limit,
                )
            );

            match user_result {
                Ok(fresh) => {
                    cache.save_user(&fresh)?;
                    state.current_user = Some(fresh);
                }
                Err(ApiError::Unauthorized) => return Err(AuthError::SessionExpired),
                Err(e) => log::warn!("could not refresh current user: {e}"),
            }
            deals::apply_fetch(cache, &mut state.deals, &user.id, deals_result);
        }
        None => {
            let fresh = match api.get_current_user().await {
                Ok(user) => user,
                Err(ApiError::Unauthorized) => return Err(AuthError::SessionExpired),
                Err(e) => return Err(e.into()),
            };
            cache.save_user(&fresh)?;
            state.current_user = Some(fresh.clone());
            deals::sync_deals(api, cache, &mut state.deals, &fresh).await;
        }
    }
    Ok(())
}
