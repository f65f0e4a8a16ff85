//! Typed client for the SecureDeal REST API.
//!
//! Wraps a shared `reqwest::Client` with the configured base URL, the bearer
//! token, and per-request timeouts, and provides one typed method per
//! endpoint. Every method returns `Result`; remote failures are values, never
//! panics, and are handled at the call site.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::models::{Counterparty, Deal, Deliverable, FileRef, ImageRef, User};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("request timed out")]
    Timeout,
    #[error("session expired or unauthorized")]
    Unauthorized,
    #[error("server error ({status}): {message}")]
    Remote { status: u16, message: String },
    #[error("invalid response body: {0}")]
    Decode(String),
}

fn transport(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout
    } else {
        ApiError::Transport(err.to_string())
    }
}

/// Standard `{ data: ... }` wrapper used by most endpoints.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

/// Body for endpoints that take no fields.
#[derive(Serialize)]
struct Empty {}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub jwt: String,
    pub user: User,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub location: String,
    pub verification_code: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDealRequest {
    pub title: String,
    pub price: f64,
    pub currency: String,
    pub description: String,
    pub secure_id: String,
    pub duration: u32,
    pub deliverables: Vec<Deliverable>,
    pub images: Vec<ImageRef>,
    pub files: Vec<FileRef>,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub contacts: Vec<crate::models::Contact>,
    pub wallets: Vec<crate::models::WalletAddress>,
}

/// One page of the user's deal list.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealPage {
    #[serde(default)]
    pub deals: Vec<Deal>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub limit: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendOtpBody<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<&'a str>,
    action: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
    verification_code: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SecureIdBody<'a> {
    secure_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DealDecisionBody<'a> {
    secure_id: &'a str,
    deal_id: &'a str,
    status: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DealRefBody<'a> {
    secure_id: &'a str,
    deal_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CancelDealBody<'a> {
    user_id: &'a str,
    deal_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UserDealsBody<'a> {
    user_id: &'a str,
    secure_id: &'a str,
    page: u32,
    limit: u32,
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Create a client targeting `base_url` with the given request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ApiError::Transport(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        })
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn execute(&self, req: reqwest::RequestBuilder) -> Result<serde_json::Value, ApiError> {
        let req = match &self.token {
            Some(token) => req.header("Authorization", format!("Bearer {token}")),
            None => req,
        };
        let resp = req.send().await.map_err(transport)?;
        let status = resp.status();
        if status.as_u16() == 401 {
            return Err(ApiError::Unauthorized);
        }
        let text = resp.text().await.map_err(transport)?;
        if !status.is_success() {
            let message = serde_json::from_str::<serde_json::Value>(&text)
                .ok()
                .and_then(|v| {
                    v.get("message")
                        .or_else(|| v.get("error"))
                        .and_then(|m| m.as_str())
                        .map(str::to_string)
                })
                .unwrap_or_else(|| text.trim().to_string());
            return Err(ApiError::Remote {
                status: status.as_u16(),
                message,
            });
        }
        serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, ApiError> {
        serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn post_form<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let value = self.execute(self.http.post(self.url(path)).form(body)).await?;
        Self::decode(value)
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let value = self.execute(self.http.post(self.url(path)).json(body)).await?;
        Self::decode(value)
    }

    // ── user endpoints ──────────────────────────────────────────────────

    /// Trigger an email OTP for login or signup.
    pub async fn send_otp(
        &self,
        email: &str,
        password: Option<&str>,
        action: &str,
    ) -> Result<(), ApiError> {
        self.post_json::<_, serde_json::Value>(
            "/user/sendOtp",
            &SendOtpBody {
                email,
                password,
                action,
            },
        )
        .await
        .map(|_| ())
    }

    pub async fn signup(&self, body: &SignupRequest) -> Result<User, ApiError> {
        let env: Envelope<User> = self.post_json("/user/signup", body).await?;
        Ok(env.data)
    }

    pub async fn login(
        &self,
        email: &str,
        password: &str,
        verification_code: &str,
    ) -> Result<LoginResponse, ApiError> {
        self.post_json(
            "/user/login",
            &LoginBody {
                email,
                password,
                verification_code,
            },
        )
        .await
    }

    pub async fn logout(&self) -> Result<(), ApiError> {
        self.post_form::<_, serde_json::Value>("/user/logout", &Empty {})
            .await
            .map(|_| ())
    }

    pub async fn get_current_user(&self) -> Result<User, ApiError> {
        let env: Envelope<User> = self.post_form("/user/getCurrentUser", &Empty {}).await?;
        Ok(env.data)
    }

    /// Resolve a counterparty's public profile by secure id.
    pub async fn get_seller_details(&self, secure_id: &str) -> Result<Counterparty, ApiError> {
        let env: Envelope<Counterparty> = self
            .post_form("/user/getSellerDetails", &SecureIdBody { secure_id })
            .await?;
        Ok(env.data)
    }

    pub async fn update_user(&self, body: &UpdateUserRequest) -> Result<User, ApiError> {
        let env: Envelope<User> = self.post_json("/user/updateuser", body).await?;
        Ok(env.data)
    }

    // ── deal endpoints ──────────────────────────────────────────────────

    pub async fn create_deal(&self, body: &CreateDealRequest) -> Result<Deal, ApiError> {
        let env: Envelope<Deal> = self.post_json("/deal/create", body).await?;
        Ok(env.data)
    }

    /// Respond to a deal request; `decision` is `"accepted"` or `"declined"`.
    pub async fn accept_request(
        &self,
        secure_id: &str,
        deal_id: &str,
        decision: &str,
    ) -> Result<(), ApiError> {
        self.post_form::<_, serde_json::Value>(
            "/deal/acceptRequest",
            &DealDecisionBody {
                secure_id,
                deal_id,
                status: decision,
            },
        )
        .await
        .map(|_| ())
    }

    pub async fn delete_deal(&self, secure_id: &str, deal_id: &str) -> Result<(), ApiError> {
        self.execute(
            self.http
                .delete(self.url("/deal/delete"))
                .form(&DealRefBody { secure_id, deal_id }),
        )
        .await
        .map(|_| ())
    }

    pub async fn cancel_deal(&self, user_id: &str, deal_id: &str) -> Result<(), ApiError> {
        self.post_form::<_, serde_json::Value>(
            "/deal/cancelDeal",
            &CancelDealBody { user_id, deal_id },
        )
        .await
        .map(|_| ())
    }

    pub async fn user_deals(
        &self,
        user_id: &str,
        secure_id: &str,
        page: u32,
        limit: u32,
    ) -> Result<DealPage, ApiError> {
        let env: Envelope<DealPage> = self
            .post_form(
                "/deal/user_deals",
                &UserDealsBody {
                    user_id,
                    secure_id,
                    page,
                    limit,
                },
            )
            .await?;
        Ok(env.data)
    }

    /// Deals awaiting the current user's approval.
    pub async fn user_requests(&self) -> Result<Vec<Deal>, ApiError> {
        let env: Envelope<Vec<Deal>> = self.post_form("/deal/user_requests", &Empty {}).await?;
        Ok(env.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deal_page_tolerates_missing_fields() {
        let page: DealPage = serde_json::from_str("{}").unwrap();
        assert!(page.deals.is_empty());
        assert_eq!(page.total_pages, 0);
    }

    #[test]
    fn request_bodies_use_wire_names() {
        let json = serde_json::to_value(&UserDealsBody {
            user_id: "u1",
            secure_id: "SD-1",
            page: 1,
            limit: 50,
        })
        .unwrap();
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["secureId"], "SD-1");
        let json = serde_json::to_value(&DealDecisionBody {
            secure_id: "SD-1",
            deal_id: "d1",
            status: "accepted",
        })
        .unwrap();
        assert_eq!(json["secureId"], "SD-1");
        assert_eq!(json["dealId"], "d1");
        assert_eq!(json["status"], "accepted");
    }
}
