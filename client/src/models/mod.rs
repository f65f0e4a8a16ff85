use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of a deal, as carried on the wire by `progressStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DealStatus {
    #[serde(rename = "awaiting approval")]
    AwaitingApproval,
    #[serde(rename = "declined")]
    Declined,
    #[serde(rename = "awaiting payment")]
    AwaitingPayment,
    #[serde(rename = "in progress")]
    InProgress,
    #[serde(rename = "canceled")]
    Canceled,
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "dispute")]
    Dispute,
}

impl DealStatus {
    /// Whether moving from `self` to `next` is a legal lifecycle step.
    ///
    /// Transitions happen only through explicit user actions; the client
    /// refuses anything outside this relation before touching the network.
    pub fn can_transition_to(self, next: DealStatus) -> bool {
        use DealStatus::*;
        matches!(
            (self, next),
            (AwaitingApproval, Declined)
                | (AwaitingApproval, AwaitingPayment)
                | (AwaitingPayment, InProgress)
                | (AwaitingPayment, Canceled)
                | (InProgress, Completed)
                | (InProgress, Dispute)
        )
    }

    pub fn is_terminal(self) -> bool {
        use DealStatus::*;
        matches!(self, Declined | Canceled | Completed | Dispute)
    }

    pub fn as_str(self) -> &'static str {
        use DealStatus::*;
        match self {
            AwaitingApproval => "awaiting approval",
            Declined => "declined",
            AwaitingPayment => "awaiting payment",
            InProgress => "in progress",
            Canceled => "canceled",
            Completed => "completed",
            Dispute => "dispute",
        }
    }
}

impl fmt::Display for DealStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Contact platform for a user's reachable handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Whatsapp,
    Telegram,
    Instagram,
    Facebook,
    Tiktok,
    Phone,
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "whatsapp" => Ok(Platform::Whatsapp),
            "telegram" => Ok(Platform::Telegram),
            "instagram" => Ok(Platform::Instagram),
            "facebook" => Ok(Platform::Facebook),
            "tiktok" => Ok(Platform::Tiktok),
            "phone" => Ok(Platform::Phone),
            other => Err(format!("unknown contact platform: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletKind {
    Phantom,
    Solflare,
}

impl WalletKind {
    /// Error message surfaced when an address fails validation for this type.
    pub fn invalid_address_message(self) -> &'static str {
        match self {
            WalletKind::Phantom => {
                "Invalid Phantom wallet address. Please enter a valid Solana address."
            }
            WalletKind::Solflare => {
                "Invalid Solflare wallet address. Please enter a valid Solana address."
            }
        }
    }
}

impl FromStr for WalletKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "phantom" => Ok(WalletKind::Phantom),
            "solflare" => Ok(WalletKind::Solflare),
            other => Err(format!("unknown wallet type: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub platform: Platform,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletAddress {
    pub name: String,
    pub address: String,
    pub wallet_type: WalletKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub location: Option<String>,
    pub secure_id: String,
    #[serde(default)]
    pub business_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub contacts: Vec<Contact>,
    #[serde(default)]
    pub wallets: Vec<WalletAddress>,
}

/// Public profile of a counterparty resolved by secure id before a deal is
/// created. Slimmer than [`User`]: the server only discloses lookup fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Counterparty {
    #[serde(rename = "_id", default)]
    pub id: String,
    pub secure_id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub business_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deliverable {
    pub description: String,
    #[serde(default)]
    pub completed: bool,
}

/// Uploaded supporting document reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRef {
    pub public_id: String,
    pub url: String,
    pub name: String,
    pub mime_type: String,
}

/// Uploaded image reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRef {
    pub public_id: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deal {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    pub currency: String,
    pub user_id: String,
    pub secure_id: String,
    pub duration: u32,
    #[serde(default)]
    pub deliverables: Vec<Deliverable>,
    #[serde(default)]
    pub files: Vec<FileRef>,
    #[serde(default)]
    pub images: Vec<ImageRef>,
    pub progress_status: DealStatus,
    #[serde(default)]
    pub request_expiry_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
}

impl Deal {
    /// Delivery deadline derived from creation time and duration in days.
    pub fn deadline(&self) -> DateTime<Utc> {
        self.created_at + Duration::days(i64::from(self.duration))
    }

    /// Display-only expiry check; expiry never mutates the deal's status.
    pub fn is_request_expired(&self, now: DateTime<Utc>) -> bool {
        self.request_expiry_date.map(|d| d < now).unwrap_or(false)
    }
}

/// Record of a settled (or failed) on-chain payment, built for later relay
/// to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    pub amount: String,
    pub sender: String,
    pub recipient: String,
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 50,
            total_pages: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn status_transitions_follow_lifecycle() {
        use DealStatus::*;
        assert!(AwaitingApproval.can_transition_to(AwaitingPayment));
        assert!(AwaitingApproval.can_transition_to(Declined));
        assert!(AwaitingPayment.can_transition_to(InProgress));
        assert!(AwaitingPayment.can_transition_to(Canceled));
        assert!(InProgress.can_transition_to(Completed));
        assert!(InProgress.can_transition_to(Dispute));

        assert!(!AwaitingApproval.can_transition_to(InProgress));
        assert!(!AwaitingApproval.can_transition_to(Completed));
        assert!(!AwaitingPayment.can_transition_to(Declined));
        assert!(!Completed.can_transition_to(Dispute));
        assert!(!Declined.can_transition_to(AwaitingPayment));
        assert!(!Canceled.can_transition_to(InProgress));
    }

    #[test]
    fn terminal_states_accept_no_transitions() {
        use DealStatus::*;
        let all = [
            AwaitingApproval,
            Declined,
            AwaitingPayment,
            InProgress,
            Canceled,
            Completed,
            Dispute,
        ];
        for from in all {
            if from.is_terminal() {
                for to in all {
                    assert!(!from.can_transition_to(to), "{from} must be terminal");
                }
            }
        }
    }

    #[test]
    fn status_uses_wire_strings() {
        let json = serde_json::to_string(&DealStatus::AwaitingPayment).unwrap();
        assert_eq!(json, "\"awaiting payment\"");
        let back: DealStatus = serde_json::from_str("\"awaiting approval\"").unwrap();
        assert_eq!(back, DealStatus::AwaitingApproval);
    }

    #[test]
    fn deal_uses_wire_field_names() {
        let deal = Deal {
            id: "d1".into(),
            title: "Website Design Project".into(),
            description: "Complete redesign".into(),
            price: 500.0,
            currency: "USDC".into(),
            user_id: "u1".into(),
            secure_id: "SD-123".into(),
            duration: 14,
            deliverables: vec![Deliverable {
                description: "Design mockups".into(),
                completed: false,
            }],
            files: vec![],
            images: vec![],
            progress_status: DealStatus::AwaitingApproval,
            request_expiry_date: None,
            created_at: Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap(),
            from: Some("Acme".into()),
            to: Some("Studio".into()),
        };
        let value = serde_json::to_value(&deal).unwrap();
        assert_eq!(value["_id"], "d1");
        assert_eq!(value["userId"], "u1");
        assert_eq!(value["secureId"], "SD-123");
        assert_eq!(value["progressStatus"], "awaiting approval");
    }

    #[test]
    fn expiry_is_display_only() {
        let created = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let deal = Deal {
            id: "d1".into(),
            title: "t".into(),
            description: String::new(),
            price: 1.0,
            currency: "USDC".into(),
            user_id: "u1".into(),
            secure_id: "s1".into(),
            duration: 7,
            deliverables: vec![],
            files: vec![],
            images: vec![],
            progress_status: DealStatus::AwaitingApproval,
            request_expiry_date: Some(created + Duration::days(2)),
            created_at: created,
            from: None,
            to: None,
        };
        assert!(!deal.is_request_expired(created + Duration::days(1)));
        assert!(deal.is_request_expired(created + Duration::days(3)));
        // the status itself never changes because of time
        assert_eq!(deal.progress_status, DealStatus::AwaitingApproval);
        assert_eq!(deal.deadline(), created + Duration::days(7));
    }
}
