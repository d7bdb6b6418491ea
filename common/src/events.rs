//! Wire event schemas. Field names match the JSON contract exactly,
//! since they are consumed by other services.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VerificationStatus {
    Approved,
    Declined,
}

impl VerificationStatus {
    pub fn is_approved(self) -> bool {
        matches!(self, VerificationStatus::Approved)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentCreatedEvent {
    pub id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub currency: String,
    pub status: String,
    pub method: String,
    pub customer_id: String,
    pub trace_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FraudCheckEvent {
    pub id: String,
    pub trace_id: String,
    pub status: VerificationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub checked_at: DateTime<Utc>,
}

/// Used on both `wallet.funds.verified` (orchestrator-facing) and
/// `wallet.response` (metrics-facing).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletResponseEvent {
    pub payment_id: String,
    pub user_id: String,
    pub status: VerificationStatus,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletDebitRequestedEvent {
    pub payment_id: String,
    pub user_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub reason: String,
    pub trace_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DlqMessage {
    pub original_topic: String,
    pub key: String,
    pub value: String,
    pub timestamp: DateTime<Utc>,
    pub attempts: u32,
}
