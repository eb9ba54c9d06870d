//! Locally persisted payment records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{PricePlan, UserId};

/// Settlement state of a payment record.
///
/// The only permitted transition is `Pending → Success` (or
/// `Pending → Failed`); settled records never change status again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
}

impl PaymentStatus {
    /// Persisted string form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a persisted payment status string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown payment status: {0}")]
pub struct UnknownPaymentStatus(pub String);

impl FromStr for PaymentStatus {
    type Err = UnknownPaymentStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            other => Err(UnknownPaymentStatus(other.to_owned())),
        }
    }
}

/// Local receipt key sent to the gateway and stored uniquely per record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    /// Generate a fresh receipt key.
    ///
    /// Keys fit the gateway's 40 character receipt limit.
    ///
    /// # Examples
    /// ```
    /// use voicepost_backend::domain::TransactionId;
    ///
    /// let first = TransactionId::generate();
    /// assert!(first.as_str().starts_with("rcpt_"));
    /// assert!(first.as_str().len() <= 40);
    /// assert_ne!(first, TransactionId::generate());
    /// ```
    pub fn generate() -> Self {
        Self(format!("rcpt_{}", Uuid::new_v4().simple()))
    }

    /// Wrap a previously persisted key.
    pub fn from_persisted(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A payment intent and its settlement outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub id: Uuid,
    pub user_id: UserId,
    /// Amount in minor currency units.
    pub amount: u64,
    pub currency: String,
    pub credits_purchased: u32,
    pub transaction_id: TransactionId,
    pub gateway_order_id: String,
    pub gateway_payment_id: Option<String>,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentRecord {
    /// Build a pending record for a freshly created gateway order.
    pub fn pending(
        user_id: UserId,
        plan: &PricePlan,
        transaction_id: TransactionId,
        gateway_order_id: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            amount: plan.amount,
            currency: plan.currency.clone(),
            credits_purchased: plan.credits,
            transaction_id,
            gateway_order_id: gateway_order_id.into(),
            gateway_payment_id: None,
            status: PaymentStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.status == PaymentStatus::Success
    }
}
