//! Driving port for reading a user's credit position.

use async_trait::async_trait;

use crate::domain::{CreditGrant, Error, PaymentRecord, UserId};

/// Snapshot returned by the credit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditSummary {
    /// Sum of unused credits across grants. Administrators still see their
    /// real grant total here; `is_admin` tells callers it is not a limit.
    pub available_credits: u64,
    pub is_admin: bool,
    pub credit_breakdown: Vec<CreditGrant>,
    pub recent_payments: Vec<PaymentRecord>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CreditsQuery: Send + Sync {
    async fn credit_summary(&self, user_id: &UserId) -> Result<CreditSummary, Error>;
}
