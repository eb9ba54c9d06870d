//! Port for payment record persistence and settlement.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{CreditGrant, NewCreditGrant, PaymentRecord, PaymentStatus, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by payment repository adapters.
    pub enum PaymentRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "payment repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "payment repository query failed: {message}",
        /// A record with the same receipt or gateway order already exists.
        Duplicate { message: String } =>
            "payment record already exists: {message}",
        /// The record to settle does not exist.
        NotFound { order_id: String } =>
            "no payment record for order {order_id}",
        /// The record is in a state that cannot be settled.
        InvalidState { status: String } =>
            "payment record cannot be settled from status {status}",
    }
}

/// Settlement of a pending payment together with its credit grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementRequest {
    pub record_id: Uuid,
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub grant: NewCreditGrant,
    pub settled_at: DateTime<Utc>,
}

/// Result of a settlement attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementOutcome {
    /// This call flipped the record to `success` and appended the grant.
    Settled {
        record: PaymentRecord,
        grant: CreditGrant,
    },
    /// Another call settled the record first; nothing was written.
    AlreadySettled(PaymentRecord),
}

impl SettlementOutcome {
    pub fn record(&self) -> &PaymentRecord {
        match self {
            Self::Settled { record, .. } | Self::AlreadySettled(record) => record,
        }
    }
}

/// Port for payment records.
///
/// `settle` must flip `pending → success` and append the grant in one
/// atomic unit, and must be conditional on the stored status still being
/// pending so that concurrent verifications credit at most once.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Persist a freshly created pending record.
    async fn insert_pending(&self, record: &PaymentRecord) -> Result<(), PaymentRepositoryError>;

    /// Find a record by gateway order id, scoped to its owner.
    async fn find_by_order(
        &self,
        gateway_order_id: &str,
        user_id: &UserId,
    ) -> Result<Option<PaymentRecord>, PaymentRepositoryError>;

    /// Settle a pending record and append its credit grant.
    async fn settle(
        &self,
        request: SettlementRequest,
    ) -> Result<SettlementOutcome, PaymentRepositoryError>;

    /// Most recent records for the user, newest first.
    async fn list_recent(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<PaymentRecord>, PaymentRepositoryError>;
}

/// Reject settlement of records that are not pending or already successful.
pub fn ensure_settleable(record: &PaymentRecord) -> Result<(), PaymentRepositoryError> {
    match record.status {
        PaymentStatus::Pending | PaymentStatus::Success => Ok(()),
        PaymentStatus::Failed => Err(PaymentRepositoryError::invalid_state(
            record.status.as_str(),
        )),
    }
}
