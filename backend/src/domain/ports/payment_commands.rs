//! Driving ports for buying credits.
//!
//! Checkout is two-legged: the client asks for an order, completes payment
//! in the gateway's UI and then forwards the gateway's signed result for
//! verification.

use async_trait::async_trait;

use crate::domain::{Error, UserId};

/// Details a client needs to launch the gateway checkout.
///
/// Contains the public key id only; the secret never leaves the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedPaymentOrder {
    pub order_id: String,
    pub amount: u64,
    pub currency: String,
    pub credits: u32,
    pub public_key: String,
}

/// Signed checkout result forwarded by the client.
///
/// Fields arrive as raw strings; empty values are rejected by the verifier
/// before any lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentVerificationRequest {
    pub user_id: UserId,
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub signature: String,
}

/// Outcome of a successful verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedPayment {
    pub credits_added: u32,
    pub amount_paid: u64,
    pub currency: String,
    /// The payment had already been settled by an earlier call.
    pub replayed: bool,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentOrderCommand: Send + Sync {
    /// Create a pending order for a known plan.
    async fn create_order(
        &self,
        user_id: &UserId,
        plan_id: &str,
    ) -> Result<CreatedPaymentOrder, Error>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentVerificationCommand: Send + Sync {
    /// Verify a checkout result and credit the ledger exactly once.
    async fn verify(&self, request: PaymentVerificationRequest) -> Result<VerifiedPayment, Error>;
}
