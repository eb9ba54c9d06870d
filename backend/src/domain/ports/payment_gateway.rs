//! Port for the external payment gateway's order API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::TransactionId;

use super::define_port_error;

define_port_error! {
    /// Errors raised when talking to the payment gateway.
    pub enum PaymentGatewayError {
        /// The gateway could not be reached or timed out.
        Transport { message: String } =>
            "payment gateway transport failed: {message}",
        /// The gateway answered with a non-success status.
        Status { status: u16, message: String } =>
            "payment gateway returned status {status}: {message}",
        /// The gateway response could not be decoded.
        Decode { message: String } =>
            "payment gateway response invalid: {message}",
    }
}

/// Parameters for a new gateway order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayOrderRequest {
    /// Amount in minor currency units.
    pub amount: u64,
    pub currency: String,
    /// Local receipt key echoed back by the gateway.
    pub receipt: TransactionId,
    pub plan_id: String,
}

/// An order registered with the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: u64,
    pub currency: String,
}

/// Port for creating orders on the payment gateway.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Register an order and return the gateway's order id.
    async fn create_order(
        &self,
        request: &GatewayOrderRequest,
    ) -> Result<GatewayOrder, PaymentGatewayError>;
}

/// Gateway stand-in that accepts every order.
///
/// Order ids are derived from the receipt so tests can predict them.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixturePaymentGateway;

#[async_trait]
impl PaymentGateway for FixturePaymentGateway {
    async fn create_order(
        &self,
        request: &GatewayOrderRequest,
    ) -> Result<GatewayOrder, PaymentGatewayError> {
        Ok(GatewayOrder {
            id: format!("order_{}", request.receipt.as_str().trim_start_matches("rcpt_")),
            amount: request.amount,
            currency: request.currency.clone(),
        })
    }
}
