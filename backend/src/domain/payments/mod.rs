//! Payment domain: the price table, payment records, gateway signatures and
//! the order and verification services.

mod order_service;
mod plan;
mod record;
mod signature;
mod verification_service;

pub use order_service::PaymentOrderService;
pub use plan::{PricePlan, PricePlanTable};
pub use record::{PaymentRecord, PaymentStatus, TransactionId, UnknownPaymentStatus};
pub use signature::{GatewaySecret, PaymentSignatureVerifier};
pub use verification_service::PaymentVerificationService;

use serde_json::json;

use crate::domain::Error;
use crate::domain::ports::{PaymentGatewayError, PaymentRepositoryError};

pub(crate) fn map_payment_repository_error(error: PaymentRepositoryError) -> Error {
    match error {
        PaymentRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("payment repository unavailable: {message}"))
        }
        PaymentRepositoryError::Query { message } => {
            Error::internal(format!("payment repository error: {message}"))
        }
        // Receipt keys are generated per call; a collision is never retried.
        PaymentRepositoryError::Duplicate { message } => {
            Error::internal(format!("payment record collision: {message}"))
        }
        PaymentRepositoryError::NotFound { .. } => Error::not_found("payment record not found"),
        PaymentRepositoryError::InvalidState { status } => {
            Error::conflict("payment can no longer be settled").with_details(json!({
                "status": status,
                "code": "payment_not_pending",
            }))
        }
    }
}

pub(crate) fn map_gateway_error(error: PaymentGatewayError) -> Error {
    tracing::warn!(error = %error, "payment gateway request failed");
    Error::external_service("payment gateway request failed")
}
