//! Payment verification: signature check, idempotent settlement, crediting.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::{info, warn};

use crate::domain::ports::{
    PaymentRepository, PaymentVerificationCommand, PaymentVerificationRequest, SettlementOutcome,
    SettlementRequest, VerifiedPayment, ensure_settleable,
};
use crate::domain::{CreditSource, Error, NewCreditGrant, PaymentRecord, PaymentSignatureVerifier};

use super::map_payment_repository_error;

fn require_field<'a>(value: &'a str, field: &str) -> Result<&'a str, Error> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(
            Error::invalid_request(format!("missing required field: {field}")).with_details(
                serde_json::json!({ "field": field, "code": "missing_field" }),
            ),
        );
    }
    Ok(trimmed)
}

fn verified(record: &PaymentRecord, replayed: bool) -> VerifiedPayment {
    VerifiedPayment {
        credits_added: record.credits_purchased,
        amount_paid: record.amount,
        currency: record.currency.clone(),
        replayed,
    }
}

/// Applies credits exactly once per verified payment.
pub struct PaymentVerificationService<P> {
    payments: Arc<P>,
    verifier: PaymentSignatureVerifier,
    clock: Arc<dyn Clock>,
}

impl<P> PaymentVerificationService<P> {
    pub fn new(payments: Arc<P>, verifier: PaymentSignatureVerifier, clock: Arc<dyn Clock>) -> Self {
        Self {
            payments,
            verifier,
            clock,
        }
    }
}

#[async_trait]
impl<P: PaymentRepository> PaymentVerificationCommand for PaymentVerificationService<P> {
    async fn verify(&self, request: PaymentVerificationRequest) -> Result<VerifiedPayment, Error> {
        let order_id = require_field(&request.gateway_order_id, "gatewayOrderId")?;
        let payment_id = require_field(&request.gateway_payment_id, "gatewayPaymentId")?;
        let signature = require_field(&request.signature, "signature")?;

        if !self.verifier.verify(order_id, payment_id, signature) {
            warn!(
                security_event = "payment_signature_mismatch",
                user_id = %request.user_id,
                order_id,
                payment_id,
                "rejected payment with invalid signature"
            );
            return Err(Error::invalid_signature("payment signature mismatch"));
        }

        let record = self
            .payments
            .find_by_order(order_id, &request.user_id)
            .await
            .map_err(map_payment_repository_error)?
            .ok_or_else(|| Error::not_found("payment record not found"))?;

        if record.is_settled() {
            info!(order_id, user_id = %request.user_id, "payment already settled; replaying");
            return Ok(verified(&record, true));
        }
        ensure_settleable(&record).map_err(map_payment_repository_error)?;

        let grant = NewCreditGrant::try_new(
            request.user_id.clone(),
            record.credits_purchased,
            CreditSource::Purchase,
        )
        .map_err(|err| Error::internal(format!("payment record has no credits: {err}")))?
        .for_payment(record.id);

        let outcome = self
            .payments
            .settle(SettlementRequest {
                record_id: record.id,
                gateway_order_id: order_id.to_owned(),
                gateway_payment_id: payment_id.to_owned(),
                grant,
                settled_at: self.clock.utc(),
            })
            .await
            .map_err(map_payment_repository_error)?;

        match outcome {
            SettlementOutcome::Settled { record, grant } => {
                info!(
                    order_id,
                    payment_id,
                    user_id = %request.user_id,
                    grant_id = %grant.id,
                    credits = record.credits_purchased,
                    "payment settled"
                );
                Ok(verified(&record, false))
            }
            SettlementOutcome::AlreadySettled(record) => {
                info!(order_id, "payment settled concurrently; replaying");
                Ok(verified(&record, true))
            }
        }
    }
}
