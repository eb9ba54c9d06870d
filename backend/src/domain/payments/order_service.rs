//! Payment order creation.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::{info, warn};

use crate::domain::ports::{
    CreatedPaymentOrder, GatewayOrderRequest, PaymentGateway, PaymentOrderCommand,
    PaymentRepository,
};
use crate::domain::{Error, PaymentRecord, PricePlan, PricePlanTable, TransactionId, UserId};

use super::{map_gateway_error, map_payment_repository_error};

/// Creates gateway orders for known plans and records them as pending.
pub struct PaymentOrderService<G: ?Sized, P> {
    gateway: Arc<G>,
    payments: Arc<P>,
    plans: PricePlanTable,
    public_key: String,
    clock: Arc<dyn Clock>,
}

impl<G: ?Sized, P> PaymentOrderService<G, P> {
    /// `public_key` is the gateway key id handed to checkout clients.
    pub fn new(
        gateway: Arc<G>,
        payments: Arc<P>,
        plans: PricePlanTable,
        public_key: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            gateway,
            payments,
            plans,
            public_key: public_key.into(),
            clock,
        }
    }

    fn plan(&self, plan_id: &str) -> Result<&PricePlan, Error> {
        self.plans.get(plan_id).ok_or_else(|| {
            let allowed: Vec<_> = self.plans.plan_ids().collect();
            Error::invalid_request("unknown plan").with_details(json!({
                "field": "planId",
                "value": plan_id,
                "allowed": allowed,
                "code": "unknown_plan",
            }))
        })
    }
}

#[async_trait]
impl<G, P> PaymentOrderCommand for PaymentOrderService<G, P>
where
    G: PaymentGateway + ?Sized,
    P: PaymentRepository,
{
    async fn create_order(
        &self,
        user_id: &UserId,
        plan_id: &str,
    ) -> Result<CreatedPaymentOrder, Error> {
        let plan = self.plan(plan_id)?;
        let receipt = TransactionId::generate();
        let request = GatewayOrderRequest {
            amount: plan.amount,
            currency: plan.currency.clone(),
            receipt: receipt.clone(),
            plan_id: plan.id.clone(),
        };

        let order = self
            .gateway
            .create_order(&request)
            .await
            .map_err(map_gateway_error)?;
        if order.amount != plan.amount || order.currency != plan.currency {
            warn!(
                order_id = %order.id,
                expected_amount = plan.amount,
                actual_amount = order.amount,
                "gateway order terms differ from plan"
            );
            return Err(Error::external_service(
                "payment gateway returned unexpected order terms",
            ));
        }

        // Persist before answering so an early verification callback finds it.
        let record = PaymentRecord::pending(
            user_id.clone(),
            plan,
            receipt,
            order.id.clone(),
            self.clock.utc(),
        );
        self.payments
            .insert_pending(&record)
            .await
            .map_err(map_payment_repository_error)?;

        info!(
            user_id = %user_id,
            order_id = %order.id,
            transaction_id = %record.transaction_id,
            plan_id = %plan.id,
            "payment order created"
        );
        Ok(CreatedPaymentOrder {
            order_id: order.id,
            amount: plan.amount,
            currency: plan.currency.clone(),
            credits: plan.credits,
            public_key: self.public_key.clone(),
        })
    }
}
