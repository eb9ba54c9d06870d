//! Credit consumption gate in front of publishing.
//!
//! A publish attempt is admitted only after one credit has been consumed
//! server-side. Credits consumed by attempts that later fail are not
//! refunded; they are logged so an operator can issue an adjustment grant.

use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::ports::CreditLedgerRepository;
use crate::domain::{CreditLedgerService, Error, UserId};

/// Gate charging one credit per publish attempt.
pub struct CreditConsumptionGate<L> {
    ledger: CreditLedgerService<L>,
}

impl<L> Clone for CreditConsumptionGate<L> {
    fn clone(&self) -> Self {
        Self {
            ledger: self.ledger.clone(),
        }
    }
}

impl<L> CreditConsumptionGate<L> {
    pub fn new(ledger: CreditLedgerService<L>) -> Self {
        Self { ledger }
    }

    /// Log a credit consumed by an attempt that did not publish.
    pub fn record_lost_credit(&self, user_id: &UserId, post_id: Uuid, reason: &str) {
        warn!(
            user_id = %user_id,
            post_id = %post_id,
            reason,
            "credit consumed without a successful publish; manual adjustment required"
        );
    }
}

impl<L: CreditLedgerRepository> CreditConsumptionGate<L> {
    /// Consume one credit for `post_id`, or fail with `InsufficientCredits`.
    pub async fn admit(&self, user_id: &UserId, post_id: Uuid) -> Result<(), Error> {
        if self.ledger.deduct_credit(user_id).await? {
            return Ok(());
        }
        info!(user_id = %user_id, post_id = %post_id, "publish refused: no credits");
        Err(
            Error::insufficient_credits("insufficient credits to publish").with_details(json!({
                "availableCredits": 0,
                "code": "insufficient_credits",
            })),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::ports::MockCreditLedgerRepository;
    use std::sync::Arc;

    fn gate(charged: bool) -> CreditConsumptionGate<MockCreditLedgerRepository> {
        let mut ledger = MockCreditLedgerRepository::new();
        ledger.expect_is_admin().returning(|_| Ok(false));
        ledger
            .expect_consume_one()
            .times(1)
            .returning(move |_| Ok(charged.then(Uuid::new_v4)));
        CreditConsumptionGate::new(CreditLedgerService::new(Arc::new(ledger), 3))
    }

    #[tokio::test]
    async fn admits_when_a_credit_is_consumed() {
        gate(true)
            .admit(&UserId::random(), Uuid::new_v4())
            .await
            .expect("admitted");
    }

    #[tokio::test]
    async fn refuses_with_insufficient_credits() {
        let err = gate(false)
            .admit(&UserId::random(), Uuid::new_v4())
            .await
            .expect_err("refused");
        assert_eq!(err.code(), ErrorCode::InsufficientCredits);
    }
}
