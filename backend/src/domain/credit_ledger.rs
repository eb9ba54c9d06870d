//! Credit ledger domain service.
//!
//! Wraps the ledger repository with balance derivation, administrator
//! handling and the one-time signup grant. The repository owns atomicity;
//! this service owns policy.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::domain::ports::{
    CreditLedgerRepository, CreditLedgerRepositoryError, CreditSummary, CreditsQuery,
    PaymentRepository,
};
use crate::domain::payments::map_payment_repository_error;
use crate::domain::{
    CreditBalance, CreditGrant, CreditSource, Error, NewCreditGrant, UserId, available_credits,
};

/// Payments listed alongside the credit breakdown.
const RECENT_PAYMENT_LIMIT: u32 = 10;

pub(crate) fn map_ledger_error(error: CreditLedgerRepositoryError) -> Error {
    match error {
        CreditLedgerRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("credit ledger unavailable: {message}"))
        }
        CreditLedgerRepositoryError::Query { message } => {
            Error::internal(format!("credit ledger error: {message}"))
        }
    }
}

/// Balance derivation and credit mutation for a user.
pub struct CreditLedgerService<L> {
    ledger: Arc<L>,
    signup_credits: u32,
}

impl<L> Clone for CreditLedgerService<L> {
    fn clone(&self) -> Self {
        Self {
            ledger: Arc::clone(&self.ledger),
            signup_credits: self.signup_credits,
        }
    }
}

impl<L> CreditLedgerService<L> {
    /// Create a ledger service granting `signup_credits` on first sign-in.
    pub fn new(ledger: Arc<L>, signup_credits: u32) -> Self {
        Self {
            ledger,
            signup_credits,
        }
    }
}

impl<L: CreditLedgerRepository> CreditLedgerService<L> {
    /// Spendable balance: unlimited for administrators, otherwise the sum of
    /// unused credits across grants.
    pub async fn available_credits(&self, user_id: &UserId) -> Result<CreditBalance, Error> {
        if self.is_admin(user_id).await? {
            return Ok(CreditBalance::Unlimited);
        }
        let grants = self.grants(user_id).await?;
        Ok(CreditBalance::Limited(available_credits(&grants)))
    }

    /// Every grant held by the user, oldest first.
    pub async fn grants(&self, user_id: &UserId) -> Result<Vec<CreditGrant>, Error> {
        self.ledger
            .list_grants(user_id)
            .await
            .map_err(map_ledger_error)
    }

    pub async fn is_admin(&self, user_id: &UserId) -> Result<bool, Error> {
        self.ledger.is_admin(user_id).await.map_err(map_ledger_error)
    }

    /// Append a grant of `amount` credits.
    ///
    /// This is a plain insert. Callers that must not double-apply (payment
    /// settlement) go through the settlement port instead.
    pub async fn add_credits(
        &self,
        user_id: &UserId,
        amount: u32,
        source: CreditSource,
    ) -> Result<CreditGrant, Error> {
        let grant = NewCreditGrant::try_new(user_id.clone(), amount, source)
            .map_err(|err| Error::invalid_request(err.to_string()))?;
        let stored = self
            .ledger
            .insert_grant(grant)
            .await
            .map_err(map_ledger_error)?;
        info!(user_id = %user_id, credits = amount, source = %source, "credits added");
        Ok(stored)
    }

    /// Consume exactly one credit.
    ///
    /// Returns `false` without mutating anything when the user has no
    /// capacity left. Administrators are never charged.
    pub async fn deduct_credit(&self, user_id: &UserId) -> Result<bool, Error> {
        if self.is_admin(user_id).await? {
            debug!(user_id = %user_id, "administrator publish; no credit consumed");
            return Ok(true);
        }
        let charged = self
            .ledger
            .consume_one(user_id)
            .await
            .map_err(map_ledger_error)?;
        match charged {
            Some(grant_id) => {
                debug!(user_id = %user_id, grant_id = %grant_id, "credit consumed");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Issue the one-time signup grant. Returns the credits granted, or
    /// `None` when the user already received it.
    pub async fn grant_signup_credits(&self, user_id: &UserId) -> Result<Option<u32>, Error> {
        if self.signup_credits == 0 {
            return Ok(None);
        }
        let grant = NewCreditGrant::try_new(user_id.clone(), self.signup_credits, CreditSource::Free)
            .map_err(|err| Error::internal(err.to_string()))?;
        let inserted = self
            .ledger
            .insert_free_grant_once(grant)
            .await
            .map_err(map_ledger_error)?;
        Ok(inserted.map(|grant| {
            info!(user_id = %user_id, credits = grant.total_credits, "signup credits granted");
            grant.total_credits
        }))
    }
}

/// Read model for the credit check endpoint.
pub struct CreditOverviewService<L, P> {
    ledger: CreditLedgerService<L>,
    payments: Arc<P>,
}

impl<L, P> CreditOverviewService<L, P> {
    pub fn new(ledger: CreditLedgerService<L>, payments: Arc<P>) -> Self {
        Self { ledger, payments }
    }
}

#[async_trait]
impl<L, P> CreditsQuery for CreditOverviewService<L, P>
where
    L: CreditLedgerRepository,
    P: PaymentRepository,
{
    async fn credit_summary(&self, user_id: &UserId) -> Result<CreditSummary, Error> {
        let is_admin = self.ledger.is_admin(user_id).await?;
        let credit_breakdown = self.ledger.grants(user_id).await?;
        let recent_payments = self
            .payments
            .list_recent(user_id, RECENT_PAYMENT_LIMIT)
            .await
            .map_err(map_payment_repository_error)?;
        Ok(CreditSummary {
            available_credits: available_credits(&credit_breakdown),
            is_admin,
            credit_breakdown,
            recent_payments,
        })
    }
}
