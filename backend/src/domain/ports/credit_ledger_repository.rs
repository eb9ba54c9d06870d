//! Port for credit grant persistence.
//!
//! Balances are derived from grants, so the repository only appends grants
//! and increments `used_credits`. Adapters must make [`consume_one`] atomic
//! with respect to concurrent callers for the same user: two callers racing
//! for a single remaining credit must not both succeed.
//!
//! [`consume_one`]: CreditLedgerRepository::consume_one

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{CreditGrant, NewCreditGrant, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by credit ledger adapters.
    pub enum CreditLedgerRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "credit ledger connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "credit ledger query failed: {message}",
    }
}

/// Port for the append-only credit ledger.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CreditLedgerRepository: Send + Sync {
    /// Every grant held by the user, oldest first.
    async fn list_grants(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<CreditGrant>, CreditLedgerRepositoryError>;

    /// Append a grant.
    async fn insert_grant(
        &self,
        grant: NewCreditGrant,
    ) -> Result<CreditGrant, CreditLedgerRepositoryError>;

    /// Append a free grant unless the user already holds one.
    ///
    /// Returns `None` when a free grant already exists.
    async fn insert_free_grant_once(
        &self,
        grant: NewCreditGrant,
    ) -> Result<Option<CreditGrant>, CreditLedgerRepositoryError>;

    /// Atomically consume one credit from the oldest grant with capacity.
    ///
    /// Returns the id of the grant charged, or `None` when no grant has
    /// capacity left.
    async fn consume_one(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Uuid>, CreditLedgerRepositoryError>;

    /// Whether the user holds the administrator role.
    async fn is_admin(&self, user_id: &UserId) -> Result<bool, CreditLedgerRepositoryError>;
}
