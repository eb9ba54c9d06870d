//! Credit grants and balance derivation.
//!
//! A user's balance is never stored directly. It is derived from the grants
//! they hold: each grant carries a total and a used counter, and the
//! available balance is the sum of `total_credits - used_credits` over every
//! grant. Grants are appended (signup, settled payment, manual adjustment)
//! and only ever mutated by incrementing `used_credits`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::UserId;

/// Origin of a credit grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditSource {
    /// One-time grant issued when the user first signs in.
    Free,
    /// Grant issued when a payment settles.
    Purchase,
    /// Manual operator correction.
    Adjustment,
}

impl CreditSource {
    /// Persisted string form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Purchase => "purchase",
            Self::Adjustment => "adjustment",
        }
    }
}

impl fmt::Display for CreditSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a persisted credit source string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown credit source: {0}")]
pub struct UnknownCreditSource(pub String);

impl FromStr for CreditSource {
    type Err = UnknownCreditSource;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "free" => Ok(Self::Free),
            "purchase" => Ok(Self::Purchase),
            "adjustment" => Ok(Self::Adjustment),
            other => Err(UnknownCreditSource(other.to_owned())),
        }
    }
}

/// A persisted credit grant.
///
/// ## Invariants
/// - `used_credits <= total_credits`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditGrant {
    pub id: Uuid,
    pub user_id: UserId,
    pub total_credits: u32,
    pub used_credits: u32,
    pub source: CreditSource,
    /// Payment record that produced this grant, for purchase grants.
    pub payment_record_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl CreditGrant {
    /// Credits still available on this grant.
    pub fn remaining(&self) -> u32 {
        self.total_credits.saturating_sub(self.used_credits)
    }

    /// Whether at least one credit can still be consumed from this grant.
    pub fn has_capacity(&self) -> bool {
        self.used_credits < self.total_credits
    }
}

/// Validation failures for [`NewCreditGrant`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CreditGrantValidationError {
    /// Grants must add at least one credit.
    #[error("credit grants must add at least one credit")]
    ZeroCredits,
}

/// A grant about to be appended to the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCreditGrant {
    user_id: UserId,
    credits: u32,
    source: CreditSource,
    payment_record_id: Option<Uuid>,
}

impl NewCreditGrant {
    /// Validate and build a grant request.
    ///
    /// # Examples
    /// ```
    /// use voicepost_backend::domain::{CreditSource, NewCreditGrant, UserId};
    ///
    /// let grant = NewCreditGrant::try_new(UserId::random(), 30, CreditSource::Purchase)
    ///     .expect("positive grant");
    /// assert_eq!(grant.credits(), 30);
    /// assert!(NewCreditGrant::try_new(UserId::random(), 0, CreditSource::Free).is_err());
    /// ```
    pub fn try_new(
        user_id: UserId,
        credits: u32,
        source: CreditSource,
    ) -> Result<Self, CreditGrantValidationError> {
        if credits == 0 {
            return Err(CreditGrantValidationError::ZeroCredits);
        }
        Ok(Self {
            user_id,
            credits,
            source,
            payment_record_id: None,
        })
    }

    /// Link the grant to the payment record that produced it.
    pub fn for_payment(mut self, payment_record_id: Uuid) -> Self {
        self.payment_record_id = Some(payment_record_id);
        self
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn credits(&self) -> u32 {
        self.credits
    }

    pub fn source(&self) -> CreditSource {
        self.source
    }

    pub fn payment_record_id(&self) -> Option<Uuid> {
        self.payment_record_id
    }

    /// Materialise the grant as a fresh, unused ledger row.
    pub fn into_grant(self, id: Uuid, created_at: DateTime<Utc>) -> CreditGrant {
        CreditGrant {
            id,
            user_id: self.user_id,
            total_credits: self.credits,
            used_credits: 0,
            source: self.source,
            payment_record_id: self.payment_record_id,
            created_at,
        }
    }
}

/// Sum of unused credits across grants.
///
/// # Examples
/// ```
/// use voicepost_backend::domain::available_credits;
///
/// assert_eq!(available_credits(&[]), 0);
/// ```
pub fn available_credits(grants: &[CreditGrant]) -> u64 {
    grants
        .iter()
        .map(|grant| u64::from(grant.remaining()))
        .sum()
}

/// Spendable balance for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditBalance {
    /// Regular users: sum of unused credits.
    Limited(u64),
    /// Administrators publish without consuming credit.
    Unlimited,
}
