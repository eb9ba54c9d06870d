//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. They exist solely to satisfy Diesel's
//! type requirements for queries and mutations.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use super::diesel_error_mapping::{from_i32, to_i32};
use super::schema::{credit_grants, payment_records, posts};
use crate::domain::{
    CreditGrant, NewCreditGrant, PaymentRecord, PaymentStatus, Post, TransactionId, UserId,
};

// ---------------------------------------------------------------------------
// Credit grant models
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = credit_grants)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CreditGrantRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total_credits: i32,
    pub used_credits: i32,
    pub source: String,
    pub payment_record_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl CreditGrantRow {
    /// Convert into the domain grant, rejecting corrupted columns.
    pub fn into_domain(self) -> Result<CreditGrant, String> {
        Ok(CreditGrant {
            id: self.id,
            user_id: UserId::from_uuid(self.user_id),
            total_credits: from_i32(self.total_credits, "total_credits")?,
            used_credits: from_i32(self.used_credits, "used_credits")?,
            source: self
                .source
                .parse()
                .map_err(|err| format!("invalid credit source in database: {err}"))?,
            payment_record_id: self.payment_record_id,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = credit_grants)]
pub(crate) struct NewCreditGrantRow<'a> {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total_credits: i32,
    pub source: &'a str,
    pub payment_record_id: Option<Uuid>,
}

impl NewCreditGrantRow<'static> {
    /// Build the insert row for a grant under a fresh id.
    pub fn from_grant(grant: &NewCreditGrant) -> Result<Self, String> {
        Ok(Self {
            id: Uuid::new_v4(),
            user_id: *grant.user_id().as_uuid(),
            total_credits: to_i32(grant.credits(), "total_credits")?,
            source: grant.source().as_str(),
            payment_record_id: grant.payment_record_id(),
        })
    }
}

// ---------------------------------------------------------------------------
// Payment record models
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = payment_records)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct PaymentRecordRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: i64,
    pub currency: String,
    pub credits_purchased: i32,
    pub transaction_id: String,
    pub gateway_order_id: String,
    pub gateway_payment_id: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentRecordRow {
    /// Convert into the domain record, rejecting corrupted columns.
    pub fn into_domain(self) -> Result<PaymentRecord, String> {
        let status: PaymentStatus = self
            .status
            .parse()
            .map_err(|err| format!("invalid payment status in database: {err}"))?;
        Ok(PaymentRecord {
            id: self.id,
            user_id: UserId::from_uuid(self.user_id),
            amount: u64::try_from(self.amount)
                .map_err(|_| format!("negative amount in database: {}", self.amount))?,
            currency: self.currency,
            credits_purchased: from_i32(self.credits_purchased, "credits_purchased")?,
            transaction_id: TransactionId::from_persisted(self.transaction_id),
            gateway_order_id: self.gateway_order_id,
            gateway_payment_id: self.gateway_payment_id,
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = payment_records)]
pub(crate) struct NewPaymentRecordRow<'a> {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: i64,
    pub currency: &'a str,
    pub credits_purchased: i32,
    pub transaction_id: &'a str,
    pub gateway_order_id: &'a str,
    pub status: &'a str,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Post models
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = posts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct PostRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub status: String,
    pub audio_file_name: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub linkedin_post_id: Option<String>,
    pub image_url: Option<String>,
    pub image_source_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PostRow {
    /// Convert into the domain post, rejecting unknown statuses.
    pub fn into_domain(self) -> Result<Post, String> {
        Ok(Post {
            id: self.id,
            user_id: UserId::from_uuid(self.user_id),
            content: self.content,
            status: self
                .status
                .parse()
                .map_err(|err| format!("invalid post status in database: {err}"))?,
            audio_file_name: self.audio_file_name,
            scheduled_at: self.scheduled_at,
            linkedin_post_id: self.linkedin_post_id,
            image_url: self.image_url,
            image_source_type: self.image_source_type,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = posts)]
pub(crate) struct NewPostRow<'a> {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content: &'a str,
    pub status: &'a str,
    pub audio_file_name: Option<&'a str>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub linkedin_post_id: Option<&'a str>,
    pub image_url: Option<&'a str>,
    pub image_source_type: Option<&'a str>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Changeset applied by compare-and-swap post transitions. `None` fields
/// are left untouched.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = posts)]
pub(crate) struct PostTransitionChangeset {
    pub status: String,
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub image_source_type: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub linkedin_post_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}
