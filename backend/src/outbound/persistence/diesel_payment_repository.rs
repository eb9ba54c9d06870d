//! PostgreSQL-backed `PaymentRepository` implementation using Diesel ORM.
//!
//! Settlement runs in one transaction: a conditional
//! `UPDATE ... WHERE status = 'pending'` flips the record, and only the
//! caller whose update touched the row appends the credit grant. A racing
//! verification sees zero updated rows, re-reads the record and reports it
//! as already settled. The unique `payment_record_id` column on
//! `credit_grants` guarantees one grant per payment even if that check were
//! bypassed.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::AsyncConnection as _;
use diesel_async::RunQueryDsl;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use tracing::debug;

use crate::domain::ports::{
    PaymentRepository, PaymentRepositoryError, SettlementOutcome, SettlementRequest,
};
use crate::domain::{PaymentRecord, PaymentStatus, UserId};

use super::diesel_error_mapping::{DbFailure, classify_diesel_error, pool_error_message, to_i32};
use super::models::{CreditGrantRow, NewCreditGrantRow, NewPaymentRecordRow, PaymentRecordRow};
use super::pool::{DbPool, PoolError};
use super::schema::{credit_grants, payment_records};

/// Diesel-backed implementation of the `PaymentRepository` port.
#[derive(Clone)]
pub struct DieselPaymentRepository {
    pool: DbPool,
}

impl DieselPaymentRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> PaymentRepositoryError {
    PaymentRepositoryError::connection(pool_error_message(error))
}

fn map_diesel_error(error: diesel::result::Error) -> PaymentRepositoryError {
    match classify_diesel_error(error) {
        DbFailure::Connection(message) => PaymentRepositoryError::connection(message),
        DbFailure::UniqueViolation(constraint) => PaymentRepositoryError::duplicate(constraint),
        DbFailure::Query(message) => PaymentRepositoryError::query(message),
    }
}

fn row_to_record(row: PaymentRecordRow) -> Result<PaymentRecord, PaymentRepositoryError> {
    row.into_domain().map_err(PaymentRepositoryError::query)
}

/// What the settlement transaction observed.
enum SettleStep {
    Settled(PaymentRecordRow, CreditGrantRow),
    Existing(PaymentRecordRow),
    Missing,
}

#[async_trait]
impl PaymentRepository for DieselPaymentRepository {
    async fn insert_pending(&self, record: &PaymentRecord) -> Result<(), PaymentRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = NewPaymentRecordRow {
            id: record.id,
            user_id: *record.user_id.as_uuid(),
            amount: i64::try_from(record.amount).map_err(|_| {
                PaymentRepositoryError::query(format!("amount out of range: {}", record.amount))
            })?,
            currency: &record.currency,
            credits_purchased: to_i32(record.credits_purchased, "credits_purchased")
                .map_err(PaymentRepositoryError::query)?,
            transaction_id: record.transaction_id.as_str(),
            gateway_order_id: &record.gateway_order_id,
            status: record.status.as_str(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        };

        diesel::insert_into(payment_records::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn find_by_order(
        &self,
        gateway_order_id: &str,
        user_id: &UserId,
    ) -> Result<Option<PaymentRecord>, PaymentRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<PaymentRecordRow> = payment_records::table
            .filter(payment_records::gateway_order_id.eq(gateway_order_id))
            .filter(payment_records::user_id.eq(user_id.as_uuid()))
            .select(PaymentRecordRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(row_to_record).transpose()
    }

    async fn settle(
        &self,
        request: SettlementRequest,
    ) -> Result<SettlementOutcome, PaymentRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let grant_row =
            NewCreditGrantRow::from_grant(&request.grant).map_err(PaymentRepositoryError::query)?;
        let record_id = request.record_id;
        let payment_id = request.gateway_payment_id.clone();
        let settled_at = request.settled_at;

        let step = conn
            .transaction::<_, diesel::result::Error, _>(|conn| {
                async move {
                    let flipped: Option<PaymentRecordRow> = diesel::update(
                        payment_records::table
                            .filter(payment_records::id.eq(record_id))
                            .filter(payment_records::status.eq(PaymentStatus::Pending.as_str())),
                    )
                    .set((
                        payment_records::status.eq(PaymentStatus::Success.as_str()),
                        payment_records::gateway_payment_id.eq(Some(payment_id)),
                        payment_records::updated_at.eq(settled_at),
                    ))
                    .returning(PaymentRecordRow::as_returning())
                    .get_result(conn)
                    .await
                    .optional()?;

                    let Some(record) = flipped else {
                        let existing: Option<PaymentRecordRow> = payment_records::table
                            .find(record_id)
                            .select(PaymentRecordRow::as_select())
                            .first(conn)
                            .await
                            .optional()?;
                        return Ok(existing.map_or(SettleStep::Missing, SettleStep::Existing));
                    };

                    let grant: CreditGrantRow = diesel::insert_into(credit_grants::table)
                        .values(&grant_row)
                        .returning(CreditGrantRow::as_returning())
                        .get_result(conn)
                        .await?;
                    Ok(SettleStep::Settled(record, grant))
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;

        match step {
            SettleStep::Settled(record, grant) => {
                debug!(record_id = %record.id, grant_id = %grant.id, "payment settled");
                Ok(SettlementOutcome::Settled {
                    record: row_to_record(record)?,
                    grant: grant.into_domain().map_err(PaymentRepositoryError::query)?,
                })
            }
            SettleStep::Existing(row) => {
                let record = row_to_record(row)?;
                match record.status {
                    PaymentStatus::Success => Ok(SettlementOutcome::AlreadySettled(record)),
                    status => Err(PaymentRepositoryError::invalid_state(status.as_str())),
                }
            }
            SettleStep::Missing => Err(PaymentRepositoryError::not_found(request.gateway_order_id)),
        }
    }

    async fn list_recent(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<PaymentRecord>, PaymentRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let rows: Vec<PaymentRecordRow> = payment_records::table
            .filter(payment_records::user_id.eq(user_id.as_uuid()))
            .order(payment_records::created_at.desc())
            .limit(i64::from(limit))
            .select(PaymentRecordRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        rows.into_iter().map(row_to_record).collect()
    }
}
