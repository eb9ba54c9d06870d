//! PostgreSQL-backed `CreditLedgerRepository` implementation using Diesel ORM.
//!
//! Grants are append-only rows; the only mutation is the `used_credits`
//! increment performed by [`consume_one`]. Consumption locks the user's
//! grant rows with `SELECT ... FOR UPDATE` inside a transaction, so two
//! concurrent publish attempts serialise on the same rows and can never
//! overdraw a grant. The `CHECK (used_credits <= total_credits)` constraint
//! backs this up at the storage level.
//!
//! [`consume_one`]: CreditLedgerRepository::consume_one

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::AsyncConnection as _;
use tracing::debug;
use uuid::Uuid;

use crate::domain::ports::{CreditLedgerRepository, CreditLedgerRepositoryError};
use crate::domain::{CreditGrant, NewCreditGrant, UserId};

use super::diesel_error_mapping::{DbFailure, classify_diesel_error, pool_error_message};
use super::models::{CreditGrantRow, NewCreditGrantRow};
use super::pool::{DbPool, PoolError};
use super::schema::{credit_grants, user_roles};

const ADMIN_ROLE: &str = "admin";

/// Diesel-backed implementation of the `CreditLedgerRepository` port.
#[derive(Clone)]
pub struct DieselCreditLedgerRepository {
    pool: DbPool,
}

impl DieselCreditLedgerRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> CreditLedgerRepositoryError {
    CreditLedgerRepositoryError::connection(pool_error_message(error))
}

fn map_diesel_error(error: diesel::result::Error) -> CreditLedgerRepositoryError {
    match classify_diesel_error(error) {
        DbFailure::Connection(message) => CreditLedgerRepositoryError::connection(message),
        DbFailure::UniqueViolation(constraint) => {
            CreditLedgerRepositoryError::query(format!("unique constraint violated: {constraint}"))
        }
        DbFailure::Query(message) => CreditLedgerRepositoryError::query(message),
    }
}

fn row_to_grant(row: CreditGrantRow) -> Result<CreditGrant, CreditLedgerRepositoryError> {
    row.into_domain().map_err(CreditLedgerRepositoryError::query)
}

fn new_grant_row(
    grant: &NewCreditGrant,
) -> Result<NewCreditGrantRow<'static>, CreditLedgerRepositoryError> {
    NewCreditGrantRow::from_grant(grant).map_err(CreditLedgerRepositoryError::query)
}

#[async_trait]
impl CreditLedgerRepository for DieselCreditLedgerRepository {
    async fn list_grants(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<CreditGrant>, CreditLedgerRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let rows: Vec<CreditGrantRow> = credit_grants::table
            .filter(credit_grants::user_id.eq(user_id.as_uuid()))
            .order((credit_grants::created_at.asc(), credit_grants::id.asc()))
            .select(CreditGrantRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        rows.into_iter().map(row_to_grant).collect()
    }

    async fn insert_grant(
        &self,
        grant: NewCreditGrant,
    ) -> Result<CreditGrant, CreditLedgerRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = new_grant_row(&grant)?;

        let stored: CreditGrantRow = diesel::insert_into(credit_grants::table)
            .values(&row)
            .returning(CreditGrantRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        row_to_grant(stored)
    }

    async fn insert_free_grant_once(
        &self,
        grant: NewCreditGrant,
    ) -> Result<Option<CreditGrant>, CreditLedgerRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = new_grant_row(&grant)?;

        // The partial unique index on free grants turns a repeat into a no-op.
        let stored: Option<CreditGrantRow> = diesel::insert_into(credit_grants::table)
            .values(&row)
            .on_conflict_do_nothing()
            .returning(CreditGrantRow::as_returning())
            .get_result(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        stored.map(row_to_grant).transpose()
    }

    async fn consume_one(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Uuid>, CreditLedgerRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let owner = *user_id.as_uuid();

        let charged = conn
            .transaction::<_, diesel::result::Error, _>(|conn| {
                async move {
                    let grants: Vec<(Uuid, i32, i32)> = credit_grants::table
                        .filter(credit_grants::user_id.eq(owner))
                        .order((credit_grants::created_at.asc(), credit_grants::id.asc()))
                        .select((
                            credit_grants::id,
                            credit_grants::total_credits,
                            credit_grants::used_credits,
                        ))
                        .for_update()
                        .load(conn)
                        .await?;

                    let Some((grant_id, _, _)) =
                        grants.into_iter().find(|(_, total, used)| used < total)
                    else {
                        return Ok(None);
                    };

                    diesel::update(credit_grants::table.find(grant_id))
                        .set(credit_grants::used_credits.eq(credit_grants::used_credits + 1))
                        .execute(conn)
                        .await?;
                    Ok(Some(grant_id))
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;

        debug!(user_id = %user_id, ?charged, "credit consumption attempted");
        Ok(charged)
    }

    async fn is_admin(&self, user_id: &UserId) -> Result<bool, CreditLedgerRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        diesel::select(diesel::dsl::exists(
            user_roles::table
                .filter(user_roles::user_id.eq(user_id.as_uuid()))
                .filter(user_roles::role.eq(ADMIN_ROLE)),
        ))
        .get_result::<bool>(&mut conn)
        .await
        .map_err(map_diesel_error)
    }
}
