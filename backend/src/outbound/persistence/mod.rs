//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Concrete implementations of the credit ledger, payment and post
//! repository ports, backed by PostgreSQL through `diesel-async` and `bb8`
//! connection pooling.
//!
//! - **Thin adapters**: repositories only translate between Diesel rows and
//!   domain types. Atomicity lives in SQL (row locks, conditional updates,
//!   unique indexes), not in application code.
//! - **Internal models**: row structs (`models.rs`) and table definitions
//!   (`schema.rs`) never leave this module.
//! - **Strongly typed errors**: Diesel errors are classified once and then
//!   mapped onto each port's error enum.
//!
//! # Example
//!
//! ```no_run
//! use voicepost_backend::outbound::persistence::{
//!     DbPool, DieselCreditLedgerRepository, PoolConfig, run_migrations,
//! };
//!
//! # async fn wire() -> Result<(), voicepost_backend::outbound::persistence::PoolError> {
//! let url = "postgres://localhost/voicepost";
//! run_migrations(url).await?;
//! let pool = DbPool::new(PoolConfig::new(url)).await?;
//! let ledger = DieselCreditLedgerRepository::new(pool);
//! # let _ = ledger;
//! # Ok(())
//! # }
//! ```

mod diesel_credit_ledger_repository;
mod diesel_error_mapping;
mod diesel_payment_repository;
mod diesel_post_repository;
mod models;
mod pool;
mod schema;

pub use diesel_credit_ledger_repository::DieselCreditLedgerRepository;
pub use diesel_payment_repository::DieselPaymentRepository;
pub use diesel_post_repository::DieselPostRepository;
pub use pool::{DbPool, PoolConfig, PoolError, run_migrations};
