//! Shared Diesel error classification for the repositories.
//!
//! Each repository maps the classified failure onto its own port error so
//! the domain never sees Diesel types.

use tracing::debug;

use super::pool::PoolError;

/// Coarse classification of a failed database operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DbFailure {
    /// The connection dropped or could not be used.
    Connection(String),
    /// A unique constraint rejected the write. Carries the constraint name
    /// when the driver reports one.
    UniqueViolation(String),
    /// Any other query failure.
    Query(String),
}

/// Extract a readable message from a pool error.
pub(crate) fn pool_error_message(error: PoolError) -> String {
    match error {
        PoolError::Checkout { message }
        | PoolError::Build { message }
        | PoolError::Migration { message } => message,
    }
}

/// Classify a Diesel error, logging the driver detail at debug level.
pub(crate) fn classify_diesel_error(error: diesel::result::Error) -> DbFailure {
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(&error),
            "diesel operation failed"
        ),
    }

    match error {
        DieselError::NotFound => DbFailure::Query("record not found".to_owned()),
        DieselError::QueryBuilderError(_) => DbFailure::Query("database query error".to_owned()),
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            DbFailure::UniqueViolation(info.constraint_name().unwrap_or("unique").to_owned())
        }
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            DbFailure::Connection("database connection error".to_owned())
        }
        _ => DbFailure::Query("database error".to_owned()),
    }
}

/// Convert a domain counter into its `INTEGER` column form.
pub(crate) fn to_i32(value: u32, column: &str) -> Result<i32, String> {
    i32::try_from(value).map_err(|_| format!("{column} out of range: {value}"))
}

/// Convert an `INTEGER` column into a domain counter.
pub(crate) fn from_i32(value: i32, column: &str) -> Result<u32, String> {
    u32::try_from(value).map_err(|_| format!("negative {column} in database: {value}"))
}
