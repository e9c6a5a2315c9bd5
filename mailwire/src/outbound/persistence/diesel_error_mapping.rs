//! Diesel and pool error mapping for the mail directory adapter.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use super::pool::PoolError;
use crate::domain::ports::MailDirectoryError;

/// Map pool failures to connection errors; the store is unreachable.
pub(super) fn map_pool_error(error: PoolError) -> MailDirectoryError {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => {
            MailDirectoryError::connection(message)
        }
    }
}

/// Map Diesel errors for `operation` into directory errors.
///
/// Unique-key violations become `Duplicate`. Lost connections become
/// `Connection`, as do database files that are locked, unopenable,
/// read-only or missing their tables.
pub(super) fn map_diesel_error(error: DieselError, operation: &'static str) -> MailDirectoryError {
    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(operation, ?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(operation, error = %error, "diesel operation failed"),
    }

    match error {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            MailDirectoryError::duplicate(format!("{operation}: {}", info.message()))
        }
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            MailDirectoryError::connection(format!("{operation}: database connection error"))
        }
        DieselError::DatabaseError(_, info) if is_unavailable_message(info.message()) => {
            MailDirectoryError::connection(format!("{operation}: {}", info.message()))
        }
        DieselError::DatabaseError(_, info) => {
            MailDirectoryError::query(format!("{operation}: {}", info.message()))
        }
        DieselError::NotFound => MailDirectoryError::query(format!("{operation}: record not found")),
        other => MailDirectoryError::query(format!("{operation}: {other}")),
    }
}

/// SQLite reports lock contention, I/O trouble and an uninitialized file
/// as plain messages.
fn is_unavailable_message(message: &str) -> bool {
    const NEEDLES: [&str; 5] = [
        "database is locked",
        "unable to open database",
        "disk i/o error",
        "readonly database",
        "no such table",
    ];
    let lower = message.to_lowercase();
    NEEDLES.iter().any(|needle| lower.contains(needle))
}
