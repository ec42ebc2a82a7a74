//! Shared persistence plumbing: the error every repository returns and the
//! in-memory backend used by tests.

#[cfg(test)]
pub mod memory;

use thiserror::Error;

use crate::rentals::domain::RentalError;

/// Postgres SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Rental(#[from] RentalError),

    #[error("A user with this email already exists.")]
    EmailTaken,

    #[error("Invalid pk \"{0}\" - object does not exist.")]
    UnknownBicycle(i64),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error(transparent)]
    Db(#[from] sqlx::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub(crate) fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .and_then(|d| d.code())
        .is_some_and(|code| code == UNIQUE_VIOLATION)
}

/// Clamps caller-supplied paging to sane bounds.
pub fn page(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    let limit = limit.unwrap_or(20).clamp(1, 100);
    let offset = offset.unwrap_or(0).max(0);
    (limit, offset)
}
