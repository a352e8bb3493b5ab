//! Shared repository utilities.

use sqlx::{Postgres, QueryBuilder};

use crate::error::AppError;

/// Appends WHERE or AND to the query builder depending on whether a clause has already been added.
pub fn push_clause(builder: &mut QueryBuilder<'_, Postgres>, has_clause: &mut bool) {
    if *has_clause {
        builder.push(" AND ");
    } else {
        builder.push(" WHERE ");
        *has_clause = true;
    }
}

/// Maps a unique-constraint violation to `Conflict`, anything else through `From`.
pub fn conflict_on_unique(err: sqlx::Error, message: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::Conflict(message.to_string())
        }
        _ => err.into(),
    }
}

/// Maps a foreign-key violation to `Conflict`, anything else through `From`.
pub fn conflict_on_foreign_key(err: sqlx::Error, message: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
            AppError::Conflict(message.to_string())
        }
        _ => err.into(),
    }
}
