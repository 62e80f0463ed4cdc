use sea_orm::{DbErr, SqlErr, TransactionError};

/// Classification helpers for sea-orm errors.
pub trait DbErrExt {
    /// `true` when the database rejected a write because of a unique
    /// constraint (Postgres `23505`).
    fn is_unique_violation(&self) -> bool;
}

impl DbErrExt for DbErr {
    fn is_unique_violation(&self) -> bool {
        matches!(self.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
    }
}

impl DbErrExt for TransactionError<DbErr> {
    fn is_unique_violation(&self) -> bool {
        match self {
            TransactionError::Connection(e) | TransactionError::Transaction(e) => {
                e.is_unique_violation()
            }
        }
    }
}
