use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

/// Errors surfaced by the store. Driver errors are classified here, at the
/// first layer above sea-orm, and propagated unchanged by the services.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(DbErr),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl StoreError {
    #[must_use]
    pub const fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

impl From<DbErr> for StoreError {
    #[track_caller]
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => Self::AlreadyExists(detail),
            Some(SqlErr::ForeignKeyConstraintViolation(detail)) => {
                Self::InvalidInput(format!("Referenced row does not exist: {detail}"))
            }
            _ => {
                let caller = std::panic::Location::caller();
                tracing::error!(
                    file = caller.file(),
                    line = caller.line(),
                    error = %err,
                    "Database error"
                );
                Self::Database(err)
            }
        }
    }
}

impl From<anyhow::Error> for StoreError {
    #[track_caller]
    fn from(err: anyhow::Error) -> Self {
        let caller = std::panic::Location::caller();
        tracing::error!(
            file = caller.file(),
            line = caller.line(),
            error = %err,
            "Store internal error"
        );
        Self::Internal(err.to_string())
    }
}
