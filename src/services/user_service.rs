//! Domain service for user accounts.
//!
//! Generated passwords are never returned to the caller; they are handed to
//! the [`Notifier`](crate::services::Notifier) instead.

use serde::Deserialize;
use thiserror::Error;

use crate::db::{StoreError, User, UserRecord};
use crate::domain::{ListQuery, Page, Role};
use crate::services::auth_service::Subject;

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Current password is incorrect")]
    WrongPassword,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Failed to deliver credentials: {0}")]
    Delivery(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for UserError {
    #[track_caller]
    fn from(err: anyhow::Error) -> Self {
        let caller = std::panic::Location::caller();
        tracing::error!(
            file = caller.file(),
            line = caller.line(),
            error = %err,
            "User service internal error"
        );
        Self::Internal(err.to_string())
    }
}

/// Create/update body for a user account.
#[derive(Debug, Clone, Deserialize)]
pub struct UserInput {
    pub username: String,
    #[serde(default)]
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub employee_id: Option<i64>,
}

impl From<UserInput> for UserRecord {
    fn from(input: UserInput) -> Self {
        Self {
            username: input.username,
            email: input.email,
            role: input.role,
            employee_id: input.employee_id,
        }
    }
}

#[async_trait::async_trait]
pub trait UserService: Send + Sync {
    /// Creates the account with a generated password and delivers it.
    async fn create(&self, input: UserInput) -> Result<i64, UserError>;

    async fn get(&self, id: i64) -> Result<User, UserError>;

    async fn list(&self, query: &ListQuery) -> Result<Page<User>, UserError>;

    async fn update(&self, id: i64, input: UserInput) -> Result<(), UserError>;

    async fn delete(&self, id: i64) -> Result<(), UserError>;

    /// Changes a password. Users changing their own password must present
    /// the current one; administrators may change anyone's.
    async fn set_password(
        &self,
        actor: &Subject,
        id: i64,
        old_password: Option<&str>,
        new_password: &str,
    ) -> Result<(), UserError>;

    /// Replaces the password with a generated one and delivers it.
    async fn reset_password(&self, id: i64) -> Result<(), UserError>;

    async fn set_enabled(&self, id: i64, enabled: bool) -> Result<(), UserError>;
}
