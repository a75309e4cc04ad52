//! Identity: password login, opaque credentials and role checks.

use std::time::Duration;

use thiserror::Error;

use crate::db::{StoreError, User};
use crate::domain::Role;

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: requires one of {0}")]
    Forbidden(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for AuthError {
    #[track_caller]
    fn from(err: anyhow::Error) -> Self {
        let caller = std::panic::Location::caller();
        tracing::error!(
            file = caller.file(),
            line = caller.line(),
            error = %err,
            "Auth internal error"
        );
        Self::Internal(err.to_string())
    }
}

/// The authenticated caller of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
    pub employee_id: Option<i64>,
}

impl From<&User> for Subject {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            role: user.role,
            employee_id: user.employee_id,
        }
    }
}

/// A short-lived access credential and the long-lived credential that
/// renews it.
#[derive(Debug, Clone)]
pub struct IssuedCredentials {
    pub access: String,
    pub refresh: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: User,
    pub credentials: IssuedCredentials,
}

/// Result of checking the credentials presented with a request. `renewed`
/// is set when the access credential was missing or expired and the refresh
/// credential was exchanged for a new pair.
#[derive(Debug, Clone)]
pub struct Validated {
    pub subject: Subject,
    pub renewed: Option<IssuedCredentials>,
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verifies a password and issues a credential pair.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] for unknown users, wrong
    /// passwords and disabled accounts alike.
    async fn authenticate(&self, username: &str, password: &str)
    -> Result<LoginOutcome, AuthError>;

    /// Resolves the caller from an access credential, falling back to the
    /// refresh credential.
    async fn validate(
        &self,
        access: Option<&str>,
        refresh: Option<&str>,
    ) -> Result<Validated, AuthError>;

    /// Invalidates a credential together with its sibling.
    async fn revoke(&self, credential: &str);
}

/// Fails with [`AuthError::Forbidden`] unless the subject holds one of `roles`.
pub fn require_role(subject: &Subject, roles: &[Role]) -> Result<(), AuthError> {
    if roles.contains(&subject.role) {
        return Ok(());
    }

    let expected = roles
        .iter()
        .map(Role::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    Err(AuthError::Forbidden(expected))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject(role: Role) -> Subject {
        Subject {
            user_id: 1,
            username: "u".to_string(),
            role,
            employee_id: None,
        }
    }

    #[test]
    fn role_check() {
        assert!(require_role(&subject(Role::Admin), &[Role::Admin]).is_ok());
        assert!(require_role(&subject(Role::Governing), &[Role::Admin, Role::Governing]).is_ok());

        let err = require_role(&subject(Role::Employee), &[Role::Admin]).unwrap_err();
        assert!(matches!(err, AuthError::Forbidden(ref roles) if roles == "admin"));
    }
}
