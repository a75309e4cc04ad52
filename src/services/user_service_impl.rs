//! `SeaORM` implementation of the `UserService` trait.

use std::sync::Arc;

use async_trait::async_trait;
use rand::Rng;
use rand::distr::Alphanumeric;
use tracing::info;

use crate::config::SecurityConfig;
use crate::db::repositories::user::{hash_password, verify_password};
use crate::db::{Store, User};
use crate::domain::{ListQuery, Page, Role, non_zero};
use crate::entities::employees;
use crate::services::auth_service::Subject;
use crate::services::notifier::Notifier;
use crate::services::user_service::{MIN_PASSWORD_LEN, UserError, UserInput, UserService};

const GENERATED_PASSWORD_LEN: usize = 12;

pub struct SeaOrmUserService {
    store: Store,
    security: SecurityConfig,
    notifier: Arc<dyn Notifier>,
}

impl SeaOrmUserService {
    #[must_use]
    pub fn new(store: Store, security: SecurityConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            security,
            notifier,
        }
    }

    fn ensure_deliverable(email: &str) -> Result<(), UserError> {
        if email.trim().is_empty() {
            return Err(UserError::Validation(
                "An email address is required to deliver credentials".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_password(password: &str) -> Result<(), UserError> {
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(UserError::Validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        Ok(())
    }

    /// Name used to greet the account holder: the linked employee's full
    /// name, or the username.
    async fn recipient_name(&self, user: &User) -> Result<String, UserError> {
        let Some(employee_id) = non_zero(user.employee_id) else {
            return Ok(user.username.clone());
        };

        let employee = self.store.get::<employees::Entity>(employee_id).await?;
        Ok(employee.full_name())
    }

    async fn deliver(&self, user: &User, password: &str) -> Result<(), UserError> {
        let recipient = self.recipient_name(user).await?;
        self.notifier
            .send_credentials(&recipient, &user.email, &user.username, password)
            .await
            .map_err(|e| UserError::Delivery(e.to_string()))
    }
}

#[async_trait]
impl UserService for SeaOrmUserService {
    async fn create(&self, input: UserInput) -> Result<i64, UserError> {
        Self::ensure_deliverable(&input.email)?;

        let password = generate_password();
        let password_hash = hash_password(&password, &self.security).await?;

        let id = self
            .store
            .user_repo()
            .create(&input.into(), password_hash)
            .await?;

        let user = self.store.user_repo().get(id).await?;
        if let Err(e) = self.deliver(&user, &password).await {
            self.store.user_repo().delete(id).await?;
            return Err(e);
        }

        info!(user_id = id, username = %user.username, "User created");
        Ok(id)
    }

    async fn get(&self, id: i64) -> Result<User, UserError> {
        Ok(self.store.user_repo().get(id).await?)
    }

    async fn list(&self, query: &ListQuery) -> Result<Page<User>, UserError> {
        Ok(self.store.user_repo().list(query).await?)
    }

    async fn update(&self, id: i64, input: UserInput) -> Result<(), UserError> {
        self.store.user_repo().update(id, &input.into()).await?;
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<(), UserError> {
        self.store.user_repo().delete(id).await?;
        info!(user_id = id, "User deleted");
        Ok(())
    }

    async fn set_password(
        &self,
        actor: &Subject,
        id: i64,
        old_password: Option<&str>,
        new_password: &str,
    ) -> Result<(), UserError> {
        let is_self = actor.user_id == id;
        if !is_self && actor.role != Role::Admin {
            return Err(UserError::Forbidden(
                "Only administrators may change another user's password".to_string(),
            ));
        }

        Self::validate_password(new_password)?;

        if is_self {
            let old_password = old_password.unwrap_or_default();
            let current_hash = self.store.user_repo().password_hash(id).await?;
            if !verify_password(&current_hash, old_password).await? {
                return Err(UserError::WrongPassword);
            }
            if old_password == new_password {
                return Err(UserError::Validation(
                    "New password must be different from current password".to_string(),
                ));
            }
        }

        let password_hash = hash_password(new_password, &self.security).await?;
        self.store
            .user_repo()
            .set_password_hash(id, password_hash)
            .await?;

        info!(user_id = id, actor = actor.user_id, "Password changed");
        Ok(())
    }

    async fn reset_password(&self, id: i64) -> Result<(), UserError> {
        let user = self.store.user_repo().get(id).await?;
        Self::ensure_deliverable(&user.email)?;

        let password = generate_password();
        let password_hash = hash_password(&password, &self.security).await?;
        self.store
            .user_repo()
            .set_password_hash(id, password_hash)
            .await?;

        self.deliver(&user, &password).await?;

        info!(user_id = id, "Password reset");
        Ok(())
    }

    async fn set_enabled(&self, id: i64, enabled: bool) -> Result<(), UserError> {
        self.store.user_repo().set_enabled(id, enabled).await?;
        info!(user_id = id, enabled, "User access changed");
        Ok(())
    }
}

fn generate_password() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_PASSWORD_LEN)
        .map(char::from)
        .collect()
}
