use anyhow::{Context, anyhow};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::Serialize;
use tokio::task;

use crate::config::SecurityConfig;
use crate::db::StoreError;
use crate::db::catalog::{self, Catalog, required, search_key};
use crate::domain::{ListQuery, Page, Role, non_zero};
use crate::entities::employees;
use crate::entities::users::{self, Column};

impl Catalog for users::Entity {
    const NAME: &'static str = "user";

    fn id_column() -> Column {
        Column::Id
    }

    fn deleted_at_column() -> Option<Column> {
        None
    }

    fn search_key_column() -> Column {
        Column::SearchKey
    }

    fn sort_column(name: &str) -> Option<Column> {
        match name {
            "id" => Some(Column::Id),
            "username" => Some(Column::Username),
            "email" => Some(Column::Email),
            "role" => Some(Column::Role),
            _ => None,
        }
    }
}

/// User data returned from repository (without sensitive password hash)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub enabled: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub employee_id: Option<i64>,
}

impl TryFrom<users::Model> for User {
    type Error = StoreError;

    fn try_from(model: users::Model) -> Result<Self, Self::Error> {
        let role = model
            .role
            .parse::<Role>()
            .map_err(|e| StoreError::Internal(format!("user {}: {e}", model.id)))?;

        Ok(Self {
            id: model.id,
            username: model.username,
            email: model.email,
            role,
            enabled: model.enabled,
            last_login_at: model.last_login_at,
            employee_id: model.employee_id,
        })
    }
}

/// Account fields written on create and update. The password travels
/// separately, already hashed.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub username: String,
    pub email: String,
    pub role: Role,
    pub employee_id: Option<i64>,
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(
        &self,
        record: &UserRecord,
        password_hash: String,
    ) -> Result<i64, StoreError> {
        let employee_id = self.checked_employee(record.employee_id).await?;

        let username = required("username", &record.username)?;
        let email = record.email.trim();

        let model = users::ActiveModel {
            search_key: Set(search_key([username.as_str(), email])),
            username: Set(username),
            password_hash: Set(password_hash),
            email: Set(email.to_string()),
            role: Set(record.role.as_str().to_string()),
            enabled: Set(true),
            last_login_at: Set(None),
            employee_id: Set(employee_id),
            ..Default::default()
        };

        let result = users::Entity::insert(model).exec(&self.conn).await?;
        Ok(result.last_insert_id)
    }

    pub async fn get(&self, id: i64) -> Result<User, StoreError> {
        catalog::get::<users::Entity, _>(&self.conn, id)
            .await
            .and_then(User::try_from)
    }

    /// Get user by username with password hash (for login)
    pub async fn find_credentials(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>, StoreError> {
        let user = users::Entity::find()
            .filter(Column::Username.eq(username))
            .one(&self.conn)
            .await?;

        user.map(|model| {
            let password_hash = model.password_hash.clone();
            User::try_from(model).map(|user| (user, password_hash))
        })
        .transpose()
    }

    pub async fn password_hash(&self, id: i64) -> Result<String, StoreError> {
        catalog::get::<users::Entity, _>(&self.conn, id)
            .await
            .map(|model| model.password_hash)
    }

    pub async fn list(&self, query: &ListQuery) -> Result<Page<User>, StoreError> {
        let page = catalog::list::<users::Entity, _>(&self.conn, query).await?;
        let items = page
            .items
            .into_iter()
            .map(User::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(items, page.total))
    }

    pub async fn update(&self, id: i64, record: &UserRecord) -> Result<(), StoreError> {
        let employee_id = self.checked_employee(record.employee_id).await?;

        let username = required("username", &record.username)?;
        let email = record.email.trim();

        let result = users::Entity::update_many()
            .col_expr(Column::SearchKey, Expr::value(search_key([username.as_str(), email])))
            .col_expr(Column::Username, Expr::value(username))
            .col_expr(Column::Email, Expr::value(email))
            .col_expr(Column::Role, Expr::value(record.role.as_str()))
            .col_expr(Column::EmployeeId, Expr::value(employee_id))
            .filter(Column::Id.eq(id))
            .exec(&self.conn)
            .await?;

        Self::affected(result.rows_affected, id)
    }

    /// Users are removed outright; there is no restore.
    pub async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let result = users::Entity::delete_many()
            .filter(Column::Id.eq(id))
            .exec(&self.conn)
            .await?;

        Self::affected(result.rows_affected, id)
    }

    pub async fn set_password_hash(
        &self,
        id: i64,
        password_hash: String,
    ) -> Result<(), StoreError> {
        let result = users::Entity::update_many()
            .col_expr(Column::PasswordHash, Expr::value(password_hash))
            .filter(Column::Id.eq(id))
            .exec(&self.conn)
            .await?;

        Self::affected(result.rows_affected, id)
    }

    pub async fn set_enabled(&self, id: i64, enabled: bool) -> Result<(), StoreError> {
        let result = users::Entity::update_many()
            .col_expr(Column::Enabled, Expr::value(enabled))
            .filter(Column::Id.eq(id))
            .exec(&self.conn)
            .await?;

        Self::affected(result.rows_affected, id)
    }

    pub async fn touch_last_login(&self, id: i64) -> Result<(), StoreError> {
        let result = users::Entity::update_many()
            .col_expr(Column::LastLoginAt, Expr::value(Utc::now()))
            .filter(Column::Id.eq(id))
            .exec(&self.conn)
            .await?;

        Self::affected(result.rows_affected, id)
    }

    async fn checked_employee(&self, employee_id: Option<i64>) -> Result<Option<i64>, StoreError> {
        let employee_id = non_zero(employee_id);
        if let Some(id) = employee_id {
            catalog::ensure_live::<employees::Entity, _>(&self.conn, id).await?;
        }
        Ok(employee_id)
    }

    fn affected(rows: u64, id: i64) -> Result<(), StoreError> {
        if rows == 0 {
            return Err(StoreError::not_found(users::Entity::NAME, id));
        }
        Ok(())
    }
}

/// Hash a password using Argon2id with the configured cost parameters.
/// Runs on the blocking pool; hashing is CPU-bound.
pub async fn hash_password(password: &str, config: &SecurityConfig) -> anyhow::Result<String> {
    let password = password.to_string();
    let config = config.clone();

    task::spawn_blocking(move || {
        let params = Params::new(
            config.argon2_memory_cost_kib,
            config.argon2_time_cost,
            config.argon2_parallelism,
            None,
        )
        .map_err(|e| anyhow!("Invalid Argon2 params: {e}"))?;

        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow!("Failed to hash password: {e}"))?;

        Ok(hash.to_string())
    })
    .await
    .context("Password hashing task panicked")?
}

/// Checks a password against a stored PHC hash. The parameters embedded in
/// the hash are used, so hashes made with other cost settings still verify.
pub async fn verify_password(password_hash: &str, password: &str) -> anyhow::Result<bool> {
    let password_hash = password_hash.to_string();
    let password = password.to_string();

    task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&password_hash)
            .map_err(|e| anyhow!("Invalid password hash format: {e}"))?;

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .context("Password verification task panicked")?
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap_params() -> SecurityConfig {
        SecurityConfig {
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            argon2_parallelism: 1,
        }
    }

    #[tokio::test]
    async fn hashed_password_verifies() {
        let hash = hash_password("s3cret", &cheap_params()).await.unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password(&hash, "s3cret").await.unwrap());
        assert!(!verify_password(&hash, "wrong").await.unwrap());
    }

    #[tokio::test]
    async fn malformed_hash_is_an_error() {
        assert!(verify_password("not-a-hash", "x").await.is_err());
    }
}
