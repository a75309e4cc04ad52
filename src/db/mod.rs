use anyhow::{Context, Result};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection,
    DatabaseTransaction, DbBackend, EntityTrait, QueryFilter, Statement, TransactionTrait,
};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::domain::{ListQuery, Page};
use crate::entities::equipments;

pub mod catalog;
pub mod error;
pub mod migrator;
pub mod repositories;

pub use catalog::Catalog;
pub use error::StoreError;
pub use repositories::employee::EmployeeInput;
pub use repositories::location::{NewMovement, PlaceIds};
pub use repositories::user::{User, UserRecord};
pub use repositories::view::{EquipmentView, MovementView};

use repositories::{
    category::CategoryRepository, company::CompanyRepository, contract::ContractRepository,
    department::DepartmentRepository, employee::EmployeeRepository,
    equipment::EquipmentRepository, location::LocationRepository, profile::ProfileRepository,
    user::UserRepository,
};

/// Returns the filesystem path of a file-backed SQLite URL.
fn sqlite_file(db_url: &str) -> Option<&str> {
    let rest = db_url
        .strip_prefix("sqlite://")
        .or_else(|| db_url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or(rest);

    if path.is_empty() || path.contains(":memory:") || db_url.contains("mode=memory") {
        None
    } else {
        Some(path)
    }
}

/// How long a SQLite writer waits for the write lock before failing.
const SQLITE_BUSY_TIMEOUT: Duration = Duration::from_secs(15);

fn is_in_memory(db_url: &str) -> bool {
    db_url.contains(":memory:") || db_url.contains("mode=memory")
}

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    /// Connects, applies pending migrations and verifies the connection.
    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if let Some(path) = sqlite_file(db_url) {
            if let Some(parent) = Path::new(path).parent()
                && !parent.as_os_str().is_empty()
            {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            if !Path::new(path).exists() {
                std::fs::File::create(path)
                    .with_context(|| format!("Failed to create database file {path}"))?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .sqlx_logging(false)
            .map_sqlx_sqlite_opts(|opts| opts.busy_timeout(SQLITE_BUSY_TIMEOUT));

        // Every connection to an in-memory database sees its own empty
        // database, so the pool must hold exactly one and never recycle it.
        let (max_connections, min_connections) = if is_in_memory(db_url) {
            (1, 1)
        } else {
            opt.idle_timeout(Duration::from_secs(300))
                .max_lifetime(Duration::from_secs(600));
            (max_connections, min_connections.min(max_connections))
        };
        opt.max_connections(max_connections)
            .min_connections(min_connections);

        let conn = Database::connect(opt)
            .await
            .context("Failed to connect to database")?;

        migrator::Migrator::up(&conn, None)
            .await
            .context("Failed to apply migrations")?;

        let store = Self { conn };
        store.ping().await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(store)
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    pub async fn close(self) -> Result<()> {
        self.conn.close().await?;
        info!("Database pool closed");
        Ok(())
    }

    /// Begins a transaction that holds the write lock before it reads.
    ///
    /// SQLite opens transactions deferred and has no row locks, so two
    /// writers that both read first cannot both commit. A no-op write claims
    /// the lock up front and later writers queue on the busy timeout.
    pub async fn begin_write(&self) -> Result<DatabaseTransaction, StoreError> {
        let txn = self.conn.begin().await?;

        if txn.get_database_backend() == DbBackend::Sqlite {
            equipments::Entity::update_many()
                .col_expr(equipments::Column::Id, Expr::col(equipments::Column::Id).into())
                .filter(equipments::Column::Id.eq(0))
                .exec(&txn)
                .await?;
        }

        Ok(txn)
    }

    #[must_use]
    pub fn category_repo(&self) -> CategoryRepository {
        CategoryRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn profile_repo(&self) -> ProfileRepository {
        ProfileRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn company_repo(&self) -> CompanyRepository {
        CompanyRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn contract_repo(&self) -> ContractRepository {
        ContractRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn department_repo(&self) -> DepartmentRepository {
        DepartmentRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn employee_repo(&self) -> EmployeeRepository {
        EmployeeRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn user_repo(&self) -> UserRepository {
        UserRepository::new(self.conn.clone())
    }

    #[must_use]
    pub const fn equipment_repo(&self) -> EquipmentRepository<'_, DatabaseConnection> {
        EquipmentRepository::new(&self.conn)
    }

    #[must_use]
    pub const fn location_repo(&self) -> LocationRepository<'_, DatabaseConnection> {
        LocationRepository::new(&self.conn)
    }

    pub async fn get<E>(&self, id: i64) -> Result<E::Model, StoreError>
    where
        E: Catalog,
    {
        catalog::get::<E, _>(&self.conn, id).await
    }

    pub async fn list<E>(&self, query: &ListQuery) -> Result<Page<E::Model>, StoreError>
    where
        E: Catalog,
        E::Model: Sync,
    {
        catalog::list::<E, _>(&self.conn, query).await
    }

    pub async fn soft_delete<E>(&self, id: i64) -> Result<(), StoreError>
    where
        E: Catalog,
    {
        catalog::soft_delete::<E, _>(&self.conn, id).await
    }

    pub async fn restore<E>(&self, id: i64) -> Result<(), StoreError>
    where
        E: Catalog,
    {
        catalog::restore::<E, _>(&self.conn, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_file_paths() {
        assert_eq!(sqlite_file("sqlite:data/depot.db"), Some("data/depot.db"));
        assert_eq!(
            sqlite_file("sqlite:///tmp/depot.db?mode=rwc"),
            Some("/tmp/depot.db")
        );
        assert_eq!(sqlite_file("sqlite::memory:"), None);
        assert_eq!(sqlite_file("postgres://localhost/depot"), None);
    }

    #[test]
    fn memory_urls_are_detected() {
        assert!(is_in_memory("sqlite::memory:"));
        assert!(is_in_memory("sqlite://file:depot?mode=memory&cache=shared"));
        assert!(!is_in_memory("sqlite:depot.db"));
    }
}
