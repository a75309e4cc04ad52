use crate::entities::prelude::*;
use crate::db::catalog::search_key;
use crate::entities::users;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

const DEFAULT_ADMIN_USERNAME: &str = "admin";
const DEFAULT_ADMIN_PASSWORD: &str = "password";
const DEFAULT_ADMIN_EMAIL: &str = "admin@localhost";

fn hash_default_password() -> Result<String, DbErr> {
    use argon2::{
        Argon2,
        password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
    };

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(DEFAULT_ADMIN_PASSWORD.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| DbErr::Custom(format!("Failed to hash default password: {e}")))
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let insert = Query::insert()
            .into_table(Users)
            .columns([
                users::Column::Username,
                users::Column::PasswordHash,
                users::Column::Email,
                users::Column::Role,
                users::Column::Enabled,
                users::Column::SearchKey,
            ])
            .values_panic([
                DEFAULT_ADMIN_USERNAME.into(),
                hash_default_password()?.into(),
                DEFAULT_ADMIN_EMAIL.into(),
                crate::domain::Role::Admin.as_str().into(),
                true.into(),
                search_key([DEFAULT_ADMIN_USERNAME, DEFAULT_ADMIN_EMAIL]).into(),
            ])
            .on_conflict(
                OnConflict::column(users::Column::Username)
                    .do_nothing()
                    .to_owned(),
            )
            .to_owned();

        manager.exec_stmt(insert).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let delete = Query::delete()
            .from_table(Users)
            .and_where(Expr::col(users::Column::Username).eq(DEFAULT_ADMIN_USERNAME))
            .to_owned();

        manager.exec_stmt(delete).await?;

        Ok(())
    }
}
