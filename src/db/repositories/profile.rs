use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::db::StoreError;
use crate::db::catalog::{self, Catalog, required, search_key};
use crate::entities::categories;
use crate::entities::profiles::{self, Column};

impl Catalog for profiles::Entity {
    const NAME: &'static str = "profile";

    fn id_column() -> Column {
        Column::Id
    }

    fn deleted_at_column() -> Option<Column> {
        Some(Column::DeletedAt)
    }

    fn search_key_column() -> Column {
        Column::SearchKey
    }

    fn sort_column(name: &str) -> Option<Column> {
        match name {
            "id" => Some(Column::Id),
            "title" => Some(Column::Title),
            "category_id" => Some(Column::CategoryId),
            _ => None,
        }
    }
}

/// An equipment model, grouped under a category.
pub struct ProfileRepository {
    conn: DatabaseConnection,
}

impl ProfileRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(&self, title: &str, category_id: i64) -> Result<i64, StoreError> {
        let title = required("title", title)?;
        catalog::ensure_live::<categories::Entity, _>(&self.conn, category_id).await?;

        let model = profiles::ActiveModel {
            search_key: Set(search_key([title.as_str()])),
            title: Set(title),
            category_id: Set(category_id),
            ..Default::default()
        };

        let result = profiles::Entity::insert(model).exec(&self.conn).await?;
        Ok(result.last_insert_id)
    }

    pub async fn update(&self, id: i64, title: &str, category_id: i64) -> Result<(), StoreError> {
        let title = required("title", title)?;
        catalog::ensure_live::<categories::Entity, _>(&self.conn, category_id).await?;

        let result = profiles::Entity::update_many()
            .col_expr(Column::SearchKey, Expr::value(search_key([title.as_str()])))
            .col_expr(Column::Title, Expr::value(title))
            .col_expr(Column::CategoryId, Expr::value(category_id))
            .filter(Column::Id.eq(id))
            .filter(Column::DeletedAt.is_null())
            .exec(&self.conn)
            .await?;

        if result.rows_affected == 0 {
            return Err(StoreError::not_found(profiles::Entity::NAME, id));
        }
        Ok(())
    }
}
