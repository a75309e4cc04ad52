use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::db::StoreError;
use crate::db::catalog::{Catalog, required, search_key};
use crate::entities::departments::{self, Column};

impl Catalog for departments::Entity {
    const NAME: &'static str = "department";

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
            _ => None,
        }
    }
}

/// Organizational units. Employees and equipment can both be assigned here.
pub struct DepartmentRepository {
    conn: DatabaseConnection,
}

impl DepartmentRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(&self, title: &str) -> Result<i64, StoreError> {
        let title = required("title", title)?;
        let model = departments::ActiveModel {
            search_key: Set(search_key([title.as_str()])),
            title: Set(title),
            ..Default::default()
        };

        let result = departments::Entity::insert(model).exec(&self.conn).await?;
        Ok(result.last_insert_id)
    }

    pub async fn update(&self, id: i64, title: &str) -> Result<(), StoreError> {
        let title = required("title", title)?;
        let result = departments::Entity::update_many()
            .col_expr(Column::SearchKey, Expr::value(search_key([title.as_str()])))
            .col_expr(Column::Title, Expr::value(title))
            .filter(Column::Id.eq(id))
            .filter(Column::DeletedAt.is_null())
            .exec(&self.conn)
            .await?;

        if result.rows_affected == 0 {
            return Err(StoreError::not_found(departments::Entity::NAME, id));
        }
        Ok(())
    }
}
