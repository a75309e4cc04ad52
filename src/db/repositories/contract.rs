use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::db::StoreError;
use crate::db::catalog::{Catalog, required, search_key};
use crate::entities::contracts::{self, Column};

impl Catalog for contracts::Entity {
    const NAME: &'static str = "contract";

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
            "number" => Some(Column::Number),
            "address" => Some(Column::Address),
            _ => None,
        }
    }
}

pub struct ContractRepository {
    conn: DatabaseConnection,
}

impl ContractRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(&self, number: &str, address: &str) -> Result<i64, StoreError> {
        let number = required("number", number)?;
        let address = address.trim();
        let model = contracts::ActiveModel {
            search_key: Set(search_key([number.as_str(), address])),
            number: Set(number),
            address: Set(address.to_string()),
            ..Default::default()
        };

        let result = contracts::Entity::insert(model).exec(&self.conn).await?;
        Ok(result.last_insert_id)
    }

    pub async fn update(&self, id: i64, number: &str, address: &str) -> Result<(), StoreError> {
        let number = required("number", number)?;
        let address = address.trim();
        let result = contracts::Entity::update_many()
            .col_expr(Column::SearchKey, Expr::value(search_key([number.as_str(), address])))
            .col_expr(Column::Number, Expr::value(number))
            .col_expr(Column::Address, Expr::value(address))
            .filter(Column::Id.eq(id))
            .filter(Column::DeletedAt.is_null())
            .exec(&self.conn)
            .await?;

        if result.rows_affected == 0 {
            return Err(StoreError::not_found(contracts::Entity::NAME, id));
        }
        Ok(())
    }
}
