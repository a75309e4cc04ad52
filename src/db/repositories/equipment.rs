use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect, Set};

use crate::db::StoreError;
use crate::db::catalog::{self, Catalog, required, search_key};
use crate::entities::equipments::{self, Column};
use crate::entities::profiles;

impl Catalog for equipments::Entity {
    const NAME: &'static str = "equipment";

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
            "serial_number" => Some(Column::SerialNumber),
            "profile_id" => Some(Column::ProfileId),
            _ => None,
        }
    }
}

/// Serial numbers are compared and stored uppercased.
pub fn normalize_serial(serial_number: &str) -> Result<String, StoreError> {
    required("serial_number", serial_number).map(|s| s.to_uppercase())
}

/// Equipment rows. Borrows its connection so that it can run inside the
/// ledger transaction as well as on the pool.
pub struct EquipmentRepository<'a, C> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> EquipmentRepository<'a, C> {
    #[must_use]
    pub const fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn insert(&self, serial_number: &str, profile_id: i64) -> Result<i64, StoreError> {
        let serial_number = normalize_serial(serial_number)?;
        catalog::ensure_live::<profiles::Entity, _>(self.conn, profile_id).await?;

        let model = equipments::ActiveModel {
            search_key: Set(search_key([serial_number.as_str()])),
            serial_number: Set(serial_number),
            profile_id: Set(profile_id),
            ..Default::default()
        };

        let result = equipments::Entity::insert(model).exec(self.conn).await?;
        Ok(result.last_insert_id)
    }

    pub async fn update(
        &self,
        id: i64,
        serial_number: &str,
        profile_id: i64,
    ) -> Result<(), StoreError> {
        let serial_number = normalize_serial(serial_number)?;
        catalog::ensure_live::<profiles::Entity, _>(self.conn, profile_id).await?;

        let result = equipments::Entity::update_many()
            .col_expr(Column::SearchKey, Expr::value(search_key([serial_number.as_str()])))
            .col_expr(Column::SerialNumber, Expr::value(serial_number))
            .col_expr(Column::ProfileId, Expr::value(profile_id))
            .filter(Column::Id.eq(id))
            .filter(Column::DeletedAt.is_null())
            .exec(self.conn)
            .await?;

        if result.rows_affected == 0 {
            return Err(StoreError::not_found(equipments::Entity::NAME, id));
        }
        Ok(())
    }

    /// Reads a live equipment row and locks it for the rest of the
    /// transaction. On SQLite the lock taken by [`Store::begin_write`]
    /// already covers every row.
    ///
    /// [`Store::begin_write`]: crate::db::Store::begin_write
    pub async fn lock(&self, id: i64) -> Result<equipments::Model, StoreError> {
        let equipment = equipments::Entity::find()
            .filter(Column::Id.eq(id))
            .lock_exclusive()
            .one(self.conn)
            .await?
            .ok_or_else(|| StoreError::not_found(equipments::Entity::NAME, id))?;

        if equipment.deleted_at.is_some() {
            return Err(StoreError::invalid(format!("equipment {id} is deleted")));
        }
        Ok(equipment)
    }
}
