use sea_orm::{ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter, Set};

use crate::db::StoreError;
use crate::entities::replace_pairs::{self, Column};

/// Links the two movements of a replace operation.
pub struct ReplacePairRepository<'a, C> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> ReplacePairRepository<'a, C> {
    #[must_use]
    pub const fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn insert(
        &self,
        from_movement_id: i64,
        to_movement_id: i64,
    ) -> Result<i64, StoreError> {
        let model = replace_pairs::ActiveModel {
            from_movement_id: Set(from_movement_id),
            to_movement_id: Set(to_movement_id),
            ..Default::default()
        };

        let result = replace_pairs::Entity::insert(model).exec(self.conn).await?;
        Ok(result.last_insert_id)
    }

    /// Finds the pair referencing `movement_id` on either side.
    pub async fn find_by_movement(
        &self,
        movement_id: i64,
    ) -> Result<Option<replace_pairs::Model>, StoreError> {
        let pair = replace_pairs::Entity::find()
            .filter(
                Condition::any()
                    .add(Column::FromMovementId.eq(movement_id))
                    .add(Column::ToMovementId.eq(movement_id)),
            )
            .one(self.conn)
            .await?;

        Ok(pair)
    }

    pub async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let result = replace_pairs::Entity::delete_many()
            .filter(Column::Id.eq(id))
            .exec(self.conn)
            .await?;

        if result.rows_affected == 0 {
            return Err(StoreError::not_found("replace pair", id));
        }
        Ok(())
    }
}
