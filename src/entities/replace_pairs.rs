use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "replace_pairs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub from_movement_id: i64,
    pub to_movement_id: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::movements::Entity",
        from = "Column::FromMovementId",
        to = "super::movements::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict",
        fk_name = "fk_replace_pairs_from"
    )]
    FromMovement,
    #[sea_orm(
        belongs_to = "super::movements::Entity",
        from = "Column::ToMovementId",
        to = "super::movements::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict",
        fk_name = "fk_replace_pairs_to"
    )]
    ToMovement,
}

impl ActiveModelBehavior for ActiveModel {}
