use sea_orm::entity::prelude::*;

/// Materialized "latest movement" per equipment. Written in the same
/// transaction as every movement append or delete.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "current_locations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub equipment_id: i64,
    pub movement_id: i64,
    pub to_department_id: Option<i64>,
    pub to_employee_id: Option<i64>,
    pub to_contract_id: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::equipments::Entity",
        from = "Column::EquipmentId",
        to = "super::equipments::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict",
        fk_name = "fk_current_locations_equipment"
    )]
    Equipments,
    #[sea_orm(
        belongs_to = "super::movements::Entity",
        from = "Column::MovementId",
        to = "super::movements::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict",
        fk_name = "fk_current_locations_movement"
    )]
    Movements,
}

impl Related<super::equipments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Equipments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
