use sea_orm::entity::prelude::*;
use serde::Serialize;

/// One append-only record of an equipment item leaving a place and arriving
/// at another. The `from_*` triple always equals the `to_*` triple of the
/// previous movement of the same equipment.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "movements")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub occurred_at: DateTimeUtc,
    pub code: String,
    pub equipment_id: i64,
    pub actor_employee_id: Option<i64>,
    pub company_id: i64,
    pub from_department_id: Option<i64>,
    pub from_employee_id: Option<i64>,
    pub from_contract_id: Option<i64>,
    pub to_department_id: Option<i64>,
    pub to_employee_id: Option<i64>,
    pub to_contract_id: Option<i64>,
    pub transfer_type: Option<String>,
    pub price: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::equipments::Entity",
        from = "Column::EquipmentId",
        to = "super::equipments::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict",
        fk_name = "fk_movements_equipment"
    )]
    Equipments,
    #[sea_orm(
        belongs_to = "super::companies::Entity",
        from = "Column::CompanyId",
        to = "super::companies::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict",
        fk_name = "fk_movements_company"
    )]
    Companies,
    #[sea_orm(
        belongs_to = "super::employees::Entity",
        from = "Column::ActorEmployeeId",
        to = "super::employees::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict",
        fk_name = "fk_movements_actor"
    )]
    Actor,
    #[sea_orm(
        belongs_to = "super::departments::Entity",
        from = "Column::FromDepartmentId",
        to = "super::departments::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict",
        fk_name = "fk_movements_from_department"
    )]
    FromDepartment,
    #[sea_orm(
        belongs_to = "super::employees::Entity",
        from = "Column::FromEmployeeId",
        to = "super::employees::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict",
        fk_name = "fk_movements_from_employee"
    )]
    FromEmployee,
    #[sea_orm(
        belongs_to = "super::contracts::Entity",
        from = "Column::FromContractId",
        to = "super::contracts::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict",
        fk_name = "fk_movements_from_contract"
    )]
    FromContract,
    #[sea_orm(
        belongs_to = "super::departments::Entity",
        from = "Column::ToDepartmentId",
        to = "super::departments::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict",
        fk_name = "fk_movements_to_department"
    )]
    ToDepartment,
    #[sea_orm(
        belongs_to = "super::employees::Entity",
        from = "Column::ToEmployeeId",
        to = "super::employees::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict",
        fk_name = "fk_movements_to_employee"
    )]
    ToEmployee,
    #[sea_orm(
        belongs_to = "super::contracts::Entity",
        from = "Column::ToContractId",
        to = "super::contracts::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict",
        fk_name = "fk_movements_to_contract"
    )]
    ToContract,
}

impl Related<super::equipments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Equipments.def()
    }
}

impl Related<super::companies::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Companies.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
