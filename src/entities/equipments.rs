use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "equipments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Always stored uppercased; unique among live rows.
    pub serial_number: String,

    pub profile_id: i64,
    #[serde(skip)]
    pub search_key: String,

    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::profiles::Entity",
        from = "Column::ProfileId",
        to = "super::profiles::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict",
        fk_name = "fk_equipments_profile"
    )]
    Profiles,
    #[sea_orm(has_many = "super::movements::Entity")]
    Movements,
    #[sea_orm(has_one = "super::current_locations::Entity")]
    CurrentLocations,
}

impl Related<super::profiles::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Profiles.def()
    }
}

impl Related<super::movements::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Movements.def()
    }
}

impl Related<super::current_locations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CurrentLocations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
