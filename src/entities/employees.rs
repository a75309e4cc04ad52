use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "employees")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub last_name: String,
    pub first_name: String,
    pub middle_name: Option<String>,

    /// Unique among live rows.
    pub phone: String,

    pub department_id: Option<i64>,
    #[serde(skip)]
    pub search_key: String,

    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::departments::Entity",
        from = "Column::DepartmentId",
        to = "super::departments::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict",
        fk_name = "fk_employees_department"
    )]
    Departments,
}

impl Related<super::departments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Departments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// "Last First Middle", the label used in enriched views and notifications.
    #[must_use]
    pub fn full_name(&self) -> String {
        match &self.middle_name {
            Some(middle) if !middle.is_empty() => {
                format!("{} {} {}", self.last_name, self.first_name, middle)
            }
            _ => format!("{} {}", self.last_name, self.first_name),
        }
    }
}
