use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::Deserialize;

use crate::db::StoreError;
use crate::db::catalog::{self, Catalog, required, search_key};
use crate::domain::non_zero;
use crate::entities::departments;
use crate::entities::employees::{self, Column};

impl Catalog for employees::Entity {
    const NAME: &'static str = "employee";

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
            "last_name" => Some(Column::LastName),
            "first_name" => Some(Column::FirstName),
            "middle_name" => Some(Column::MiddleName),
            "phone" => Some(Column::Phone),
            "department_id" => Some(Column::DepartmentId),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmployeeInput {
    pub last_name: String,
    pub first_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    pub phone: String,
    #[serde(default)]
    pub department_id: Option<i64>,
}

struct ValidEmployee {
    last_name: String,
    first_name: String,
    middle_name: Option<String>,
    phone: String,
    department_id: Option<i64>,
}

impl ValidEmployee {
    fn search_key(&self) -> String {
        search_key([
            self.last_name.as_str(),
            self.first_name.as_str(),
            self.middle_name.as_deref().unwrap_or_default(),
            self.phone.as_str(),
        ])
    }
}

pub struct EmployeeRepository {
    conn: DatabaseConnection,
}

impl EmployeeRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(&self, input: &EmployeeInput) -> Result<i64, StoreError> {
        let valid = self.validate(input).await?;

        let model = employees::ActiveModel {
            search_key: Set(valid.search_key()),
            last_name: Set(valid.last_name),
            first_name: Set(valid.first_name),
            middle_name: Set(valid.middle_name),
            phone: Set(valid.phone),
            department_id: Set(valid.department_id),
            ..Default::default()
        };

        let result = employees::Entity::insert(model).exec(&self.conn).await?;
        Ok(result.last_insert_id)
    }

    pub async fn update(&self, id: i64, input: &EmployeeInput) -> Result<(), StoreError> {
        let valid = self.validate(input).await?;

        let result = employees::Entity::update_many()
            .col_expr(Column::SearchKey, Expr::value(valid.search_key()))
            .col_expr(Column::LastName, Expr::value(valid.last_name))
            .col_expr(Column::FirstName, Expr::value(valid.first_name))
            .col_expr(Column::MiddleName, Expr::value(valid.middle_name))
            .col_expr(Column::Phone, Expr::value(valid.phone))
            .col_expr(Column::DepartmentId, Expr::value(valid.department_id))
            .filter(Column::Id.eq(id))
            .filter(Column::DeletedAt.is_null())
            .exec(&self.conn)
            .await?;

        if result.rows_affected == 0 {
            return Err(StoreError::not_found(employees::Entity::NAME, id));
        }
        Ok(())
    }

    /// Moves the employee to another department, or detaches them when
    /// `department_id` is `None` or zero.
    pub async fn set_department(
        &self,
        id: i64,
        department_id: Option<i64>,
    ) -> Result<(), StoreError> {
        let department_id = non_zero(department_id);
        if let Some(department_id) = department_id {
            catalog::ensure_live::<departments::Entity, _>(&self.conn, department_id).await?;
        }

        let result = employees::Entity::update_many()
            .col_expr(Column::DepartmentId, Expr::value(department_id))
            .filter(Column::Id.eq(id))
            .filter(Column::DeletedAt.is_null())
            .exec(&self.conn)
            .await?;

        if result.rows_affected == 0 {
            return Err(StoreError::not_found(employees::Entity::NAME, id));
        }
        Ok(())
    }

    async fn validate(&self, input: &EmployeeInput) -> Result<ValidEmployee, StoreError> {
        let department_id = non_zero(input.department_id);
        if let Some(department_id) = department_id {
            catalog::ensure_live::<departments::Entity, _>(&self.conn, department_id).await?;
        }

        Ok(ValidEmployee {
            last_name: required("last_name", &input.last_name)?,
            first_name: required("first_name", &input.first_name)?,
            middle_name: input
                .middle_name
                .as_deref()
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string),
            phone: required("phone", &input.phone)?,
            department_id,
        })
    }
}
