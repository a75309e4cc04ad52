use crate::entities::prelude::*;
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::{ConnectionTrait, EntityTrait, Schema};

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Unique keys that only hold among rows that are not soft-deleted.
const LIVE_UNIQUE_INDEXES: &[(&str, &str, &str)] = &[
    ("idx_categories_title_live", "categories", "title"),
    ("idx_profiles_title_live", "profiles", "title"),
    ("idx_companies_title_live", "companies", "title"),
    ("idx_contracts_number_live", "contracts", "number"),
    ("idx_departments_title_live", "departments", "title"),
    ("idx_employees_phone_live", "employees", "phone"),
    ("idx_equipments_serial_live", "equipments", "serial_number"),
];

async fn create_from_entity<E>(manager: &SchemaManager<'_>, entity: E) -> Result<(), DbErr>
where
    E: EntityTrait,
{
    let schema = Schema::new(manager.get_database_backend());
    manager
        .create_table(schema.create_table_from_entity(entity).if_not_exists().to_owned())
        .await
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Referenced tables first.
        create_from_entity(manager, Categories).await?;
        create_from_entity(manager, Profiles).await?;
        create_from_entity(manager, Companies).await?;
        create_from_entity(manager, Contracts).await?;
        create_from_entity(manager, Departments).await?;
        create_from_entity(manager, Employees).await?;
        create_from_entity(manager, Users).await?;
        create_from_entity(manager, Equipments).await?;
        create_from_entity(manager, Movements).await?;
        create_from_entity(manager, ReplacePairs).await?;
        create_from_entity(manager, CurrentLocations).await?;

        let conn = manager.get_connection();
        for (name, table, column) in LIVE_UNIQUE_INDEXES {
            conn.execute_unprepared(&format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS {name} ON {table} ({column}) \
                 WHERE deleted_at IS NULL"
            ))
            .await?;
        }

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_movements_equipment")
                    .table(Movements)
                    .col(crate::entities::movements::Column::EquipmentId)
                    .col(crate::entities::movements::Column::Id)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_current_locations_department")
                    .table(CurrentLocations)
                    .col(crate::entities::current_locations::Column::ToDepartmentId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .unique()
                    .name("idx_replace_pairs_movements")
                    .table(ReplacePairs)
                    .col(crate::entities::replace_pairs::Column::FromMovementId)
                    .col(crate::entities::replace_pairs::Column::ToMovementId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Dependents first.
        let tables = [
            Table::drop().table(CurrentLocations).if_exists().to_owned(),
            Table::drop().table(ReplacePairs).if_exists().to_owned(),
            Table::drop().table(Movements).if_exists().to_owned(),
            Table::drop().table(Equipments).if_exists().to_owned(),
            Table::drop().table(Users).if_exists().to_owned(),
            Table::drop().table(Employees).if_exists().to_owned(),
            Table::drop().table(Departments).if_exists().to_owned(),
            Table::drop().table(Contracts).if_exists().to_owned(),
            Table::drop().table(Companies).if_exists().to_owned(),
            Table::drop().table(Profiles).if_exists().to_owned(),
            Table::drop().table(Categories).if_exists().to_owned(),
        ];

        for table in tables {
            manager.drop_table(table).await?;
        }

        Ok(())
    }
}
