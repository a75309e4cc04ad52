use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, OnConflict, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::db::StoreError;
use crate::domain::movement::Destination;
use crate::entities::{current_locations, equipments, movements};

/// The `(department, employee, contract)` triple describing a place.
/// All three unset means storage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaceIds {
    pub department: Option<i64>,
    pub employee: Option<i64>,
    pub contract: Option<i64>,
}

impl PlaceIds {
    pub const STORAGE: Self = Self {
        department: None,
        employee: None,
        contract: None,
    };
}

impl From<&Destination> for PlaceIds {
    fn from(destination: &Destination) -> Self {
        let (department, employee, contract) = destination.ids();
        Self {
            department,
            employee,
            contract,
        }
    }
}

impl From<&current_locations::Model> for PlaceIds {
    fn from(row: &current_locations::Model) -> Self {
        Self {
            department: row.to_department_id,
            employee: row.to_employee_id,
            contract: row.to_contract_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewMovement {
    pub occurred_at: DateTime<Utc>,
    pub code: String,
    pub equipment_id: i64,
    pub actor_employee_id: Option<i64>,
    pub company_id: i64,
    pub from: PlaceIds,
    pub to: PlaceIds,
    pub transfer_type: Option<String>,
    pub price: Option<String>,
}

/// Outcome of [`LocationRepository::delete`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Deleted {
    pub removed: u64,
    pub equipment_ids: Vec<i64>,
}

/// The movement ledger together with its `current_locations` projection.
///
/// Every write keeps the projection in step with the ledger, so callers
/// must run writes inside a transaction.
pub struct LocationRepository<'a, C> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> LocationRepository<'a, C> {
    #[must_use]
    pub const fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn append(&self, movement: NewMovement) -> Result<movements::Model, StoreError> {
        let model = movements::ActiveModel {
            occurred_at: Set(movement.occurred_at),
            code: Set(movement.code),
            equipment_id: Set(movement.equipment_id),
            actor_employee_id: Set(movement.actor_employee_id),
            company_id: Set(movement.company_id),
            from_department_id: Set(movement.from.department),
            from_employee_id: Set(movement.from.employee),
            from_contract_id: Set(movement.from.contract),
            to_department_id: Set(movement.to.department),
            to_employee_id: Set(movement.to.employee),
            to_contract_id: Set(movement.to.contract),
            transfer_type: Set(movement.transfer_type),
            price: Set(movement.price),
            ..Default::default()
        }
        .insert(self.conn)
        .await?;

        self.set_current(&model).await?;
        Ok(model)
    }

    /// Where the equipment is now; storage when it has no movements.
    pub async fn current_place(&self, equipment_id: i64) -> Result<PlaceIds, StoreError> {
        let row = current_locations::Entity::find_by_id(equipment_id)
            .one(self.conn)
            .await?;

        Ok(row.as_ref().map_or(PlaceIds::STORAGE, PlaceIds::from))
    }

    pub async fn get(&self, id: i64) -> Result<movements::Model, StoreError> {
        movements::Entity::find_by_id(id)
            .one(self.conn)
            .await?
            .ok_or_else(|| StoreError::not_found("location", id))
    }

    pub async fn latest(&self, equipment_id: i64) -> Result<Option<movements::Model>, StoreError> {
        let row = movements::Entity::find()
            .filter(movements::Column::EquipmentId.eq(equipment_id))
            .order_by_desc(movements::Column::Id)
            .one(self.conn)
            .await?;

        Ok(row)
    }

    pub async fn latest_for(&self, equipment_id: i64) -> Result<movements::Model, StoreError> {
        self.latest(equipment_id)
            .await?
            .ok_or_else(|| StoreError::not_found("location of equipment", equipment_id))
    }

    /// Newest first.
    pub async fn history_for(
        &self,
        equipment_id: i64,
    ) -> Result<Vec<movements::Model>, StoreError> {
        let rows = movements::Entity::find()
            .filter(movements::Column::EquipmentId.eq(equipment_id))
            .order_by_desc(movements::Column::Id)
            .all(self.conn)
            .await?;

        Ok(rows)
    }

    pub async fn latest_per_equipment(&self) -> Result<Vec<movements::Model>, StoreError> {
        let latest = Query::select()
            .column(current_locations::Column::MovementId)
            .from(current_locations::Entity)
            .to_owned();

        let rows = movements::Entity::find()
            .filter(movements::Column::Id.in_subquery(latest))
            .order_by_asc(movements::Column::EquipmentId)
            .all(self.conn)
            .await?;

        Ok(rows)
    }

    /// Latest movements of live equipment currently at `to_department`, or in
    /// storage when `to_department` is `None`.
    pub async fn current_at(
        &self,
        to_department: Option<i64>,
    ) -> Result<Vec<movements::Model>, StoreError> {
        let mut latest = Query::select()
            .column((current_locations::Entity, current_locations::Column::MovementId))
            .from(current_locations::Entity)
            .inner_join(
                equipments::Entity,
                Expr::col((equipments::Entity, equipments::Column::Id)).equals((
                    current_locations::Entity,
                    current_locations::Column::EquipmentId,
                )),
            )
            .and_where(Expr::col((equipments::Entity, equipments::Column::DeletedAt)).is_null())
            .to_owned();

        let department = (current_locations::Entity, current_locations::Column::ToDepartmentId);
        match to_department {
            Some(department_id) => {
                latest.and_where(Expr::col(department).eq(department_id));
            }
            None => {
                latest
                    .and_where(Expr::col(department).is_null())
                    .and_where(
                        Expr::col((
                            current_locations::Entity,
                            current_locations::Column::ToEmployeeId,
                        ))
                        .is_null(),
                    )
                    .and_where(
                        Expr::col((
                            current_locations::Entity,
                            current_locations::Column::ToContractId,
                        ))
                        .is_null(),
                    );
            }
        }

        let rows = movements::Entity::find()
            .filter(movements::Column::Id.in_subquery(latest))
            .order_by_asc(movements::Column::EquipmentId)
            .all(self.conn)
            .await?;

        Ok(rows)
    }

    /// Deletes the given movements and re-points the projection of every
    /// affected equipment at its newest remaining movement.
    pub async fn delete(&self, ids: &[i64]) -> Result<Deleted, StoreError> {
        let doomed = movements::Entity::find()
            .filter(movements::Column::Id.is_in(ids.iter().copied()))
            .all(self.conn)
            .await?;

        if doomed.is_empty() {
            return Ok(Deleted::default());
        }

        let equipment_ids: BTreeSet<i64> = doomed.iter().map(|m| m.equipment_id).collect();
        for &equipment_id in &equipment_ids {
            let remaining = movements::Entity::find()
                .filter(movements::Column::EquipmentId.eq(equipment_id))
                .filter(movements::Column::Id.is_not_in(ids.iter().copied()))
                .order_by_desc(movements::Column::Id)
                .one(self.conn)
                .await?;

            match remaining {
                Some(movement) => self.set_current(&movement).await?,
                None => {
                    current_locations::Entity::delete_by_id(equipment_id)
                        .exec(self.conn)
                        .await?;
                }
            }
        }

        let result = movements::Entity::delete_many()
            .filter(movements::Column::Id.is_in(ids.iter().copied()))
            .exec(self.conn)
            .await?;

        Ok(Deleted {
            removed: result.rows_affected,
            equipment_ids: equipment_ids.into_iter().collect(),
        })
    }

    async fn set_current(&self, movement: &movements::Model) -> Result<(), StoreError> {
        let row = current_locations::ActiveModel {
            equipment_id: Set(movement.equipment_id),
            movement_id: Set(movement.id),
            to_department_id: Set(movement.to_department_id),
            to_employee_id: Set(movement.to_employee_id),
            to_contract_id: Set(movement.to_contract_id),
        };

        current_locations::Entity::insert(row)
            .on_conflict(
                OnConflict::column(current_locations::Column::EquipmentId)
                    .update_columns([
                        current_locations::Column::MovementId,
                        current_locations::Column::ToDepartmentId,
                        current_locations::Column::ToEmployeeId,
                        current_locations::Column::ToContractId,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(self.conn)
            .await?;

        Ok(())
    }
}
