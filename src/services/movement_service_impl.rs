//! `SeaORM` implementation of the `MovementService` trait.
//!
//! Every write runs in a single transaction. Dropping the future before it
//! commits rolls the transaction back.

use async_trait::async_trait;
use sea_orm::ConnectionTrait;
use tracing::info;

use crate::db::catalog;
use crate::db::repositories::equipment::EquipmentRepository;
use crate::db::repositories::location::LocationRepository;
use crate::db::repositories::replace_pair::ReplacePairRepository;
use crate::db::repositories::view::{enrich_equipment, enrich_movements};
use crate::db::{EquipmentView, MovementView, NewMovement, PlaceIds, Store, StoreError};
use crate::domain::movement::{Destination, Transfer, TransferRequest, plan_sequence};
use crate::domain::{Page, non_zero};
use crate::entities::{companies, contracts, departments, employees, equipments};
use crate::services::movement_service::{MovementError, MovementService, NewEquipment};

pub struct SeaOrmMovementService {
    store: Store,
}

impl SeaOrmMovementService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    /// Company and destination rows must exist and be live.
    async fn ensure_references<C: ConnectionTrait>(
        conn: &C,
        company_id: i64,
        destination: &Destination,
    ) -> Result<(), StoreError> {
        catalog::ensure_live::<companies::Entity, _>(conn, company_id).await?;

        let (department, employee, contract) = destination.ids();
        if let Some(id) = department {
            catalog::ensure_live::<departments::Entity, _>(conn, id).await?;
        }
        if let Some(id) = employee {
            catalog::ensure_live::<employees::Entity, _>(conn, id).await?;
        }
        if let Some(id) = contract {
            catalog::ensure_live::<contracts::Entity, _>(conn, id).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl MovementService for SeaOrmMovementService {
    async fn transfer(
        &self,
        actor: Option<i64>,
        requests: Vec<TransferRequest>,
    ) -> Result<Vec<i64>, MovementError> {
        let transfers = requests
            .into_iter()
            .map(Transfer::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        let paired = plan_sequence(&transfers)?;

        let txn = self.store.begin_write().await?;
        let equipment = EquipmentRepository::new(&txn);
        let locations = LocationRepository::new(&txn);

        let mut ids = Vec::with_capacity(transfers.len());
        let mut replaced = Vec::with_capacity(2);
        let mut codes = Vec::with_capacity(transfers.len());

        for transfer in &transfers {
            equipment.lock(transfer.equipment_id).await?;
            Self::ensure_references(&txn, transfer.company_id, &transfer.destination).await?;

            let from = locations.current_place(transfer.equipment_id).await?;
            let (transfer_type, price) = transfer.destination.contract_terms();
            let code = transfer.code();

            let movement = locations
                .append(NewMovement {
                    occurred_at: transfer.occurred_at,
                    code: code.clone(),
                    equipment_id: transfer.equipment_id,
                    actor_employee_id: actor,
                    company_id: transfer.company_id,
                    from,
                    to: PlaceIds::from(&transfer.destination),
                    transfer_type,
                    price,
                })
                .await?;

            if transfer.is_replace() {
                replaced.push(movement.id);
            }
            ids.push(movement.id);
            codes.push(code);
        }

        if paired && let &[first, second] = replaced.as_slice() {
            ReplacePairRepository::new(&txn)
                .insert(first, second)
                .await?;
        }

        txn.commit().await.map_err(StoreError::from)?;

        for code in codes {
            metrics::counter!("movements_appended_total", "code" => code).increment(1);
        }
        info!(count = ids.len(), paired, "Transfer sequence recorded");
        Ok(ids)
    }

    async fn create_equipment(
        &self,
        actor: Option<i64>,
        request: NewEquipment,
    ) -> Result<i64, MovementError> {
        if request.company_id <= 0 {
            return Err(MovementError::InvalidId(request.company_id));
        }

        let destination = Destination::from_ids(
            request.to_department,
            request.to_employee,
            request.to_contract,
            request.transfer_type,
            request.price,
        )?;
        let code = destination.bootstrap_code();
        let (transfer_type, price) = destination.contract_terms();

        let txn = self.store.begin_write().await?;

        let equipment_id = EquipmentRepository::new(&txn)
            .insert(&request.serial_number, request.profile_id)
            .await?;
        Self::ensure_references(&txn, request.company_id, &destination).await?;

        LocationRepository::new(&txn)
            .append(NewMovement {
                occurred_at: request.occurred_at,
                code: code.clone(),
                equipment_id,
                actor_employee_id: actor,
                company_id: request.company_id,
                from: PlaceIds::STORAGE,
                to: PlaceIds::from(&destination),
                transfer_type,
                price,
            })
            .await?;

        txn.commit().await.map_err(StoreError::from)?;

        metrics::counter!("movements_appended_total", "code" => code.clone()).increment(1);
        info!(equipment_id, code = %code, "Equipment created");
        Ok(equipment_id)
    }

    async fn delete_movement(&self, id: i64) -> Result<Vec<i64>, MovementError> {
        if id <= 0 {
            return Err(MovementError::InvalidId(id));
        }

        let txn = self.store.begin_write().await?;
        let pairs = ReplacePairRepository::new(&txn);

        let (targets, pair) = match pairs.find_by_movement(id).await? {
            Some(pair) => {
                pairs.delete(pair.id).await?;
                (vec![pair.from_movement_id, pair.to_movement_id], Some(pair.id))
            }
            None => (vec![id], None),
        };

        let deleted = LocationRepository::new(&txn).delete(&targets).await?;
        if deleted.removed != targets.len() as u64 {
            return Err(match pair {
                Some(pair_id) => StoreError::Conflict(format!(
                    "replace pair {pair_id} references a missing movement"
                )),
                None => StoreError::not_found("location", id),
            }
            .into());
        }

        txn.commit().await.map_err(StoreError::from)?;

        info!(movement_id = id, removed = deleted.removed, "Movement deleted");
        Ok(deleted.equipment_ids)
    }

    async fn history(&self, equipment_id: i64) -> Result<Vec<MovementView>, MovementError> {
        self.store.get::<equipments::Entity>(equipment_id).await?;

        let rows = self.store.location_repo().history_for(equipment_id).await?;
        Ok(enrich_movements(&self.store.conn, rows).await?)
    }

    async fn latest(&self, equipment_id: i64) -> Result<MovementView, MovementError> {
        let row = self.store.location_repo().latest_for(equipment_id).await?;

        enrich_movements(&self.store.conn, vec![row])
            .await?
            .pop()
            .ok_or_else(|| StoreError::not_found("location of equipment", equipment_id).into())
    }

    async fn current_locations(
        &self,
        to_department: Option<i64>,
    ) -> Result<Page<MovementView>, MovementError> {
        let rows = self
            .store
            .location_repo()
            .current_at(non_zero(to_department))
            .await?;

        let items = enrich_movements(&self.store.conn, rows).await?;
        let total = items.len() as u64;
        Ok(Page::new(items, total))
    }

    async fn equipment(&self, id: i64) -> Result<EquipmentView, MovementError> {
        let equipment = self.store.get::<equipments::Entity>(id).await?;
        let latest = self.store.location_repo().latest(id).await?;

        Ok(enrich_equipment(&self.store.conn, equipment, latest).await?)
    }
}
