//! Domain service for the equipment ledger: transfers, equipment creation
//! with its first placement, movement deletion and location queries.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::db::{EquipmentView, MovementView, StoreError};
use crate::domain::Page;
use crate::domain::movement::{TransferRequest, TransferRuleError};

#[derive(Debug, Error)]
pub enum MovementError {
    #[error(transparent)]
    Rule(#[from] TransferRuleError),

    #[error("Invalid id: {0}")]
    InvalidId(i64),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Body of an equipment create: the equipment itself plus where it starts.
/// No destination ids means storage.
#[derive(Debug, Clone, Deserialize)]
pub struct NewEquipment {
    pub serial_number: String,
    pub profile_id: i64,
    #[serde(default = "Utc::now")]
    pub occurred_at: DateTime<Utc>,
    pub company_id: i64,
    #[serde(default)]
    pub to_department: Option<i64>,
    #[serde(default)]
    pub to_employee: Option<i64>,
    #[serde(default)]
    pub to_contract: Option<i64>,
    #[serde(default)]
    pub transfer_type: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
}

#[async_trait::async_trait]
pub trait MovementService: Send + Sync {
    /// Appends one movement per request, atomically. Returns the new
    /// movement ids in request order.
    ///
    /// # Errors
    ///
    /// Any failure rolls back every movement of the call.
    async fn transfer(
        &self,
        actor: Option<i64>,
        requests: Vec<TransferRequest>,
    ) -> Result<Vec<i64>, MovementError>;

    /// Inserts the equipment and its single bootstrap movement in one
    /// transaction. Returns the equipment id.
    async fn create_equipment(
        &self,
        actor: Option<i64>,
        request: NewEquipment,
    ) -> Result<i64, MovementError>;

    /// Deletes a movement, or both movements of its replace pair. Returns the
    /// equipment ids whose location changed.
    async fn delete_movement(&self, id: i64) -> Result<Vec<i64>, MovementError>;

    /// Movements of one equipment, newest first.
    async fn history(&self, equipment_id: i64) -> Result<Vec<MovementView>, MovementError>;

    async fn latest(&self, equipment_id: i64) -> Result<MovementView, MovementError>;

    /// Equipment whose latest movement targets `to_department`; storage when
    /// `None`.
    async fn current_locations(
        &self,
        to_department: Option<i64>,
    ) -> Result<Page<MovementView>, MovementError>;

    async fn equipment(&self, id: i64) -> Result<EquipmentView, MovementError>;
}
