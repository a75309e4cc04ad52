//! Read models that decorate ledger rows with the titles and names of the
//! rows they reference. Rows keep only foreign-key ids; labels are looked up
//! in batches at query time.

use std::collections::{BTreeSet, HashMap};

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use serde::Serialize;

use crate::db::StoreError;
use crate::db::catalog::Catalog;
use crate::entities::{
    categories, companies, contracts, departments, employees, equipments, movements, profiles,
};

#[derive(Debug, Clone, Serialize)]
pub struct MovementView {
    #[serde(flatten)]
    pub movement: movements::Model,
    pub serial_number: Option<String>,
    pub profile: Option<String>,
    pub category: Option<String>,
    pub company: Option<String>,
    pub actor: Option<String>,
    pub from_department: Option<String>,
    pub from_employee: Option<String>,
    pub from_contract: Option<String>,
    pub to_department: Option<String>,
    pub to_employee: Option<String>,
    pub to_contract: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EquipmentView {
    #[serde(flatten)]
    pub equipment: equipments::Model,
    pub profile: Option<String>,
    pub category: Option<String>,
    pub location: Option<MovementView>,
}

async fn by_id<E, C>(
    conn: &C,
    ids: BTreeSet<i64>,
    key: fn(&E::Model) -> i64,
) -> Result<HashMap<i64, E::Model>, StoreError>
where
    E: Catalog,
    C: ConnectionTrait,
{
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = E::find()
        .filter(E::id_column().is_in(ids))
        .all(conn)
        .await?;

    Ok(rows.into_iter().map(|row| (key(&row), row)).collect())
}

fn collect(ids: impl IntoIterator<Item = Option<i64>>) -> BTreeSet<i64> {
    ids.into_iter().flatten().collect()
}

/// Attaches labels to each movement, preserving order.
pub async fn enrich_movements<C: ConnectionTrait>(
    conn: &C,
    rows: Vec<movements::Model>,
) -> Result<Vec<MovementView>, StoreError> {
    let equipment = by_id::<equipments::Entity, _>(
        conn,
        collect(rows.iter().map(|m| Some(m.equipment_id))),
        |e| e.id,
    )
    .await?;
    let profile = by_id::<profiles::Entity, _>(
        conn,
        collect(equipment.values().map(|e| Some(e.profile_id))),
        |p| p.id,
    )
    .await?;
    let category = by_id::<categories::Entity, _>(
        conn,
        collect(profile.values().map(|p| Some(p.category_id))),
        |c| c.id,
    )
    .await?;
    let company = by_id::<companies::Entity, _>(
        conn,
        collect(rows.iter().map(|m| Some(m.company_id))),
        |c| c.id,
    )
    .await?;
    let department = by_id::<departments::Entity, _>(
        conn,
        collect(
            rows.iter()
                .flat_map(|m| [m.from_department_id, m.to_department_id]),
        ),
        |d| d.id,
    )
    .await?;
    let employee = by_id::<employees::Entity, _>(
        conn,
        collect(rows.iter().flat_map(|m| {
            [m.actor_employee_id, m.from_employee_id, m.to_employee_id]
        })),
        |e| e.id,
    )
    .await?;
    let contract = by_id::<contracts::Entity, _>(
        conn,
        collect(rows.iter().flat_map(|m| [m.from_contract_id, m.to_contract_id])),
        |c| c.id,
    )
    .await?;

    let department_title =
        |id: Option<i64>| id.and_then(|id| department.get(&id)).map(|d| d.title.clone());
    let employee_name =
        |id: Option<i64>| id.and_then(|id| employee.get(&id)).map(employees::Model::full_name);
    let contract_number =
        |id: Option<i64>| id.and_then(|id| contract.get(&id)).map(|c| c.number.clone());

    Ok(rows
        .into_iter()
        .map(|movement| {
            let item = equipment.get(&movement.equipment_id);
            let model = item.and_then(|e| profile.get(&e.profile_id));
            let kind = model.and_then(|p| category.get(&p.category_id));

            MovementView {
                serial_number: item.map(|e| e.serial_number.clone()),
                profile: model.map(|p| p.title.clone()),
                category: kind.map(|c| c.title.clone()),
                company: company.get(&movement.company_id).map(|c| c.title.clone()),
                actor: employee_name(movement.actor_employee_id),
                from_department: department_title(movement.from_department_id),
                from_employee: employee_name(movement.from_employee_id),
                from_contract: contract_number(movement.from_contract_id),
                to_department: department_title(movement.to_department_id),
                to_employee: employee_name(movement.to_employee_id),
                to_contract: contract_number(movement.to_contract_id),
                movement,
            }
        })
        .collect())
}

pub async fn enrich_equipment<C: ConnectionTrait>(
    conn: &C,
    equipment: equipments::Model,
    latest: Option<movements::Model>,
) -> Result<EquipmentView, StoreError> {
    let profile = profiles::Entity::find_by_id(equipment.profile_id)
        .one(conn)
        .await?;
    let category = match &profile {
        Some(p) => categories::Entity::find_by_id(p.category_id).one(conn).await?,
        None => None,
    };

    let location = match latest {
        Some(movement) => enrich_movements(conn, vec![movement]).await?.pop(),
        None => None,
    };

    Ok(EquipmentView {
        equipment,
        profile: profile.map(|p| p.title),
        category: category.map(|c| c.title),
        location,
    })
}
