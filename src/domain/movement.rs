//! Equipment transfer rules.
//!
//! An equipment item is always in exactly one place: storage, a department,
//! an employee, an employee inside a department, or a customer contract.
//! Every movement between places is labelled with a code derived from the
//! place it leaves and the destination it reaches, for example
//! `STORAGE_TO_DEPARTMENT` or `DEPARTMENT_TO_EMPLOYEE_IN_DEPARTMENT`.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::non_zero;

/// Code of the bootstrap movement written when equipment enters storage.
pub const ADD_TO_STORAGE: &str = "ADD_TO_STORAGE";

const IN_DEPARTMENT_SUFFIX: &str = "_IN_DEPARTMENT";

/// Reasons a transfer request cannot be turned into a movement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferRuleError {
    #[error("Unknown place label: '{0}'")]
    UnknownPlace(String),

    #[error("Unknown transfer way: '{0}'")]
    UnknownWay(String),

    #[error("A contract destination cannot be combined with a department or employee")]
    MixedDestination,

    #[error("A contract destination requires a transfer type")]
    MissingTransferType,

    #[error("Invalid id for {field}: {value}")]
    InvalidId { field: &'static str, value: i64 },

    #[error("A replace sequence must contain exactly two replace requests, got {0}")]
    UnpairedReplace(usize),

    #[error("A transfer sequence cannot be empty")]
    EmptySequence,
}

/// Closed vocabulary for the source and destination labels of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaceKind {
    Storage,
    Department,
    Employee,
    Contract,
}

impl PlaceKind {
    pub const ALL: [Self; 4] = [
        Self::Storage,
        Self::Department,
        Self::Employee,
        Self::Contract,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Storage => "storage",
            Self::Department => "department",
            Self::Employee => "employee",
            Self::Contract => "contract",
        }
    }
}

impl fmt::Display for PlaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlaceKind {
    type Err = TransferRuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == label)
            .ok_or_else(|| TransferRuleError::UnknownPlace(s.to_string()))
    }
}

/// Whether a transfer is a plain move or one half of a swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Way {
    #[default]
    Plain,
    Replace,
}

impl FromStr for Way {
    type Err = TransferRuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" => Ok(Self::Plain),
            "replace" => Ok(Self::Replace),
            _ => Err(TransferRuleError::UnknownWay(s.to_string())),
        }
    }
}

/// Where a movement takes the equipment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Storage,
    Department(i64),
    Employee(i64),
    DepartmentEmployee {
        department: i64,
        employee: i64,
    },
    Contract {
        contract: i64,
        transfer_type: String,
        price: Option<String>,
    },
}

impl Destination {
    /// Builds a destination from the optional id triple of a request.
    /// Zero ids count as unset.
    pub fn from_ids(
        to_department: Option<i64>,
        to_employee: Option<i64>,
        to_contract: Option<i64>,
        transfer_type: Option<String>,
        price: Option<String>,
    ) -> Result<Self, TransferRuleError> {
        let department = checked_id("to_department", to_department)?;
        let employee = checked_id("to_employee", to_employee)?;
        let contract = checked_id("to_contract", to_contract)?;

        match (department, employee, contract) {
            (None, None, None) => Ok(Self::Storage),
            (Some(department), None, None) => Ok(Self::Department(department)),
            (None, Some(employee), None) => Ok(Self::Employee(employee)),
            (Some(department), Some(employee), None) => Ok(Self::DepartmentEmployee {
                department,
                employee,
            }),
            (None, None, Some(contract)) => {
                let transfer_type = transfer_type
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .ok_or(TransferRuleError::MissingTransferType)?;
                Ok(Self::Contract {
                    contract,
                    transfer_type,
                    price: price.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()),
                })
            }
            _ => Err(TransferRuleError::MixedDestination),
        }
    }

    /// The `(department, employee, contract)` triple persisted as `to_*`.
    #[must_use]
    pub const fn ids(&self) -> (Option<i64>, Option<i64>, Option<i64>) {
        match self {
            Self::Storage => (None, None, None),
            Self::Department(d) => (Some(*d), None, None),
            Self::Employee(e) => (None, Some(*e), None),
            Self::DepartmentEmployee {
                department,
                employee,
            } => (Some(*department), Some(*employee), None),
            Self::Contract { contract, .. } => (None, None, Some(*contract)),
        }
    }

    /// Transfer type and price, only present for contract destinations.
    #[must_use]
    pub fn contract_terms(&self) -> (Option<String>, Option<String>) {
        match self {
            Self::Contract {
                transfer_type,
                price,
                ..
            } => (Some(transfer_type.clone()), price.clone()),
            _ => (None, None),
        }
    }

    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!(self, Self::Storage)
    }

    /// Code for the single movement written when equipment is created
    /// directly at this destination.
    #[must_use]
    pub fn bootstrap_code(&self) -> String {
        match self {
            Self::Storage => ADD_TO_STORAGE.to_string(),
            Self::Department(_) => "ADD_TO_DEPARTMENT".to_string(),
            Self::Employee(_) => "ADD_TO_EMPLOYEE".to_string(),
            Self::DepartmentEmployee { .. } => format!("ADD_TO_EMPLOYEE{IN_DEPARTMENT_SUFFIX}"),
            Self::Contract { .. } => "ADD_TO_CONTRACT".to_string(),
        }
    }
}

fn checked_id(field: &'static str, id: Option<i64>) -> Result<Option<i64>, TransferRuleError> {
    match non_zero(id) {
        Some(value) if value < 0 => Err(TransferRuleError::InvalidId { field, value }),
        other => Ok(other),
    }
}

/// Derives the movement code.
///
/// Storage destinations ignore `where_to`; the `_IN_DEPARTMENT` suffix only
/// applies to department and department-employee destinations.
#[must_use]
pub fn classify(
    this_location: PlaceKind,
    where_to: PlaceKind,
    destination: &Destination,
    in_department: bool,
) -> String {
    let source = this_location.as_str().to_ascii_uppercase();
    let target = where_to.as_str().to_ascii_uppercase();

    match destination {
        Destination::Storage => format!("{source}_TO_STORAGE"),
        Destination::Department(_) | Destination::DepartmentEmployee { .. } => {
            let suffix = if in_department {
                IN_DEPARTMENT_SUFFIX
            } else {
                ""
            };
            format!("{source}_TO_{target}{suffix}")
        }
        Destination::Employee(_) | Destination::Contract { .. } => {
            format!("{source}_TO_{target}")
        }
    }
}

/// A transfer request as it arrives over the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct TransferRequest {
    pub occurred_at: DateTime<Utc>,
    pub equipment_id: i64,
    pub company_id: i64,
    pub this_location: String,
    #[serde(rename = "where")]
    pub where_to: String,
    #[serde(default)]
    pub in_department: bool,
    #[serde(default)]
    pub to_department: Option<i64>,
    #[serde(default)]
    pub to_employee: Option<i64>,
    #[serde(default)]
    pub to_contract: Option<i64>,
    #[serde(default)]
    pub way: String,
    #[serde(default)]
    pub transfer_type: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
}

/// A validated transfer, ready to be appended to the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub occurred_at: DateTime<Utc>,
    pub equipment_id: i64,
    pub company_id: i64,
    pub this_location: PlaceKind,
    pub where_to: PlaceKind,
    pub in_department: bool,
    pub destination: Destination,
    pub way: Way,
}

impl Transfer {
    #[must_use]
    pub fn code(&self) -> String {
        classify(
            self.this_location,
            self.where_to,
            &self.destination,
            self.in_department,
        )
    }

    #[must_use]
    pub const fn is_replace(&self) -> bool {
        matches!(self.way, Way::Replace)
    }
}

impl TryFrom<TransferRequest> for Transfer {
    type Error = TransferRuleError;

    fn try_from(req: TransferRequest) -> Result<Self, Self::Error> {
        if req.equipment_id <= 0 {
            return Err(TransferRuleError::InvalidId {
                field: "equipment_id",
                value: req.equipment_id,
            });
        }
        if req.company_id <= 0 {
            return Err(TransferRuleError::InvalidId {
                field: "company_id",
                value: req.company_id,
            });
        }

        Ok(Self {
            occurred_at: req.occurred_at,
            equipment_id: req.equipment_id,
            company_id: req.company_id,
            this_location: req.this_location.parse()?,
            where_to: req.where_to.parse()?,
            in_department: req.in_department,
            destination: Destination::from_ids(
                req.to_department,
                req.to_employee,
                req.to_contract,
                req.transfer_type,
                req.price,
            )?,
            way: req.way.parse()?,
        })
    }
}

/// Validates a whole transfer sequence and reports whether its replace
/// requests must be recorded as a pair.
///
/// Pairing happens only when the first request is a replace request, and then
/// exactly two replace requests are required.
pub fn plan_sequence(transfers: &[Transfer]) -> Result<bool, TransferRuleError> {
    let Some(first) = transfers.first() else {
        return Err(TransferRuleError::EmptySequence);
    };

    if !first.is_replace() {
        return Ok(false);
    }

    let replaces = transfers.iter().filter(|t| t.is_replace()).count();
    if replaces == 2 {
        Ok(true)
    } else {
        Err(TransferRuleError::UnpairedReplace(replaces))
    }
}
