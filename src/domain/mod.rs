//! Domain primitives shared by the stores, the services and the HTTP layer.
//!
//! Everything here is free of I/O: list query parameters, user roles and the
//! equipment transfer rules in [`movement`].

pub mod events;
pub mod movement;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default page size for catalog listings.
pub const DEFAULT_PAGE_SIZE: u64 = 50;

/// Sort order enumeration to replace boolean blindness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    /// Returns true if this is ascending order.
    #[must_use]
    pub const fn is_ascending(&self) -> bool {
        matches!(self, Self::Ascending)
    }
}

impl FromStr for SortOrder {
    type Err = String;

    /// Accepts `asc` / `desc` in any case; the empty string means ascending.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "asc" => Ok(Self::Ascending),
            "desc" => Ok(Self::Descending),
            other => Err(format!("Unknown sort order: {other}")),
        }
    }
}

/// Filtering, sorting and pagination for catalog listings.
///
/// `limit == 0` disables pagination. `ids` restricts the result set when it is
/// non-empty. `search` is matched case-insensitively as a substring of the
/// entity's textual key fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub with_deleted: bool,
    pub search: Option<String>,
    pub ids: Vec<i64>,
    pub sort_column: String,
    pub sort_order: SortOrder,
    pub limit: u64,
    pub offset: u64,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            with_deleted: false,
            search: None,
            ids: Vec::new(),
            sort_column: "id".to_string(),
            sort_order: SortOrder::Ascending,
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

/// A page of results together with the number of rows matching the filters.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

impl<T> Page<T> {
    #[must_use]
    pub const fn new(items: Vec<T>, total: u64) -> Self {
        Self { items, total }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
        }
    }
}

/// Account role. Stored as its lowercase name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Employee,
    Governing,
}

impl Role {
    pub const ALL: [Self; 3] = [Self::Admin, Self::Employee, Self::Governing];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Employee => "employee",
            Self::Governing => "governing",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| format!("Unknown role: {s}"))
    }
}

/// Normalizes the legacy "zero means unset" convention for optional ids.
#[must_use]
pub fn non_zero(id: Option<i64>) -> Option<i64> {
    id.filter(|id| *id != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_order_parsing_is_case_insensitive() {
        assert_eq!("ASC".parse::<SortOrder>(), Ok(SortOrder::Ascending));
        assert_eq!("Desc".parse::<SortOrder>(), Ok(SortOrder::Descending));
        assert_eq!("".parse::<SortOrder>(), Ok(SortOrder::Ascending));
        assert!("sideways".parse::<SortOrder>().is_err());
        assert!(SortOrder::default().is_ascending());
    }

    #[test]
    fn role_round_trips_through_its_name() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
        assert!("root".parse::<Role>().is_err());
        assert!("Admin".parse::<Role>().is_err());
    }

    #[test]
    fn list_query_defaults() {
        let query = ListQuery::default();
        assert_eq!(query.limit, 50);
        assert_eq!(query.offset, 0);
        assert_eq!(query.sort_column, "id");
        assert!(!query.with_deleted);
    }

    #[test]
    fn zero_ids_are_unset() {
        assert_eq!(non_zero(Some(0)), None);
        assert_eq!(non_zero(None), None);
        assert_eq!(non_zero(Some(7)), Some(7));
    }
}
