use serde::{Deserialize, Serialize};

use super::ApiError;
use super::validation::parse_ids;
use crate::domain::movement::TransferRequest;
use crate::domain::{DEFAULT_PAGE_SIZE, ListQuery, SortOrder};

/// Query string of every `GET /api/{entity}` listing.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub deleted: bool,
    pub search: Option<String>,
    pub ids: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl TryFrom<ListParams> for ListQuery {
    type Error = ApiError;

    fn try_from(params: ListParams) -> Result<Self, Self::Error> {
        let sort_order = params
            .order
            .as_deref()
            .unwrap_or_default()
            .parse::<SortOrder>()
            .map_err(ApiError::validation)?;

        let ids = match params.ids.as_deref() {
            Some(raw) => parse_ids(raw)?,
            None => Vec::new(),
        };

        let sort_column = params
            .sort_by
            .map(|column| column.trim().to_ascii_lowercase())
            .filter(|column| !column.is_empty())
            .unwrap_or_else(|| "id".to_string());

        Ok(Self {
            with_deleted: params.deleted,
            search: params
                .search
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            ids,
            sort_column,
            sort_order,
            limit: params.limit.unwrap_or(DEFAULT_PAGE_SIZE),
            offset: params.offset.unwrap_or(0),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: i64,
}

#[derive(Debug, Serialize)]
pub struct IdsResponse {
    pub ids: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub struct TitleRequest {
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    pub title: String,
    pub category_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct ContractRequest {
    pub number: String,
    pub address: String,
}

#[derive(Debug, Deserialize)]
pub struct SetDepartmentRequest {
    #[serde(default)]
    pub department_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateEquipmentRequest {
    pub serial_number: String,
    pub profile_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct TransferBody {
    pub requests: Vec<TransferRequest>,
}

#[derive(Debug, Deserialize)]
pub struct LocationParams {
    pub to_department_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SetPasswordRequest {
    #[serde(default)]
    pub old_password: Option<String>,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct SetEnabledRequest {
    pub enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_params_defaults() {
        let query = ListQuery::try_from(ListParams::default()).unwrap();
        assert_eq!(query, ListQuery::default());
    }

    #[test]
    fn list_params_conversion() {
        let params = ListParams {
            deleted: true,
            search: Some("  lap ".to_string()),
            ids: Some("3,1".to_string()),
            sort_by: Some("Title".to_string()),
            order: Some("DESC".to_string()),
            limit: Some(0),
            offset: Some(10),
        };

        let query = ListQuery::try_from(params).unwrap();
        assert!(query.with_deleted);
        assert_eq!(query.search.as_deref(), Some("lap"));
        assert_eq!(query.ids, vec![3, 1]);
        assert_eq!(query.sort_column, "title");
        assert_eq!(query.sort_order, SortOrder::Descending);
        assert_eq!(query.limit, 0);
        assert_eq!(query.offset, 10);
    }

    #[test]
    fn list_params_reject_unknown_order() {
        let params = ListParams {
            order: Some("sideways".to_string()),
            ..ListParams::default()
        };
        assert!(ListQuery::try_from(params).is_err());
    }
}
