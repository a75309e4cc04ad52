//! Operations shared by every catalog entity: read by id, soft delete,
//! restore and filtered listing.
//!
//! Entities opt in by implementing [`Catalog`], which names the columns the
//! generic queries need.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, LikeExpr};
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, Order, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};

use super::StoreError;
use crate::domain::{ListQuery, Page};

const UNBOUNDED: u64 = i64::MAX.unsigned_abs();

pub trait Catalog: EntityTrait {
    /// Singular name used in error messages.
    const NAME: &'static str;

    fn id_column() -> Self::Column;

    /// `None` for entities that are hard-deleted.
    fn deleted_at_column() -> Option<Self::Column>;

    /// Column holding the [`search_key`] of the textual key fields.
    fn search_key_column() -> Self::Column;

    /// Maps a public sort key to a column. `id` must always be accepted.
    fn sort_column(name: &str) -> Option<Self::Column>;
}

pub async fn get<E, C>(conn: &C, id: i64) -> Result<E::Model, StoreError>
where
    E: Catalog,
    C: ConnectionTrait,
{
    E::find()
        .filter(E::id_column().eq(id))
        .one(conn)
        .await?
        .ok_or_else(|| StoreError::not_found(E::NAME, id))
}

/// Fails with `InvalidInput` unless a live row with this id exists. Used to
/// check references before they are written.
pub async fn ensure_live<E, C>(conn: &C, id: i64) -> Result<(), StoreError>
where
    E: Catalog,
    C: ConnectionTrait,
{
    let mut select = E::find().filter(E::id_column().eq(id));
    if let Some(deleted_at) = E::deleted_at_column() {
        select = select.filter(deleted_at.is_null());
    }

    match select.one(conn).await? {
        Some(_) => Ok(()),
        None => Err(StoreError::invalid(format!(
            "{} {id} does not exist or is deleted",
            E::NAME
        ))),
    }
}

pub async fn soft_delete<E, C>(conn: &C, id: i64) -> Result<(), StoreError>
where
    E: Catalog,
    C: ConnectionTrait,
{
    let deleted_at = deleted_at_column::<E>()?;

    let result = E::update_many()
        .col_expr(deleted_at, Expr::value(Utc::now()))
        .filter(E::id_column().eq(id))
        .filter(deleted_at.is_null())
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(StoreError::not_found(E::NAME, id));
    }
    Ok(())
}

/// Clears `deleted_at`. Only rows that are currently deleted qualify, and a
/// live row holding the same unique key makes this fail with `AlreadyExists`.
pub async fn restore<E, C>(conn: &C, id: i64) -> Result<(), StoreError>
where
    E: Catalog,
    C: ConnectionTrait,
{
    let deleted_at = deleted_at_column::<E>()?;

    let result = E::update_many()
        .col_expr(deleted_at, Expr::value(Option::<DateTime<Utc>>::None))
        .filter(E::id_column().eq(id))
        .filter(deleted_at.is_not_null())
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(StoreError::not_found(E::NAME, id));
    }
    Ok(())
}

pub async fn list<E, C>(conn: &C, query: &ListQuery) -> Result<Page<E::Model>, StoreError>
where
    E: Catalog,
    E::Model: Sync,
    C: ConnectionTrait,
{
    let sort_column = E::sort_column(&query.sort_column).ok_or_else(|| {
        StoreError::invalid(format!("Unknown sort column: {}", query.sort_column))
    })?;

    let mut select = E::find();

    if !query.with_deleted
        && let Some(deleted_at) = E::deleted_at_column()
    {
        select = select.filter(deleted_at.is_null());
    }

    if !query.ids.is_empty() {
        select = select.filter(E::id_column().is_in(query.ids.iter().copied()));
    }

    if let Some(search) = query.search.as_deref().map(str::trim)
        && !search.is_empty()
    {
        let pattern = LikeExpr::new(contains_pattern(search)).escape('\\');
        select = select.filter(Expr::col(E::search_key_column()).like(pattern));
    }

    let total = select.clone().count(conn).await?;

    let order = if query.sort_order.is_ascending() {
        Order::Asc
    } else {
        Order::Desc
    };
    select = select
        .order_by(sort_column, order.clone())
        .order_by(E::id_column(), order);

    if query.limit > 0 || query.offset > 0 {
        let limit = if query.limit > 0 { query.limit } else { UNBOUNDED };
        select = select.limit(limit).offset(query.offset);
    }

    let items = select.all(conn).await?;
    Ok(Page::new(items, total))
}

fn deleted_at_column<E: Catalog>() -> Result<E::Column, StoreError> {
    E::deleted_at_column()
        .ok_or_else(|| StoreError::Conflict(format!("{} does not support soft delete", E::NAME)))
}

/// Folds the searchable fields of a row into one lowercased string. SQLite's
/// `LOWER()` only folds ASCII, so this runs in Rust on both sides.
pub fn search_key<'a>(fields: impl IntoIterator<Item = &'a str>) -> String {
    fields
        .into_iter()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("\n")
}

/// `%term%` with the term lowercased and its LIKE wildcards escaped.
fn contains_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for c in search.to_lowercase().chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Trims a mandatory text field and rejects it when empty.
pub fn required(field: &str, value: &str) -> Result<String, StoreError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(StoreError::invalid(format!("{field} is required")));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_keys_fold_unicode() {
        assert_eq!(search_key(["Принтеры"]), "принтеры");
        assert_eq!(search_key(["Ivanov", "", "+7 900"]), "ivanov\n\n+7 900");
    }

    #[test]
    fn wildcards_are_escaped() {
        assert_eq!(contains_pattern("SN_1"), "%sn\\_1%");
        assert_eq!(contains_pattern("50%"), "%50\\%%");
        assert_eq!(contains_pattern("a\\b"), "%a\\\\b%");
        assert_eq!(contains_pattern("ПРИНТ"), "%принт%");
    }
}
