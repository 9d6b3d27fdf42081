//! Bill item repository contract and SQLite implementation.
//!
//! # Invariants
//! - Write paths call `BillItem::validate()` before dispatch.
//! - Listing order is deterministic: `bill_date DESC, id DESC`, so the first
//!   row of a filtered listing is the latest item.
//! - Read paths reject persisted rows with unknown `bill_type` values.

use super::{dispatch, Access, EntityKind, RepoError, RepoResult};
use crate::db::ReplicatedStore;
use crate::model::bill_category::CategoryId;
use crate::model::bill_item::{BillItem, BillItemId, BillType};
use crate::model::user::UserId;
use crate::model::ValidationError;
use crate::routing::OperationContext;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const BILL_ITEM_SELECT_SQL: &str = "SELECT
    id,
    user_id,
    category_id,
    bill_type,
    bill_date,
    amount,
    description
FROM bill_items";

/// Filter for listing bill items. Dates are inclusive epoch milliseconds.
#[derive(Debug, Clone, Default)]
pub struct BillItemListQuery {
    pub user_id: Option<UserId>,
    pub category_id: Option<CategoryId>,
    pub start_date: Option<i64>,
    pub end_date: Option<i64>,
    pub bill_type: Option<BillType>,
    pub limit: Option<u32>,
}

impl BillItemListQuery {
    /// All items of one type for one user.
    pub fn for_user(user_id: UserId, bill_type: BillType) -> Self {
        Self {
            user_id: Some(user_id),
            bill_type: Some(bill_type),
            ..Self::default()
        }
    }
}

/// Repository interface for bill item persistence.
pub trait BillItemRepository {
    fn create_item(&self, ctx: &OperationContext<'_>, item: &BillItem) -> RepoResult<BillItemId>;
    fn update_item(&self, ctx: &OperationContext<'_>, item: &BillItem) -> RepoResult<BillItemId>;
    fn delete_item(&self, ctx: &OperationContext<'_>, id: BillItemId) -> RepoResult<usize>;
    fn load_item(
        &self,
        ctx: &OperationContext<'_>,
        id: BillItemId,
        primary: bool,
    ) -> RepoResult<Option<BillItem>>;
    fn list_items(
        &self,
        ctx: &OperationContext<'_>,
        query: &BillItemListQuery,
        primary: bool,
    ) -> RepoResult<Vec<BillItem>>;
    /// Most recent item of `bill_type` for `user_id`, if any.
    fn latest_item(
        &self,
        ctx: &OperationContext<'_>,
        user_id: UserId,
        bill_type: BillType,
        primary: bool,
    ) -> RepoResult<Option<BillItem>>;
}

/// SQLite-backed bill item repository.
pub struct SqliteBillItemRepository<'store> {
    store: &'store ReplicatedStore,
}

impl<'store> SqliteBillItemRepository<'store> {
    pub fn new(store: &'store ReplicatedStore) -> Self {
        Self { store }
    }
}

impl BillItemRepository for SqliteBillItemRepository<'_> {
    fn create_item(&self, ctx: &OperationContext<'_>, item: &BillItem) -> RepoResult<BillItemId> {
        item.validate()?;

        dispatch(
            self.store,
            ctx,
            EntityKind::BillItem,
            "create",
            Access::Write,
            |conn| {
                conn.execute(
                    "INSERT INTO bill_items (
                        user_id,
                        category_id,
                        bill_type,
                        bill_date,
                        amount,
                        description
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
                    params![
                        item.user_id,
                        item.category_id,
                        item.bill_type.as_str(),
                        item.bill_date,
                        item.amount,
                        item.description.as_deref(),
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            },
        )
    }

    fn update_item(&self, ctx: &OperationContext<'_>, item: &BillItem) -> RepoResult<BillItemId> {
        item.validate()?;
        let id = item.id.ok_or(ValidationError::MissingId("bill item"))?;

        dispatch(
            self.store,
            ctx,
            EntityKind::BillItem,
            "update",
            Access::Write,
            |conn| {
                let changed = conn.execute(
                    "UPDATE bill_items
                     SET
                        user_id = ?1,
                        category_id = ?2,
                        bill_type = ?3,
                        bill_date = ?4,
                        amount = ?5,
                        description = ?6,
                        updated_at = (strftime('%s', 'now') * 1000)
                     WHERE id = ?7;",
                    params![
                        item.user_id,
                        item.category_id,
                        item.bill_type.as_str(),
                        item.bill_date,
                        item.amount,
                        item.description.as_deref(),
                        id,
                    ],
                )?;

                if changed == 0 {
                    return Err(RepoError::NotFound {
                        entity: EntityKind::BillItem,
                        id,
                    });
                }
                Ok(id)
            },
        )
    }

    fn delete_item(&self, ctx: &OperationContext<'_>, id: BillItemId) -> RepoResult<usize> {
        dispatch(
            self.store,
            ctx,
            EntityKind::BillItem,
            "delete",
            Access::Write,
            |conn| Ok(conn.execute("DELETE FROM bill_items WHERE id = ?1;", [id])?),
        )
    }

    fn load_item(
        &self,
        ctx: &OperationContext<'_>,
        id: BillItemId,
        primary: bool,
    ) -> RepoResult<Option<BillItem>> {
        dispatch(
            self.store,
            ctx,
            EntityKind::BillItem,
            "load",
            Access::Read { primary },
            |conn| {
                let mut items = query_items(
                    conn,
                    &format!("{BILL_ITEM_SELECT_SQL} WHERE id = ?;"),
                    vec![Value::Integer(id)],
                )?;
                Ok(items.pop())
            },
        )
    }

    fn list_items(
        &self,
        ctx: &OperationContext<'_>,
        query: &BillItemListQuery,
        primary: bool,
    ) -> RepoResult<Vec<BillItem>> {
        let (sql, bind_values) = build_list_sql(query);

        dispatch(
            self.store,
            ctx,
            EntityKind::BillItem,
            "list",
            Access::Read { primary },
            |conn| query_items(conn, &sql, bind_values),
        )
    }

    fn latest_item(
        &self,
        ctx: &OperationContext<'_>,
        user_id: UserId,
        bill_type: BillType,
        primary: bool,
    ) -> RepoResult<Option<BillItem>> {
        let query = BillItemListQuery {
            limit: Some(1),
            ..BillItemListQuery::for_user(user_id, bill_type)
        };
        let (sql, bind_values) = build_list_sql(&query);

        dispatch(
            self.store,
            ctx,
            EntityKind::BillItem,
            "latest",
            Access::Read { primary },
            |conn| Ok(query_items(conn, &sql, bind_values)?.into_iter().next()),
        )
    }
}

fn build_list_sql(query: &BillItemListQuery) -> (String, Vec<Value>) {
    let mut sql = format!("{BILL_ITEM_SELECT_SQL} WHERE 1 = 1");
    let mut bind_values: Vec<Value> = Vec::new();

    if let Some(user_id) = query.user_id {
        sql.push_str(" AND user_id = ?");
        bind_values.push(Value::Integer(user_id));
    }
    if let Some(category_id) = query.category_id {
        sql.push_str(" AND category_id = ?");
        bind_values.push(Value::Integer(category_id));
    }
    if let Some(start_date) = query.start_date {
        sql.push_str(" AND bill_date >= ?");
        bind_values.push(Value::Integer(start_date));
    }
    if let Some(end_date) = query.end_date {
        sql.push_str(" AND bill_date <= ?");
        bind_values.push(Value::Integer(end_date));
    }
    if let Some(bill_type) = query.bill_type {
        sql.push_str(" AND bill_type = ?");
        bind_values.push(Value::Text(bill_type.as_str().to_string()));
    }

    sql.push_str(" ORDER BY bill_date DESC, id DESC");

    if let Some(limit) = query.limit {
        sql.push_str(" LIMIT ?");
        bind_values.push(Value::Integer(i64::from(limit)));
    }

    (sql, bind_values)
}

fn query_items(conn: &Connection, sql: &str, bind_values: Vec<Value>) -> RepoResult<Vec<BillItem>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut items = Vec::new();

    while let Some(row) = rows.next()? {
        items.push(parse_bill_item_row(row)?);
    }

    Ok(items)
}

fn parse_bill_item_row(row: &Row<'_>) -> RepoResult<BillItem> {
    let type_text: String = row.get("bill_type")?;
    let bill_type = type_text.parse::<BillType>().map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid bill type `{type_text}` in bill_items.bill_type"
        ))
    })?;

    Ok(BillItem {
        id: Some(row.get("id")?),
        user_id: row.get("user_id")?,
        category_id: row.get("category_id")?,
        bill_type,
        bill_date: row.get("bill_date")?,
        amount: row.get("amount")?,
        description: row.get("description")?,
    })
}
