//! Bill category repository contract and SQLite implementation.

use super::{dispatch, Access, EntityKind, RepoError, RepoResult};
use crate::db::ReplicatedStore;
use crate::model::bill_category::{BillCategory, CategoryId};
use crate::model::ValidationError;
use crate::routing::OperationContext;
use rusqlite::{params, OptionalExtension, Row};

const CATEGORY_SELECT_SQL: &str = "SELECT
    id,
    name,
    description,
    color,
    sort_order
FROM bill_categories";

/// Filter for listing categories. `name` is a SQL `LIKE` pattern.
#[derive(Debug, Clone, Default)]
pub struct CategoryListQuery {
    pub name: Option<String>,
}

/// Repository interface for bill category persistence.
pub trait BillCategoryRepository {
    fn create_category(
        &self,
        ctx: &OperationContext<'_>,
        category: &BillCategory,
    ) -> RepoResult<CategoryId>;
    fn update_category(
        &self,
        ctx: &OperationContext<'_>,
        category: &BillCategory,
    ) -> RepoResult<CategoryId>;
    fn delete_category(&self, ctx: &OperationContext<'_>, id: CategoryId) -> RepoResult<usize>;
    fn load_category(
        &self,
        ctx: &OperationContext<'_>,
        id: CategoryId,
        primary: bool,
    ) -> RepoResult<Option<BillCategory>>;
    fn list_categories(
        &self,
        ctx: &OperationContext<'_>,
        query: &CategoryListQuery,
        primary: bool,
    ) -> RepoResult<Vec<BillCategory>>;
}

/// SQLite-backed bill category repository.
pub struct SqliteBillCategoryRepository<'store> {
    store: &'store ReplicatedStore,
}

impl<'store> SqliteBillCategoryRepository<'store> {
    pub fn new(store: &'store ReplicatedStore) -> Self {
        Self { store }
    }
}

impl BillCategoryRepository for SqliteBillCategoryRepository<'_> {
    fn create_category(
        &self,
        ctx: &OperationContext<'_>,
        category: &BillCategory,
    ) -> RepoResult<CategoryId> {
        category.validate()?;

        dispatch(
            self.store,
            ctx,
            EntityKind::BillCategory,
            "create",
            Access::Write,
            |conn| {
                conn.execute(
                    "INSERT INTO bill_categories (name, description, color, sort_order)
                     VALUES (?1, ?2, ?3, ?4);",
                    params![
                        category.name.as_str(),
                        category.description.as_deref(),
                        category.color.as_deref(),
                        category.sort_order,
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            },
        )
    }

    fn update_category(
        &self,
        ctx: &OperationContext<'_>,
        category: &BillCategory,
    ) -> RepoResult<CategoryId> {
        category.validate()?;
        let id = category
            .id
            .ok_or(ValidationError::MissingId("bill category"))?;

        dispatch(
            self.store,
            ctx,
            EntityKind::BillCategory,
            "update",
            Access::Write,
            |conn| {
                let changed = conn.execute(
                    "UPDATE bill_categories
                     SET
                        name = ?1,
                        description = ?2,
                        color = ?3,
                        sort_order = ?4,
                        updated_at = (strftime('%s', 'now') * 1000)
                     WHERE id = ?5;",
                    params![
                        category.name.as_str(),
                        category.description.as_deref(),
                        category.color.as_deref(),
                        category.sort_order,
                        id,
                    ],
                )?;

                if changed == 0 {
                    return Err(RepoError::NotFound {
                        entity: EntityKind::BillCategory,
                        id,
                    });
                }
                Ok(id)
            },
        )
    }

    fn delete_category(&self, ctx: &OperationContext<'_>, id: CategoryId) -> RepoResult<usize> {
        dispatch(
            self.store,
            ctx,
            EntityKind::BillCategory,
            "delete",
            Access::Write,
            |conn| Ok(conn.execute("DELETE FROM bill_categories WHERE id = ?1;", [id])?),
        )
    }

    fn load_category(
        &self,
        ctx: &OperationContext<'_>,
        id: CategoryId,
        primary: bool,
    ) -> RepoResult<Option<BillCategory>> {
        dispatch(
            self.store,
            ctx,
            EntityKind::BillCategory,
            "load",
            Access::Read { primary },
            |conn| {
                Ok(conn
                    .query_row(
                        &format!("{CATEGORY_SELECT_SQL} WHERE id = ?1;"),
                        [id],
                        parse_category_row,
                    )
                    .optional()?)
            },
        )
    }

    fn list_categories(
        &self,
        ctx: &OperationContext<'_>,
        query: &CategoryListQuery,
        primary: bool,
    ) -> RepoResult<Vec<BillCategory>> {
        dispatch(
            self.store,
            ctx,
            EntityKind::BillCategory,
            "list",
            Access::Read { primary },
            |conn| {
                let mut stmt = conn.prepare(&format!(
                    "{CATEGORY_SELECT_SQL}
                     WHERE (?1 IS NULL OR name LIKE ?1)
                     ORDER BY sort_order ASC, id ASC;"
                ))?;
                let categories = stmt
                    .query_map([query.name.as_deref()], parse_category_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(categories)
            },
        )
    }
}

fn parse_category_row(row: &Row<'_>) -> rusqlite::Result<BillCategory> {
    Ok(BillCategory {
        id: Some(row.get("id")?),
        name: row.get("name")?,
        description: row.get("description")?,
        color: row.get("color")?,
        sort_order: row.get("sort_order")?,
    })
}
