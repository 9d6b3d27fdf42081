//! User repository contract and SQLite implementation.
//!
//! # Invariants
//! - Write paths call `User::validate()` before dispatch.
//! - `update_user` with zero affected rows is `NotFound`, never an upsert.

use super::{dispatch, Access, EntityKind, RepoError, RepoResult};
use crate::db::ReplicatedStore;
use crate::model::user::{User, UserId};
use crate::model::ValidationError;
use crate::routing::OperationContext;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};

const USER_SELECT_SQL: &str = "SELECT
    id,
    username,
    nickname,
    password,
    last_login_time,
    last_bill_time
FROM users";

/// Filter for listing users. Both fields are SQL `LIKE` patterns.
#[derive(Debug, Clone, Default)]
pub struct UserListQuery {
    pub username: Option<String>,
    pub nickname: Option<String>,
}

/// Repository interface for user persistence.
pub trait UserRepository {
    fn create_user(&self, ctx: &OperationContext<'_>, user: &User) -> RepoResult<UserId>;
    fn update_user(&self, ctx: &OperationContext<'_>, user: &User) -> RepoResult<UserId>;
    fn delete_user(&self, ctx: &OperationContext<'_>, id: UserId) -> RepoResult<usize>;
    fn load_user(
        &self,
        ctx: &OperationContext<'_>,
        id: UserId,
        primary: bool,
    ) -> RepoResult<Option<User>>;
    fn list_users(
        &self,
        ctx: &OperationContext<'_>,
        query: &UserListQuery,
        primary: bool,
    ) -> RepoResult<Vec<User>>;
}

/// SQLite-backed user repository over the primary/replica pair.
pub struct SqliteUserRepository<'store> {
    store: &'store ReplicatedStore,
}

impl<'store> SqliteUserRepository<'store> {
    pub fn new(store: &'store ReplicatedStore) -> Self {
        Self { store }
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, ctx: &OperationContext<'_>, user: &User) -> RepoResult<UserId> {
        user.validate()?;

        dispatch(self.store, ctx, EntityKind::User, "create", Access::Write, |conn| {
            conn.execute(
                "INSERT INTO users (
                    username,
                    nickname,
                    password,
                    last_login_time,
                    last_bill_time
                ) VALUES (?1, ?2, ?3, ?4, ?5);",
                params![
                    user.username.as_str(),
                    user.nickname.as_deref(),
                    user.password.as_deref(),
                    user.last_login_time,
                    user.last_bill_time,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    fn update_user(&self, ctx: &OperationContext<'_>, user: &User) -> RepoResult<UserId> {
        user.validate()?;
        let id = user.id.ok_or(ValidationError::MissingId("user"))?;

        dispatch(self.store, ctx, EntityKind::User, "update", Access::Write, |conn| {
            let changed = conn.execute(
                "UPDATE users
                 SET
                    username = ?1,
                    nickname = ?2,
                    password = ?3,
                    last_login_time = ?4,
                    last_bill_time = ?5,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?6;",
                params![
                    user.username.as_str(),
                    user.nickname.as_deref(),
                    user.password.as_deref(),
                    user.last_login_time,
                    user.last_bill_time,
                    id,
                ],
            )?;

            if changed == 0 {
                return Err(RepoError::NotFound {
                    entity: EntityKind::User,
                    id,
                });
            }
            Ok(id)
        })
    }

    fn delete_user(&self, ctx: &OperationContext<'_>, id: UserId) -> RepoResult<usize> {
        dispatch(self.store, ctx, EntityKind::User, "delete", Access::Write, |conn| {
            Ok(conn.execute("DELETE FROM users WHERE id = ?1;", [id])?)
        })
    }

    fn load_user(
        &self,
        ctx: &OperationContext<'_>,
        id: UserId,
        primary: bool,
    ) -> RepoResult<Option<User>> {
        dispatch(
            self.store,
            ctx,
            EntityKind::User,
            "load",
            Access::Read { primary },
            |conn| {
                let user = conn
                    .query_row(
                        &format!("{USER_SELECT_SQL} WHERE id = ?1;"),
                        [id],
                        parse_user_row,
                    )
                    .optional()?;
                Ok(user)
            },
        )
    }

    fn list_users(
        &self,
        ctx: &OperationContext<'_>,
        query: &UserListQuery,
        primary: bool,
    ) -> RepoResult<Vec<User>> {
        let mut sql = format!("{USER_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(username) = &query.username {
            sql.push_str(" AND username LIKE ?");
            bind_values.push(Value::Text(username.clone()));
        }
        if let Some(nickname) = &query.nickname {
            sql.push_str(" AND nickname LIKE ?");
            bind_values.push(Value::Text(nickname.clone()));
        }
        sql.push_str(" ORDER BY id ASC");

        dispatch(
            self.store,
            ctx,
            EntityKind::User,
            "list",
            Access::Read { primary },
            |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let users = stmt
                    .query_map(params_from_iter(bind_values), parse_user_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(users)
            },
        )
    }
}

fn parse_user_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: Some(row.get("id")?),
        username: row.get("username")?,
        nickname: row.get("nickname")?,
        password: row.get("password")?,
        last_login_time: row.get("last_login_time")?,
        last_bill_time: row.get("last_bill_time")?,
    })
}
