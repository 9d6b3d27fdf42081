//! User use-case service.
//!
//! # Responsibility
//! - Provide create/update/delete/load/list entry points for users.
//! - Treat every call as one logical operation with its own routing context.
//!
//! # Invariants
//! - Updates read the current row from primary before writing it back.
//! - Deleting an unknown id is `NotFound`, not a silent no-op.

use crate::model::user::{User, UserId};
use crate::repo::user_repo::{UserListQuery, UserRepository};
use crate::repo::{EntityKind, RepoError, RepoResult};
use crate::routing::OperationContext;

/// Use-case service wrapper for user persistence.
pub struct UserService<R: UserRepository> {
    repo: R,
}

impl<R: UserRepository> UserService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create_user(
        &self,
        username: impl Into<String>,
        nickname: Option<String>,
        password: Option<String>,
    ) -> RepoResult<UserId> {
        let user = User {
            nickname,
            password,
            ..User::new(username)
        };
        self.repo.create_user(&OperationContext::new(), &user)
    }

    /// Overwrites the profile fields of an existing user.
    ///
    /// Bill and login timestamps are kept as stored.
    pub fn update_user(
        &self,
        id: UserId,
        username: impl Into<String>,
        nickname: Option<String>,
        password: Option<String>,
    ) -> RepoResult<UserId> {
        let ctx = OperationContext::new();
        let mut user = self
            .repo
            .load_user(&ctx, id, true)?
            .ok_or(RepoError::NotFound {
                entity: EntityKind::User,
                id,
            })?;
        user.username = username.into();
        user.nickname = nickname;
        user.password = password;
        self.repo.update_user(&ctx, &user)
    }

    /// Stamps the user's last login time.
    pub fn record_login(&self, id: UserId, login_time: i64) -> RepoResult<UserId> {
        let ctx = OperationContext::new();
        let mut user = self
            .repo
            .load_user(&ctx, id, true)?
            .ok_or(RepoError::NotFound {
                entity: EntityKind::User,
                id,
            })?;
        user.last_login_time = Some(login_time);
        self.repo.update_user(&ctx, &user)
    }

    pub fn delete_user(&self, id: UserId) -> RepoResult<UserId> {
        match self.repo.delete_user(&OperationContext::new(), id)? {
            0 => Err(RepoError::NotFound {
                entity: EntityKind::User,
                id,
            }),
            _ => Ok(id),
        }
    }

    /// Loads one user from the replica.
    pub fn load_user(&self, id: UserId) -> RepoResult<Option<User>> {
        self.repo.load_user(&OperationContext::new(), id, false)
    }

    pub fn list_users(&self, query: &UserListQuery) -> RepoResult<Vec<User>> {
        self.repo.list_users(&OperationContext::new(), query, false)
    }
}
