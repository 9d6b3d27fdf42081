//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define one capability trait per entity (create/update/delete/load/list).
//! - Pick the physical target of every call from the operation's routing
//!   context, and clear the decision when the call ends.
//!
//! # Invariants
//! - Writes always route to primary.
//! - Reads route to replica unless the caller asks for primary, or the
//!   operation runs under a transaction (primary pin).
//! - Repository writes validate records before any storage dispatch.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod bill_category_repo;
pub mod bill_item_repo;
pub mod user_repo;

use crate::db::{DbError, ReplicatedStore};
use crate::model::ValidationError;
use crate::routing::{OperationContext, RoutingDecision};
use log::{debug, error, info};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Entity addressed by a repository call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    User,
    BillCategory,
    BillItem,
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::BillCategory => write!(f, "bill category"),
            Self::BillItem => write!(f, "bill item"),
        }
    }
}

/// Repository error shared by all entity repositories.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    NotFound { entity: EntityKind, id: i64 },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound { .. } => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Access intent of one repository call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Access {
    Write,
    Read { primary: bool },
}

impl Access {
    fn requested(self) -> RoutingDecision {
        match self {
            Self::Write | Self::Read { primary: true } => RoutingDecision::Primary,
            Self::Read { primary: false } => RoutingDecision::Replica,
        }
    }
}

/// Routes one repository command and releases the decision afterwards.
///
/// The routing scope lives exactly as long as the storage call, so the
/// decision is cleared on success, on error and on unwind.
pub(crate) fn dispatch<T, F>(
    store: &ReplicatedStore,
    ctx: &OperationContext<'_>,
    entity: EntityKind,
    op: &'static str,
    access: Access,
    command: F,
) -> RepoResult<T>
where
    F: FnOnce(&Connection) -> RepoResult<T>,
{
    let requested = access.requested();
    let scope = ctx.routing().route(requested);
    let target = scope.target();
    debug!(
        "event=repo_dispatch module=repo entity={entity} op={op} op_id={} requested={requested} target={target} in_tx={}",
        ctx.id(),
        ctx.in_transaction_scope()
    );

    let result = store.execute(target, ctx.transaction(), command);
    match &result {
        Ok(_) => {}
        Err(RepoError::NotFound { id, .. }) => info!(
            "event=repo_dispatch module=repo status=not_found entity={entity} op={op} op_id={} id={id}",
            ctx.id()
        ),
        Err(err) => error!(
            "event=repo_dispatch module=repo status=error entity={entity} op={op} op_id={} target={target} error={err}",
            ctx.id()
        ),
    }
    result
}
