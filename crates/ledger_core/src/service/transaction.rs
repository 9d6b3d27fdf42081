//! Transaction coordinator.
//!
//! # Responsibility
//! - Run a closure of repository calls as one atomic unit on the primary.
//! - Pin primary routing for everything the closure does.
//!
//! # Invariants
//! - Exactly one of commit/rollback runs per begun transaction.
//! - `Err` from the closure always rolls back before it is returned.
//! - Routing state of the transaction's context is released on every exit
//!   path; a panic unwinds through the same guards and the handle's drop
//!   rolls back.
//! - A joined run that fails marks the outer transaction rollback-only.

use crate::db::{DbError, ReplicatedStore, TransactionHandle};
use crate::routing::{OperationContext, RoutingDecision};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;
use uuid::Uuid;

/// Failure of a coordinated transaction.
#[derive(Debug)]
pub enum TransactionError<E> {
    /// The primary refused to open a transaction; nothing ran.
    Begin(DbError),
    /// The operation failed and every write it made was rolled back.
    Aborted { operation_id: Uuid, cause: E },
    /// The operation succeeded but the commit failed; the handle rolled back.
    Commit(DbError),
    /// A joined inner run failed and the outer closure still returned `Ok`.
    RollbackOnly { operation_id: Uuid },
}

impl<E> TransactionError<E> {
    /// The operation's own error, when the failure came from the closure.
    pub fn cause(&self) -> Option<&E> {
        match self {
            Self::Aborted { cause, .. } => Some(cause),
            _ => None,
        }
    }

    pub fn into_cause(self) -> Option<E> {
        match self {
            Self::Aborted { cause, .. } => Some(cause),
            _ => None,
        }
    }
}

impl<E: Display> Display for TransactionError<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Begin(err) => write!(f, "failed to begin transaction: {err}"),
            Self::Aborted {
                operation_id,
                cause,
            } => write!(f, "transaction {operation_id} rolled back: {cause}"),
            Self::Commit(err) => write!(f, "failed to commit transaction: {err}"),
            Self::RollbackOnly { operation_id } => write!(
                f,
                "transaction {operation_id} rolled back: a joined operation failed"
            ),
        }
    }
}

impl<E: Error + 'static> Error for TransactionError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Begin(err) => Some(err),
            Self::Aborted { cause, .. } => Some(cause),
            Self::Commit(err) => Some(err),
            Self::RollbackOnly { .. } => None,
        }
    }
}

/// Wraps repository calls in primary transactions.
#[derive(Clone, Copy)]
pub struct TransactionCoordinator<'store> {
    store: &'store ReplicatedStore,
}

impl<'store> TransactionCoordinator<'store> {
    pub fn new(store: &'store ReplicatedStore) -> Self {
        Self { store }
    }

    /// Runs `operation` in a new transaction with its own operation context.
    pub fn run<T, E, F>(&self, operation: F) -> Result<T, TransactionError<E>>
    where
        E: Display,
        F: FnOnce(&OperationContext<'_>) -> Result<T, E>,
    {
        self.run_within(&OperationContext::new(), operation)
    }

    /// Runs `operation` on behalf of `ctx`.
    ///
    /// Joins the transaction already attached to `ctx`, or begins a new one
    /// that reuses `ctx`'s operation id for log correlation.
    ///
    /// Repository calls inside `operation` must use the context it receives.
    /// A fresh `OperationContext` has no handle and blocks on the primary.
    pub fn run_within<T, E, F>(
        &self,
        ctx: &OperationContext<'_>,
        operation: F,
    ) -> Result<T, TransactionError<E>>
    where
        E: Display,
        F: FnOnce(&OperationContext<'_>) -> Result<T, E>,
    {
        if let Some(handle) = ctx.transaction() {
            return join(ctx, handle, operation);
        }

        let operation_id = ctx.id();
        let started_at = Instant::now();
        let handle = self
            .store
            .begin_transaction(RoutingDecision::Primary)
            .map_err(|err| {
                error!(
                    "event=tx_run module=service status=error op_id={operation_id} error_code=begin_failed error={err}"
                );
                TransactionError::Begin(err)
            })?;
        info!(
            "event=tx_run module=service status=start op_id={operation_id} tx_id={}",
            handle.id()
        );

        let outcome = {
            let tx_ctx = OperationContext::in_transaction(operation_id, &handle);
            let _pin = tx_ctx.routing().pin_primary();
            operation(&tx_ctx)
        };

        match outcome {
            Ok(_) if handle.is_rollback_only() => {
                self.rollback_logged(handle, operation_id);
                warn!(
                    "event=tx_run module=service status=rollback_only op_id={operation_id} duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                Err(TransactionError::RollbackOnly { operation_id })
            }
            Ok(value) => {
                self.store.commit(handle).map_err(TransactionError::Commit)?;
                info!(
                    "event=tx_run module=service status=ok op_id={operation_id} duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                Ok(value)
            }
            Err(cause) => {
                self.rollback_logged(handle, operation_id);
                warn!(
                    "event=tx_run module=service status=rollback op_id={operation_id} duration_ms={} error={cause}",
                    started_at.elapsed().as_millis()
                );
                Err(TransactionError::Aborted {
                    operation_id,
                    cause,
                })
            }
        }
    }

    fn rollback_logged(&self, handle: TransactionHandle<'_>, operation_id: Uuid) {
        if let Err(err) = self.store.rollback(handle) {
            error!(
                "event=tx_run module=service status=error op_id={operation_id} error_code=rollback_failed error={err}"
            );
        }
    }
}

fn join<T, E, F>(
    ctx: &OperationContext<'_>,
    handle: &TransactionHandle<'_>,
    operation: F,
) -> Result<T, TransactionError<E>>
where
    E: Display,
    F: FnOnce(&OperationContext<'_>) -> Result<T, E>,
{
    let _pin = ctx.routing().pin_primary();
    operation(ctx).map_err(|cause| {
        handle.mark_rollback_only();
        warn!(
            "event=tx_join module=service status=rollback_only op_id={} tx_id={} error={cause}",
            ctx.id(),
            handle.id()
        );
        TransactionError::Aborted {
            operation_id: ctx.id(),
            cause,
        }
    })
}
