//! Primary/replica storage pair.
//!
//! # Responsibility
//! - Hold one connection per storage target and dispatch commands to them.
//! - Open, commit and roll back transactions against the primary.
//! - Refresh the replica from a primary snapshot on demand.
//!
//! # Invariants
//! - A `TransactionHandle` owns the primary connection exclusively until it is
//!   committed, rolled back or dropped. Dropping an unfinished handle rolls back.
//! - The replica only changes through `sync_replica`, so it lags the primary
//!   between syncs.
//! - Lock order is always primary before replica.

use super::open::{open_connection, DEFAULT_BUSY_TIMEOUT};
use super::{DbError, DbResult};
use crate::config::StoreConfig;
use crate::routing::RoutingDecision;
use log::{error, info, warn};
use rusqlite::backup::Backup;
use rusqlite::Connection;
use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use uuid::Uuid;

const SYNC_PAGES_PER_STEP: i32 = 256;

/// Storage collaborator with two addressable targets.
pub struct ReplicatedStore {
    primary: Mutex<Connection>,
    replica: Mutex<Connection>,
    primary_dispatches: AtomicU64,
    replica_dispatches: AtomicU64,
}

impl ReplicatedStore {
    /// Opens both targets as described by `config`.
    ///
    /// A target without a path is opened as a private in-memory database.
    pub fn open(config: &StoreConfig) -> DbResult<Self> {
        let busy_timeout = Duration::from_millis(config.busy_timeout_ms);
        let primary = open_connection(config.primary_path.as_deref(), "primary", busy_timeout)?;
        let replica = open_connection(config.replica_path.as_deref(), "replica", busy_timeout)?;
        Ok(Self::from_connections(primary, replica))
    }

    /// Opens an in-memory primary and an in-memory replica.
    pub fn open_in_memory() -> DbResult<Self> {
        let primary = open_connection(None, "primary", DEFAULT_BUSY_TIMEOUT)?;
        let replica = open_connection(None, "replica", DEFAULT_BUSY_TIMEOUT)?;
        Ok(Self::from_connections(primary, replica))
    }

    fn from_connections(primary: Connection, replica: Connection) -> Self {
        Self {
            primary: Mutex::new(primary),
            replica: Mutex::new(replica),
            primary_dispatches: AtomicU64::new(0),
            replica_dispatches: AtomicU64::new(0),
        }
    }

    /// Runs one command against `target`.
    ///
    /// When `transaction` is provided and the target is primary, the command
    /// runs on the transaction's connection. Calling this with
    /// `transaction = None` for the primary while the same thread holds an
    /// open handle blocks forever; callers inside a transaction must pass it.
    pub fn execute<T, E, F>(
        &self,
        target: RoutingDecision,
        transaction: Option<&TransactionHandle<'_>>,
        command: F,
    ) -> Result<T, E>
    where
        F: FnOnce(&Connection) -> Result<T, E>,
    {
        self.dispatch_counter(target).fetch_add(1, Ordering::Relaxed);
        match (target, transaction) {
            (RoutingDecision::Primary, Some(handle)) => command(&*handle.conn),
            _ => {
                let conn = self.lock(target);
                command(&*conn)
            }
        }
    }

    /// Opens a transaction against `target`.
    ///
    /// # Errors
    /// - `DbError::TransactionOnReplica` for the replica target.
    /// - `DbError::Sqlite` when `BEGIN IMMEDIATE` fails.
    pub fn begin_transaction(&self, target: RoutingDecision) -> DbResult<TransactionHandle<'_>> {
        if target == RoutingDecision::Replica {
            return Err(DbError::TransactionOnReplica);
        }

        let conn = self.lock(RoutingDecision::Primary);
        conn.execute_batch("BEGIN IMMEDIATE;")?;

        let handle = TransactionHandle {
            id: Uuid::new_v4(),
            conn,
            started_at: Instant::now(),
            finished: false,
            rollback_only: Cell::new(false),
        };
        info!(
            "event=tx_begin module=db status=ok tx_id={} target=primary",
            handle.id
        );
        Ok(handle)
    }

    /// Commits and consumes the handle.
    pub fn commit(&self, handle: TransactionHandle<'_>) -> DbResult<()> {
        handle.finish(Finish::Commit)
    }

    /// Rolls back and consumes the handle.
    pub fn rollback(&self, handle: TransactionHandle<'_>) -> DbResult<()> {
        handle.finish(Finish::Rollback)
    }

    /// Copies the committed primary state onto the replica.
    ///
    /// Blocks while a transaction is open on the primary.
    pub fn sync_replica(&self) -> DbResult<()> {
        let started_at = Instant::now();
        let primary = self.lock(RoutingDecision::Primary);
        let mut replica = self.lock(RoutingDecision::Replica);

        let result = Backup::new(&*primary, &mut *replica)
            .and_then(|backup| backup.run_to_completion(SYNC_PAGES_PER_STEP, Duration::ZERO, None));

        match result {
            Ok(()) => {
                info!(
                    "event=replica_sync module=db status=ok duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=replica_sync module=db status=error duration_ms={} error_code=backup_failed error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err.into())
            }
        }
    }

    /// Number of commands dispatched to `target` since the store was opened.
    pub fn dispatch_count(&self, target: RoutingDecision) -> u64 {
        self.dispatch_counter(target).load(Ordering::Relaxed)
    }

    fn dispatch_counter(&self, target: RoutingDecision) -> &AtomicU64 {
        match target {
            RoutingDecision::Primary => &self.primary_dispatches,
            RoutingDecision::Replica => &self.replica_dispatches,
        }
    }

    fn lock(&self, target: RoutingDecision) -> MutexGuard<'_, Connection> {
        let mutex = match target {
            RoutingDecision::Primary => &self.primary,
            RoutingDecision::Replica => &self.replica,
        };
        // A panicking transaction rolls back in `TransactionHandle::drop` before
        // its guard is released, so a poisoned connection holds no open work.
        mutex.lock().unwrap_or_else(|poisoned| {
            warn!("event=store_lock module=db status=recovered target={target}");
            poisoned.into_inner()
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum Finish {
    Commit,
    Rollback,
}

impl Finish {
    fn sql(self) -> &'static str {
        match self {
            Self::Commit => "COMMIT;",
            Self::Rollback => "ROLLBACK;",
        }
    }

    fn event(self) -> &'static str {
        match self {
            Self::Commit => "tx_commit",
            Self::Rollback => "tx_rollback",
        }
    }
}

/// Open transaction against the primary store.
///
/// Only the store can finish a handle; it is consumed by either path, so one
/// handle sees exactly one commit or rollback.
pub struct TransactionHandle<'store> {
    id: Uuid,
    conn: MutexGuard<'store, Connection>,
    started_at: Instant,
    finished: bool,
    rollback_only: Cell<bool>,
}

impl TransactionHandle<'_> {
    pub(crate) fn id(&self) -> Uuid {
        self.id
    }

    /// Marks the transaction so the owner rolls back instead of committing.
    pub(crate) fn mark_rollback_only(&self) {
        self.rollback_only.set(true);
    }

    pub(crate) fn is_rollback_only(&self) -> bool {
        self.rollback_only.get()
    }

    fn finish(mut self, finish: Finish) -> DbResult<()> {
        match self.conn.execute_batch(finish.sql()) {
            Ok(()) => {
                self.finished = true;
                info!(
                    "event={} module=db status=ok tx_id={} duration_ms={}",
                    finish.event(),
                    self.id,
                    self.started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                // Drop retries the rollback if the statement left the transaction open.
                error!(
                    "event={} module=db status=error tx_id={} duration_ms={} error={}",
                    finish.event(),
                    self.id,
                    self.started_at.elapsed().as_millis(),
                    err
                );
                Err(err.into())
            }
        }
    }
}

impl Drop for TransactionHandle<'_> {
    fn drop(&mut self) {
        if self.finished || self.conn.is_autocommit() {
            return;
        }

        warn!(
            "event=tx_abandoned module=db status=rollback tx_id={} duration_ms={}",
            self.id,
            self.started_at.elapsed().as_millis()
        );
        if let Err(err) = self.conn.execute_batch("ROLLBACK;") {
            error!(
                "event=tx_abandoned module=db status=error tx_id={} error={}",
                self.id, err
            );
        }
    }
}
