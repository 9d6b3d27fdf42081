//! Explicit per-operation context threaded through repository calls.

use super::context::RoutingContext;
use crate::db::TransactionHandle;
use uuid::Uuid;

/// State of one logical operation: its id, its routing decision, and the
/// transaction it runs under, if any.
///
/// Create one per inbound call and drop it when the call finishes. Reusing a
/// context across unrelated calls is what this type exists to prevent.
pub struct OperationContext<'tx> {
    id: Uuid,
    routing: RoutingContext,
    transaction: Option<&'tx TransactionHandle<'tx>>,
}

impl OperationContext<'static> {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            routing: RoutingContext::new(),
            transaction: None,
        }
    }
}

impl Default for OperationContext<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'tx> OperationContext<'tx> {
    pub(crate) fn in_transaction(id: Uuid, transaction: &'tx TransactionHandle<'tx>) -> Self {
        Self {
            id,
            routing: RoutingContext::new(),
            transaction: Some(transaction),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn routing(&self) -> &RoutingContext {
        &self.routing
    }

    pub fn in_transaction_scope(&self) -> bool {
        self.transaction.is_some()
    }

    pub(crate) fn transaction(&self) -> Option<&'tx TransactionHandle<'tx>> {
        self.transaction
    }
}
