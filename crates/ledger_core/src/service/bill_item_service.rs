//! Bill item use-case service.
//!
//! Single-row CRUD outside of any transaction. Recording a bill together
//! with its user bookkeeping belongs to `BillingWorkflow`.

use crate::model::bill_item::{BillItem, BillItemId};
use crate::repo::bill_item_repo::{BillItemListQuery, BillItemRepository};
use crate::repo::{EntityKind, RepoError, RepoResult};
use crate::routing::OperationContext;

/// Use-case service wrapper for bill items.
pub struct BillItemService<R: BillItemRepository> {
    repo: R,
}

impl<R: BillItemRepository> BillItemService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a standalone item. `item.id` is ignored.
    pub fn create_item(&self, item: &BillItem) -> RepoResult<BillItemId> {
        self.repo.create_item(&OperationContext::new(), item)
    }

    /// Replaces every field of item `id` with the fields of `changes`.
    pub fn update_item(&self, id: BillItemId, changes: &BillItem) -> RepoResult<BillItemId> {
        let ctx = OperationContext::new();
        if self.repo.load_item(&ctx, id, true)?.is_none() {
            return Err(RepoError::NotFound {
                entity: EntityKind::BillItem,
                id,
            });
        }
        let item = BillItem {
            id: Some(id),
            ..changes.clone()
        };
        self.repo.update_item(&ctx, &item)
    }

    pub fn delete_item(&self, id: BillItemId) -> RepoResult<BillItemId> {
        match self.repo.delete_item(&OperationContext::new(), id)? {
            0 => Err(RepoError::NotFound {
                entity: EntityKind::BillItem,
                id,
            }),
            _ => Ok(id),
        }
    }

    pub fn load_item(&self, id: BillItemId) -> RepoResult<Option<BillItem>> {
        self.repo.load_item(&OperationContext::new(), id, false)
    }

    pub fn list_items(&self, query: &BillItemListQuery) -> RepoResult<Vec<BillItem>> {
        self.repo.list_items(&OperationContext::new(), query, false)
    }
}
