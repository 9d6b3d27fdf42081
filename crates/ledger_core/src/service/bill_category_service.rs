//! Bill category use-case service.

use crate::model::bill_category::{BillCategory, CategoryId};
use crate::repo::bill_category_repo::{BillCategoryRepository, CategoryListQuery};
use crate::repo::{EntityKind, RepoError, RepoResult};
use crate::routing::OperationContext;

/// Use-case service wrapper for bill categories.
pub struct BillCategoryService<R: BillCategoryRepository> {
    repo: R,
}

impl<R: BillCategoryRepository> BillCategoryService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create_category(
        &self,
        name: impl Into<String>,
        description: Option<String>,
    ) -> RepoResult<CategoryId> {
        let category = BillCategory {
            description,
            ..BillCategory::new(name)
        };
        self.repo.create_category(&OperationContext::new(), &category)
    }

    /// Renames an existing category. Color and sort order are kept.
    pub fn update_category(
        &self,
        id: CategoryId,
        name: impl Into<String>,
        description: Option<String>,
    ) -> RepoResult<CategoryId> {
        let ctx = OperationContext::new();
        let mut category = self
            .repo
            .load_category(&ctx, id, true)?
            .ok_or(RepoError::NotFound {
                entity: EntityKind::BillCategory,
                id,
            })?;
        category.name = name.into();
        category.description = description;
        self.repo.update_category(&ctx, &category)
    }

    pub fn delete_category(&self, id: CategoryId) -> RepoResult<CategoryId> {
        match self.repo.delete_category(&OperationContext::new(), id)? {
            0 => Err(RepoError::NotFound {
                entity: EntityKind::BillCategory,
                id,
            }),
            _ => Ok(id),
        }
    }

    pub fn load_category(&self, id: CategoryId) -> RepoResult<Option<BillCategory>> {
        self.repo.load_category(&OperationContext::new(), id, false)
    }

    pub fn list_categories(&self, query: &CategoryListQuery) -> RepoResult<Vec<BillCategory>> {
        self.repo
            .list_categories(&OperationContext::new(), query, false)
    }
}
