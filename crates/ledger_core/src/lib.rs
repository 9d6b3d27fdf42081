//! Core of the personal ledger: users, bill categories and bill items stored
//! on a primary/replica SQLite pair with per-operation read/write routing.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod routing;
pub mod service;

pub use config::{ConfigError, LedgerConfig, StoreConfig};
pub use db::{DbError, ReplicatedStore};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::bill_category::{BillCategory, CategoryId};
pub use model::bill_item::{BillItem, BillItemId, BillType};
pub use model::user::{User, UserId};
pub use model::ValidationError;
pub use repo::bill_category_repo::{
    BillCategoryRepository, CategoryListQuery, SqliteBillCategoryRepository,
};
pub use repo::bill_item_repo::{BillItemListQuery, BillItemRepository, SqliteBillItemRepository};
pub use repo::user_repo::{SqliteUserRepository, UserListQuery, UserRepository};
pub use repo::{EntityKind, RepoError, RepoResult};
pub use routing::{OperationContext, RoutingContext, RoutingDecision, RoutingScope};
pub use service::bill_category_service::BillCategoryService;
pub use service::bill_item_service::BillItemService;
pub use service::billing_workflow::{
    BillingError, BillingResult, BillingWorkflow, RecordBillRequest,
};
pub use service::transaction::{TransactionCoordinator, TransactionError};
pub use service::user_service::UserService;

/// Minimal health-check API.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
