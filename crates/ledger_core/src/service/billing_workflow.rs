//! Bill recording workflow.
//!
//! # Responsibility
//! - Record one bill item, stamp the user's last bill time and return the
//!   user's running totals, all inside one primary transaction.
//!
//! # Invariants
//! - Every read in `record_bill` sees the item written earlier in the same
//!   call, because the coordinator pins primary routing.
//! - A failure at any step leaves neither the new item nor the timestamp
//!   update behind.
//! - Request validation runs before the transaction and touches no storage.
//! - Totals are summed with overflow checks; an overflowing total aborts the
//!   run like any other failure.

use crate::db::ReplicatedStore;
use crate::model::bill_category::CategoryId;
use crate::model::bill_item::{BillItem, BillType};
use crate::model::user::UserId;
use crate::model::ValidationError;
use crate::repo::bill_item_repo::{
    BillItemListQuery, BillItemRepository, SqliteBillItemRepository,
};
use crate::repo::user_repo::{SqliteUserRepository, UserRepository};
use crate::repo::{EntityKind, RepoError};
use crate::routing::OperationContext;
use crate::service::transaction::{TransactionCoordinator, TransactionError};
use log::info;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Caller-supplied parameters of one `record_bill` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordBillRequest {
    pub user_id: UserId,
    pub category_id: CategoryId,
    pub bill_type: BillType,
    /// Unix epoch milliseconds.
    pub bill_date: i64,
    pub amount: i64,
    pub description: Option<String>,
}

impl RecordBillRequest {
    fn to_item(&self) -> BillItem {
        BillItem {
            description: self.description.clone(),
            ..BillItem::new(
                self.user_id,
                self.category_id,
                self.bill_type,
                self.bill_date,
                self.amount,
            )
        }
    }
}

/// Snapshot of a user's ledger right after a bill was recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingResult {
    user_id: UserId,
    username: String,
    total_expense: i64,
    total_income: i64,
    last_expense: Option<BillItem>,
    last_income: Option<BillItem>,
}

impl BillingResult {
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn total_expense(&self) -> i64 {
        self.total_expense
    }

    pub fn total_income(&self) -> i64 {
        self.total_income
    }

    pub fn last_expense(&self) -> Option<&BillItem> {
        self.last_expense.as_ref()
    }

    pub fn last_income(&self) -> Option<&BillItem> {
        self.last_income.as_ref()
    }
}

/// Errors from the billing workflow.
#[derive(Debug)]
pub enum BillingError {
    /// Rejected before any storage call.
    Validation(ValidationError),
    /// Failed inside the transaction; all writes were rolled back.
    Transaction(TransactionError<RepoError>),
}

impl BillingError {
    /// Repository error that aborted the transaction, if that is the cause.
    pub fn repo_cause(&self) -> Option<&RepoError> {
        match self {
            Self::Transaction(err) => err.cause(),
            Self::Validation(_) => None,
        }
    }
}

impl Display for BillingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Transaction(err) => write!(f, "failed to record bill: {err}"),
        }
    }
}

impl Error for BillingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Transaction(err) => Some(err),
        }
    }
}

impl From<ValidationError> for BillingError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<TransactionError<RepoError>> for BillingError {
    fn from(value: TransactionError<RepoError>) -> Self {
        Self::Transaction(value)
    }
}

/// Multi-step bill recording over user and bill item repositories.
pub struct BillingWorkflow<'store, U: UserRepository, B: BillItemRepository> {
    coordinator: TransactionCoordinator<'store>,
    users: U,
    items: B,
}

impl<'store> BillingWorkflow<'store, SqliteUserRepository<'store>, SqliteBillItemRepository<'store>> {
    /// Workflow over the SQLite repositories of `store`.
    pub fn sqlite(store: &'store ReplicatedStore) -> Self {
        Self::new(
            TransactionCoordinator::new(store),
            SqliteUserRepository::new(store),
            SqliteBillItemRepository::new(store),
        )
    }
}

impl<'store, U: UserRepository, B: BillItemRepository> BillingWorkflow<'store, U, B> {
    pub fn new(coordinator: TransactionCoordinator<'store>, users: U, items: B) -> Self {
        Self {
            coordinator,
            users,
            items,
        }
    }

    /// Records one bill and returns the user's updated totals.
    ///
    /// # Errors
    /// - `BillingError::Validation` for malformed requests; storage untouched.
    /// - `BillingError::Transaction` for any failure after the transaction
    ///   began. Unknown user or category ids surface as a foreign-key
    ///   `RepoError::Db` from the first insert.
    pub fn record_bill(&self, request: &RecordBillRequest) -> Result<BillingResult, BillingError> {
        let item = request.to_item();
        item.validate()?;

        let result = self.coordinator.run(|ctx| self.record_in(ctx, &item))?;
        info!(
            "event=record_bill module=service status=ok user_id={} bill_type={} total_expense={} total_income={}",
            result.user_id, request.bill_type, result.total_expense, result.total_income
        );
        Ok(result)
    }

    fn record_in(&self, ctx: &OperationContext<'_>, item: &BillItem) -> Result<BillingResult, RepoError> {
        let user_id = item.user_id;
        self.items.create_item(ctx, item)?;

        let mut user = self
            .users
            .load_user(ctx, user_id, true)?
            .ok_or(RepoError::NotFound {
                entity: EntityKind::User,
                id: user_id,
            })?;
        user.last_bill_time = Some(item.bill_date);
        self.users.update_user(ctx, &user)?;

        // Plain reads on purpose: the coordinator's pin keeps them on primary.
        let expenses = self
            .items
            .list_items(ctx, &BillItemListQuery::for_user(user_id, BillType::Expense), false)?;
        let incomes = self
            .items
            .list_items(ctx, &BillItemListQuery::for_user(user_id, BillType::Income), false)?;

        let last_expense = self.items.latest_item(ctx, user_id, BillType::Expense, false)?;
        let last_income = self.items.latest_item(ctx, user_id, BillType::Income, false)?;

        Ok(BillingResult {
            user_id,
            username: user.username,
            total_expense: total_amount(&expenses, BillType::Expense)?,
            total_income: total_amount(&incomes, BillType::Income)?,
            last_expense,
            last_income,
        })
    }
}

fn total_amount(items: &[BillItem], bill_type: BillType) -> Result<i64, ValidationError> {
    items
        .iter()
        .try_fold(0_i64, |total, item| total.checked_add(item.amount))
        .ok_or(ValidationError::TotalOverflow(bill_type))
}
