//! Bill line-item domain model.
//!
//! # Invariants
//! - `user_id` and `category_id` reference persisted rows (positive ids).
//! - `amount` is non-negative; `bill_type` carries the direction.

use super::bill_category::CategoryId;
use super::user::UserId;
use super::{ensure_positive_id, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

pub type BillItemId = i64;

/// Direction of a bill line-item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillType {
    Expense,
    Income,
}

impl BillType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Expense => "expense",
            Self::Income => "income",
        }
    }
}

impl Display for BillType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BillType {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "expense" => Ok(Self::Expense),
            "income" => Ok(Self::Income),
            _ => Err(ValidationError::UnknownBillType(value.to_string())),
        }
    }
}

/// One recorded expense or income.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillItem {
    pub id: Option<BillItemId>,
    pub user_id: UserId,
    pub category_id: CategoryId,
    pub bill_type: BillType,
    /// Unix epoch milliseconds.
    pub bill_date: i64,
    /// Integer minor units.
    pub amount: i64,
    pub description: Option<String>,
}

impl BillItem {
    pub fn new(
        user_id: UserId,
        category_id: CategoryId,
        bill_type: BillType,
        bill_date: i64,
        amount: i64,
    ) -> Self {
        Self {
            id: None,
            user_id,
            category_id,
            bill_type,
            bill_date,
            amount,
            description: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        ensure_positive_id("user_id", self.user_id)?;
        ensure_positive_id("category_id", self.category_id)?;
        if self.amount < 0 {
            return Err(ValidationError::NegativeAmount(self.amount));
        }
        Ok(())
    }
}
