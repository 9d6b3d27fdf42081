//! Ledger domain model: users, bill categories and bill line-items.
//!
//! # Responsibility
//! - Define canonical records exchanged between services and repositories.
//! - Own field-level validation so no layer persists malformed records.
//!
//! # Invariants
//! - Records carry `id = None` until the primary store assigns one.
//! - Amounts are integer minor units; dates are Unix epoch milliseconds.

pub mod bill_category;
pub mod bill_item;
pub mod user;

use bill_item::BillType;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Validation failures for caller-supplied records and identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required text field is empty after trim.
    BlankField(&'static str),
    /// An update was requested for a record that was never persisted.
    MissingId(&'static str),
    /// An identifier is zero or negative.
    InvalidId { field: &'static str, value: i64 },
    /// Amounts are non-negative; direction is carried by `BillType`.
    NegativeAmount(i64),
    /// Bill type text is neither `expense` nor `income`.
    UnknownBillType(String),
    /// A user's running total of this bill type no longer fits in `i64`.
    TotalOverflow(BillType),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankField(field) => write!(f, "{field} must not be blank"),
            Self::MissingId(entity) => write!(f, "{entity} id is required for update"),
            Self::InvalidId { field, value } => {
                write!(f, "{field} must be a positive id, got {value}")
            }
            Self::NegativeAmount(amount) => {
                write!(f, "amount must not be negative, got {amount}")
            }
            Self::UnknownBillType(value) => {
                write!(f, "unknown bill type `{value}`; expected expense|income")
            }
            Self::TotalOverflow(bill_type) => {
                write!(f, "{bill_type} total exceeds the supported amount range")
            }
        }
    }
}

impl Error for ValidationError {}

pub(crate) fn ensure_not_blank(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::BlankField(field));
    }
    Ok(())
}

pub(crate) fn ensure_positive_id(field: &'static str, value: i64) -> Result<(), ValidationError> {
    if value <= 0 {
        return Err(ValidationError::InvalidId { field, value });
    }
    Ok(())
}
