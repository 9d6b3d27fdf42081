//! User domain model.
//!
//! # Invariants
//! - `username` is never blank.
//! - `last_bill_time` tracks the bill date of the most recently recorded bill.

use super::{ensure_not_blank, ValidationError};
use serde::{Deserialize, Serialize};

pub type UserId = i64;

/// Ledger owner. Bills are always recorded against one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Option<UserId>,
    pub username: String,
    pub nickname: Option<String>,
    /// Opaque credential text; never interpreted by the core.
    #[serde(skip_serializing)]
    pub password: Option<String>,
    /// Unix epoch milliseconds.
    pub last_login_time: Option<i64>,
    /// Unix epoch milliseconds.
    pub last_bill_time: Option<i64>,
}

impl User {
    /// Creates an unsaved user with only the required field set.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: None,
            username: username.into(),
            nickname: None,
            password: None,
            last_login_time: None,
            last_bill_time: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        ensure_not_blank("username", &self.username)
    }
}
