//! Bill category domain model.

use super::{ensure_not_blank, ValidationError};
use serde::{Deserialize, Serialize};

pub type CategoryId = i64;

/// Grouping label for bill items ("groceries", "salary", ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillCategory {
    pub id: Option<CategoryId>,
    pub name: String,
    pub description: Option<String>,
    /// Display color, e.g. `#ff8800`. Not interpreted by the core.
    pub color: Option<String>,
    pub sort_order: i64,
}

impl BillCategory {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: None,
            color: None,
            sort_order: 0,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        ensure_not_blank("category name", &self.name)
    }
}
