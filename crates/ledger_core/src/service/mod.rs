//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Own transaction boundaries; repositories never open transactions.

pub mod bill_category_service;
pub mod bill_item_service;
pub mod billing_workflow;
pub mod transaction;
pub mod user_service;
