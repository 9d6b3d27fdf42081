//! Read/write routing for the primary/replica store pair.
//!
//! # Responsibility
//! - Hold the routing decision of one logical operation.
//! - Carry that decision, explicitly, through every repository call.
//!
//! # Invariants
//! - Routing state is a value owned by the operation, never ambient or
//!   thread-bound, so nothing survives into the next operation on a reused
//!   worker thread.
//! - Writes always resolve to `Primary`; unset reads resolve to `Replica`.

mod context;
mod operation;

pub use context::{RoutingContext, RoutingDecision, RoutingScope};
pub use operation::OperationContext;
