//! Per-operation routing decision.
//!
//! # Invariants
//! - Unset decision reads as `Replica`.
//! - Every decision set through `route` is cleared when its scope guard drops,
//!   on every exit path including unwinding.
//! - While a primary pin is held, `current()` is `Primary` whatever the last
//!   explicit decision was. Pins nest.

use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::fmt::{Display, Formatter};

/// Physical target selected for one data operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingDecision {
    /// Store that accepts writes and reflects them immediately.
    Primary,
    /// Lagging read store; the safe default.
    #[default]
    Replica,
}

impl Display for RoutingDecision {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Replica => write!(f, "replica"),
        }
    }
}

/// Routing state owned by one logical operation.
///
/// Not `Sync`: a context cannot be observed by two threads at once.
#[derive(Debug, Default)]
pub struct RoutingContext {
    decision: Cell<Option<RoutingDecision>>,
    primary_pins: Cell<u32>,
}

impl RoutingContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes subsequent dispatches to the primary.
    pub fn use_write(&self) {
        self.decision.set(Some(RoutingDecision::Primary));
    }

    /// Routes subsequent dispatches to the replica.
    pub fn use_read(&self) {
        self.decision.set(Some(RoutingDecision::Replica));
    }

    pub fn current(&self) -> RoutingDecision {
        if self.primary_pins.get() > 0 {
            return RoutingDecision::Primary;
        }
        self.decision.get().unwrap_or_default()
    }

    /// Resets the explicit decision. Pins are released only by their guards.
    pub fn clear(&self) {
        self.decision.set(None);
    }

    /// Sets `decision` and returns a guard that clears it on drop.
    pub fn route(&self, decision: RoutingDecision) -> RoutingScope<'_> {
        match decision {
            RoutingDecision::Primary => self.use_write(),
            RoutingDecision::Replica => self.use_read(),
        }
        RoutingScope { context: self }
    }

    /// Forces `Primary` until the returned guard drops.
    pub(crate) fn pin_primary(&self) -> PrimaryPin<'_> {
        self.primary_pins.set(self.primary_pins.get() + 1);
        PrimaryPin { context: self }
    }

    pub fn is_pinned(&self) -> bool {
        self.primary_pins.get() > 0
    }
}

/// Clears the owning context's decision when dropped.
#[must_use = "dropping the scope clears the routing decision immediately"]
pub struct RoutingScope<'ctx> {
    context: &'ctx RoutingContext,
}

impl RoutingScope<'_> {
    /// Effective target while this scope is alive.
    pub fn target(&self) -> RoutingDecision {
        self.context.current()
    }
}

impl Drop for RoutingScope<'_> {
    fn drop(&mut self) {
        self.context.clear();
    }
}

#[must_use = "dropping the pin releases primary routing immediately"]
pub(crate) struct PrimaryPin<'ctx> {
    context: &'ctx RoutingContext,
}

impl Drop for PrimaryPin<'_> {
    fn drop(&mut self) {
        let pins = self.context.primary_pins.get();
        self.context.primary_pins.set(pins.saturating_sub(1));
        if pins <= 1 {
            self.context.clear();
        }
    }
}
