//! Run-behavior modifier for blocks and tests.
//!
//! Every block and test carries a [`Behavior`] deciding whether it runs.
//! Behaviors combine along the path from the root to a node: `Skip` anywhere
//! on the path wins over everything, `Only` wins over `Normal`.

use serde::{Deserialize, Serialize};

/// Whether a block or test runs, is skipped, or is focused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Behavior {
    /// Run normally
    #[default]
    Normal,
    /// Never run; report as skipped
    Skip,
    /// Focus mode: when any node is `Only`, everything else is pruned
    Only,
}

impl Behavior {
    /// Combine two behaviors into the effective one.
    ///
    /// `Skip` dominates everything; `Only` dominates `Normal`. The operation
    /// is commutative, associative, and idempotent, so folding it over a path
    /// in any order yields the same effective behavior.
    #[must_use]
    pub const fn combine(self, other: Self) -> Self {
        match (self, other) {
            (Self::Skip, _) | (_, Self::Skip) => Self::Skip,
            (Self::Only, _) | (_, Self::Only) => Self::Only,
            (Self::Normal, Self::Normal) => Self::Normal,
        }
    }

    /// Check whether this behavior is `Skip`
    #[must_use]
    pub const fn is_skip(&self) -> bool {
        matches!(self, Self::Skip)
    }

    /// Check whether this behavior is `Only`
    #[must_use]
    pub const fn is_only(&self) -> bool {
        matches!(self, Self::Only)
    }
}
