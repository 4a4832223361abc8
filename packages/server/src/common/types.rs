// Common types used across multiple domains and layers
//
// Domain stores report how a mirror update landed so domain hooks can stay
// idempotent: re-running a hook against an entity that already carries the
// target status must not repeat its side effects.

use serde::Serialize;

/// Result of a conditional status write on a domain entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusChange {
    /// The entity moved to the requested status.
    Applied,
    /// The entity already carried the requested status; nothing was written.
    Unchanged,
    /// No entity with that id exists.
    Missing,
}

impl StatusChange {
    pub fn is_applied(&self) -> bool {
        matches!(self, StatusChange::Applied)
    }
}
