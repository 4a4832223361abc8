/// Capabilities guarded by the moderation workflow
///
/// Every capability here is an administrator capability; ordinary users only
/// ever submit actions for review.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminCapability {
    /// Approve or reject ledger events
    DecideEvents,

    /// Read review queues and raw ledger entries
    ReviewQueue,

    /// Record ledger entries directly (legacy imports, backdated events)
    RecordEvents,

    /// Re-run domain hooks for decided events whose mirror diverged
    Reconcile,
}

impl AdminCapability {
    /// Check if this capability requires admin access
    pub fn requires_admin(&self) -> bool {
        true
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AdminCapability::DecideEvents => "decide_events",
            AdminCapability::ReviewQueue => "review_queue",
            AdminCapability::RecordEvents => "record_events",
            AdminCapability::Reconcile => "reconcile",
        }
    }
}
