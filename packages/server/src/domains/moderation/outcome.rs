//! Values reported back from decisions, consistency checks and repairs.

use serde::Serialize;

use crate::common::{ConversationId, EventId};
use crate::domains::events::Event;
use crate::domains::groups::CareGroup;
use crate::domains::postings::RemovedPosting;

/// Result of `decide`. Only `Decided` ran the domain phase for this call.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum DecideOutcome {
    Decided(DecisionReport),
    AlreadyDecided {
        event: Event,
        /// Domain phase re-run because the mirror disagreed with the ledger.
        #[serde(skip_serializing_if = "Option::is_none")]
        repair: Option<SideEffect>,
    },
    NotFound {
        event_id: EventId,
    },
}

impl DecideOutcome {
    pub fn event(&self) -> Option<&Event> {
        match self {
            DecideOutcome::Decided(report) => Some(&report.event),
            DecideOutcome::AlreadyDecided { event, .. } => Some(event),
            DecideOutcome::NotFound { .. } => None,
        }
    }

    pub fn is_decided(&self) -> bool {
        matches!(self, DecideOutcome::Decided(_))
    }

    pub fn is_already_decided(&self) -> bool {
        matches!(self, DecideOutcome::AlreadyDecided { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DecisionReport {
    pub event: Event,
    pub side_effect: SideEffect,
    pub notifications: NotificationSummary,
}

/// How the domain phase went.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SideEffect {
    Applied {
        mutation: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        detail: Option<HookDetail>,
    },
    /// The mirror already matched; nothing was written.
    AlreadyApplied { mutation: &'static str },
    /// No hook is registered for this event type and outcome.
    NoHook,
    /// Ledger decided, mirror update unconfirmed.
    Partial(PartialFailure),
}

impl SideEffect {
    pub fn is_partial(&self) -> bool {
        matches!(self, SideEffect::Partial(_))
    }

    pub fn detail(&self) -> Option<&HookDetail> {
        match self {
            SideEffect::Applied { detail, .. } => detail.as_ref(),
            _ => None,
        }
    }
}

/// Extra facts a hook reports about what it changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HookDetail {
    UserVerified { groups: Vec<CareGroup> },
    PostingRemoved(RemovedPosting),
    ConversationOpened { conversation_id: ConversationId },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartialFailure {
    pub mutation: &'static str,
    pub reason: PartialReason,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PartialReason {
    Failed { error: String },
    TimedOut { after_ms: u64 },
    /// The entity the event refers to no longer exists.
    TargetMissing,
}

/// Delivery counts for the notification phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NotificationSummary {
    pub sent: usize,
    /// Recipient unknown or without an email address.
    pub skipped: usize,
    pub failed: usize,
}

/// Whether an event's domain mirror agrees with the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Consistency {
    /// Not decided yet; nothing to compare.
    Pending,
    InSync,
    Diverged { expected: &'static str },
    TargetMissing,
    NoHook,
}

impl Consistency {
    /// Whether an operator needs to look at this event.
    pub fn needs_attention(&self) -> bool {
        matches!(self, Consistency::Diverged { .. } | Consistency::TargetMissing)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConsistencyReport {
    pub event: Event,
    pub consistency: Consistency,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconcileReport {
    pub event: Event,
    pub before: Consistency,
    /// Set when the domain phase was re-run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repair: Option<SideEffect>,
}
