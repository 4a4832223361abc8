//! Domain-phase hooks, one per `(event type, outcome)`.
//!
//! A hook brings the originating entity's status mirror in line with a
//! decided ledger entry. Hooks must be safe to re-run: applying a hook whose
//! effect is already in place reports `AlreadyApplied` and queues no
//! notifications.

mod cite;
pub(crate) mod posting;
mod private_request;
mod registration;

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use super::outcome::HookDetail;
use crate::common::UserId;
use crate::domains::events::{Event, EventType, Outcome};
use crate::kernel::ServerDeps;

pub use cite::{DismissCitation, UpholdCitation};
pub use posting::{PublishPosting, RejectPosting};
pub use private_request::{OpenConversation, RejectConversation};
pub use registration::{RejectRegistration, VerifyRegistrant};

/// A message for a user, addressed once their contact details are resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub recipient: UserId,
    pub subject: String,
    pub body: String,
}

impl Notification {
    pub fn new(recipient: UserId, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            recipient,
            subject: subject.into(),
            body: body.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HookEffect {
    Applied {
        notifications: Vec<Notification>,
        detail: Option<HookDetail>,
    },
    AlreadyApplied,
    TargetMissing,
}

impl HookEffect {
    pub fn applied(notifications: Vec<Notification>) -> Self {
        HookEffect::Applied {
            notifications,
            detail: None,
        }
    }
}

/// Where an entity's mirror stands relative to its decided event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorState {
    InSync,
    Diverged,
    TargetMissing,
}

#[async_trait]
pub trait DomainHook: Send + Sync {
    /// Name of the mirror mutation, used in logs and partial-failure reports.
    fn mutation(&self) -> &'static str;

    async fn apply(&self, event: &Event, deps: &ServerDeps) -> Result<HookEffect>;

    async fn mirror_state(&self, event: &Event, deps: &ServerDeps) -> Result<MirrorState>;
}

/// Maps each `(event type, outcome)` to its hook.
#[derive(Default, Clone)]
pub struct HookRegistry {
    hooks: HashMap<(EventType, Outcome), Arc<dyn DomainHook>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hooks for every built-in event type.
    pub fn standard() -> Self {
        Self::new()
            .with(EventType::Registration, Outcome::Approve, VerifyRegistrant)
            .with(EventType::Registration, Outcome::Reject, RejectRegistration)
            .with(EventType::Posting, Outcome::Approve, PublishPosting)
            .with(EventType::Posting, Outcome::Reject, RejectPosting)
            .with(EventType::Cite, Outcome::Approve, UpholdCitation)
            .with(EventType::Cite, Outcome::Reject, DismissCitation)
            .with(EventType::PrivateRequest, Outcome::Approve, OpenConversation)
            .with(EventType::PrivateRequest, Outcome::Reject, RejectConversation)
    }

    /// Register (or replace) the hook for a type and outcome.
    pub fn with(
        mut self,
        event_type: EventType,
        outcome: Outcome,
        hook: impl DomainHook + 'static,
    ) -> Self {
        self.hooks.insert((event_type, outcome), Arc::new(hook));
        self
    }

    pub fn get(&self, event_type: EventType, outcome: Outcome) -> Option<Arc<dyn DomainHook>> {
        self.hooks.get(&(event_type, outcome)).cloned()
    }
}
