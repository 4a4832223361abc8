use anyhow::Result;
use async_trait::async_trait;

use super::{DomainHook, HookEffect, MirrorState};
use crate::common::{PostingId, StatusChange};
use crate::domains::events::Event;
use crate::domains::postings::{Posting, PostingStatus};
use crate::kernel::ServerDeps;

/// Posting approved: make it publicly visible.
pub struct PublishPosting;

#[async_trait]
impl DomainHook for PublishPosting {
    fn mutation(&self) -> &'static str {
        "publish_posting"
    }

    async fn apply(&self, event: &Event, deps: &ServerDeps) -> Result<HookEffect> {
        let Some(posting) = reviewed_posting(event, deps).await? else {
            return Ok(HookEffect::TargetMissing);
        };
        // An author may already have closed a published discussion.
        if posting.status.is_published() {
            return Ok(HookEffect::AlreadyApplied);
        }

        // Conditional on the status just read, so a concurrent termination
        // is never overwritten.
        Ok(
            match deps
                .postings
                .transition_posting(posting.id, posting.status, PostingStatus::Open)
                .await?
            {
                StatusChange::Applied => HookEffect::applied(Vec::new()),
                StatusChange::Unchanged => HookEffect::AlreadyApplied,
                StatusChange::Missing => HookEffect::TargetMissing,
            },
        )
    }

    async fn mirror_state(&self, event: &Event, deps: &ServerDeps) -> Result<MirrorState> {
        Ok(match reviewed_posting(event, deps).await? {
            None => MirrorState::TargetMissing,
            Some(p) if p.status.is_published() => MirrorState::InSync,
            Some(_) => MirrorState::Diverged,
        })
    }
}

/// Posting rejected: it is never shown.
pub struct RejectPosting;

#[async_trait]
impl DomainHook for RejectPosting {
    fn mutation(&self) -> &'static str {
        "reject_posting"
    }

    async fn apply(&self, event: &Event, deps: &ServerDeps) -> Result<HookEffect> {
        let Some(posting) = reviewed_posting(event, deps).await? else {
            return Ok(HookEffect::TargetMissing);
        };

        Ok(
            match deps
                .postings
                .set_posting_status(posting.id, PostingStatus::Rejected)
                .await?
            {
                StatusChange::Applied => HookEffect::applied(Vec::new()),
                StatusChange::Unchanged => HookEffect::AlreadyApplied,
                StatusChange::Missing => HookEffect::TargetMissing,
            },
        )
    }

    async fn mirror_state(&self, event: &Event, deps: &ServerDeps) -> Result<MirrorState> {
        Ok(match reviewed_posting(event, deps).await? {
            None => MirrorState::TargetMissing,
            Some(p) if p.status == PostingStatus::Rejected => MirrorState::InSync,
            Some(_) => MirrorState::Diverged,
        })
    }
}

/// The posting a `posting` event reviews: its target, or the posting that
/// carries the event id when the event was recorded without one.
pub(crate) async fn reviewed_posting(event: &Event, deps: &ServerDeps) -> Result<Option<Posting>> {
    match event.target.map(PostingId::from_uuid) {
        Some(posting_id) => deps.postings.find_by_id(posting_id).await,
        None => deps.postings.find_by_event(event.id).await,
    }
}
