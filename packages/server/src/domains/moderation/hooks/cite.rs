use anyhow::Result;
use async_trait::async_trait;
use tracing::warn;

use super::{DomainHook, HookEffect, MirrorState, Notification};
use crate::common::{PostingId, StatusChange};
use crate::domains::events::Event;
use crate::domains::moderation::outcome::HookDetail;
use crate::domains::postings::CitationNote;
use crate::kernel::ServerDeps;

/// Citation upheld: remove the posting and warn its author.
///
/// A posting that is already gone counts as removed.
pub struct UpholdCitation;

#[async_trait]
impl DomainHook for UpholdCitation {
    fn mutation(&self) -> &'static str {
        "remove_posting"
    }

    async fn apply(&self, event: &Event, deps: &ServerDeps) -> Result<HookEffect> {
        let Some(posting_id) = event.target.map(PostingId::from_uuid) else {
            return Ok(HookEffect::TargetMissing);
        };
        let Some(removed) = deps.postings.delete_posting(posting_id).await? else {
            return Ok(HookEffect::AlreadyApplied);
        };

        let cited_for = match event.note.as_deref().map(CitationNote::parse) {
            Some(Ok(note)) => note.to_string(),
            Some(Err(e)) => {
                warn!(event_id = %event.id, error = %e, "Citation note unreadable");
                event.note.clone().unwrap_or_default()
            }
            None => "violating the community guidelines".to_string(),
        };

        let warning = Notification::new(
            removed.author_id,
            "Warning: someone cited your posting",
            format!(
                "Hi, Your posting {} is cited for being {}. We welcome relevant and respectful \
                 postings. This is a warning.",
                removed.excerpt, cited_for
            ),
        );

        Ok(HookEffect::Applied {
            notifications: vec![warning],
            detail: Some(HookDetail::PostingRemoved(removed)),
        })
    }

    async fn mirror_state(&self, event: &Event, deps: &ServerDeps) -> Result<MirrorState> {
        let Some(posting_id) = event.target.map(PostingId::from_uuid) else {
            return Ok(MirrorState::TargetMissing);
        };
        Ok(match deps.postings.find_by_id(posting_id).await? {
            None => MirrorState::InSync,
            Some(_) => MirrorState::Diverged,
        })
    }
}

/// Citation dismissed: clear the flag, the posting stays visible.
pub struct DismissCitation;

#[async_trait]
impl DomainHook for DismissCitation {
    fn mutation(&self) -> &'static str {
        "clear_citation_flag"
    }

    async fn apply(&self, event: &Event, deps: &ServerDeps) -> Result<HookEffect> {
        let Some(posting_id) = event.target.map(PostingId::from_uuid) else {
            return Ok(HookEffect::TargetMissing);
        };

        Ok(match deps.postings.clear_flag(posting_id, event.id).await? {
            StatusChange::Applied => HookEffect::applied(Vec::new()),
            StatusChange::Unchanged => HookEffect::AlreadyApplied,
            StatusChange::Missing => HookEffect::TargetMissing,
        })
    }

    async fn mirror_state(&self, event: &Event, deps: &ServerDeps) -> Result<MirrorState> {
        let Some(posting_id) = event.target.map(PostingId::from_uuid) else {
            return Ok(MirrorState::TargetMissing);
        };
        Ok(match deps.postings.find_by_id(posting_id).await? {
            None => MirrorState::TargetMissing,
            Some(p) if p.cite_event_id == Some(event.id) => MirrorState::Diverged,
            Some(_) => MirrorState::InSync,
        })
    }
}
