use serde::Deserialize;
use tracing::info;

use crate::common::{PostingId, StatusChange, UserId};
use crate::domains::events::actions::withdraw;
use crate::domains::events::{Event, EventType, Initiator, NewEvent};
use crate::domains::moderation::{ModerationError, ModerationResult};
use crate::domains::postings::CitationNote;
use crate::kernel::ServerDeps;

#[derive(Debug, Clone, Deserialize)]
pub struct CitationRequest {
    pub kind: String,
    pub reason: String,
}

/// Flag a posting for review. A posting carries at most one pending citation.
pub async fn cite_posting(
    informer_id: UserId,
    posting_id: PostingId,
    request: CitationRequest,
    deps: &ServerDeps,
) -> ModerationResult<Event> {
    let kind = request.kind.trim();
    if kind.is_empty() || kind.contains("@@") {
        return Err(ModerationError::precondition("Citation kind is invalid"));
    }
    if request.reason.trim().is_empty() {
        return Err(ModerationError::precondition("Citation reason is required"));
    }

    if deps.postings.find_by_id(posting_id).await?.is_none() {
        return Err(ModerationError::not_found(format!("Posting {}", posting_id)));
    }
    if deps.users.lookup_user_role(informer_id).await?.is_none() {
        return Err(ModerationError::not_found(format!("User {}", informer_id)));
    }
    if deps
        .events
        .find_pending_for_target(EventType::Cite, posting_id.into_uuid())
        .await?
        .is_some()
    {
        return Err(ModerationError::conflict("This posting has already been cited"));
    }

    let note = CitationNote::new(kind, request.reason.trim());
    let event = deps
        .events
        .create_event(
            NewEvent::builder()
                .event_type(EventType::Cite)
                .initiator(Initiator::User(informer_id))
                .target(posting_id.into_uuid())
                .note(note.encode())
                .build(),
        )
        .await?;

    match deps.postings.flag_posting(posting_id, event.id).await {
        Ok(StatusChange::Applied) => {
            info!(event_id = %event.id, %posting_id, "Posting cited");
            Ok(event)
        }
        Ok(StatusChange::Unchanged) => {
            withdraw(deps, event.id).await;
            Err(ModerationError::conflict("This posting has already been cited"))
        }
        Ok(StatusChange::Missing) => {
            withdraw(deps, event.id).await;
            Err(ModerationError::not_found(format!("Posting {}", posting_id)))
        }
        Err(e) => {
            withdraw(deps, event.id).await;
            Err(ModerationError::Unavailable(e))
        }
    }
}
