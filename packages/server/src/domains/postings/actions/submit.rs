use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::common::{EventId, PostingId, UserId};
use crate::domains::events::actions::withdraw;
use crate::domains::events::{EventType, Initiator, NewEvent, Outcome};
use crate::domains::moderation::{ModerationError, ModerationResult};
use crate::domains::postings::{Posting, PostingKind, PostingStatus};
use crate::domains::users::UserRole;
use crate::kernel::ServerDeps;

#[derive(Debug, Clone, Deserialize)]
pub struct PostingSubmission {
    pub kind: PostingKind,
    pub topic: Option<String>,
    pub message: String,
    pub group_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostingReceipt {
    pub posting_id: PostingId,
    pub event_id: Option<EventId>,
    pub status: PostingStatus,
}

/// Publish or queue a posting.
///
/// Disseminations go out without review. Discussions wait for review unless
/// the author is an administrator, whose discussions are recorded as
/// approved at posting time.
pub async fn submit_posting(
    author_id: UserId,
    author_is_admin: bool,
    submission: PostingSubmission,
    deps: &ServerDeps,
) -> ModerationResult<PostingReceipt> {
    if submission.message.trim().is_empty() {
        return Err(ModerationError::precondition("Posting message is required"));
    }
    let role = deps
        .users
        .lookup_user_role(author_id)
        .await?
        .ok_or_else(|| ModerationError::not_found(format!("User {}", author_id)))?;
    let is_admin = author_is_admin || role == UserRole::Admin;

    let mut posting = Posting {
        id: PostingId::new(),
        event_id: None,
        author_id,
        kind: submission.kind,
        topic: submission.topic,
        message: submission.message,
        group_id: submission.group_id,
        status: PostingStatus::Open,
        cite_event_id: None,
        created_at: Utc::now(),
    };

    if posting.kind == PostingKind::Dissemination {
        let posting = deps.postings.insert(&posting).await?;
        info!(posting_id = %posting.id, "Dissemination published");
        return Ok(receipt(&posting));
    }

    let mut new_event = NewEvent::builder()
        .event_type(EventType::Posting)
        .initiator(Initiator::User(author_id))
        .target(posting.id.into_uuid())
        .created_at(posting.created_at)
        .build();
    if is_admin {
        new_event.decided = Some(Outcome::Approve);
    } else {
        posting.status = PostingStatus::Pending;
    }

    let event = deps.events.create_event(new_event).await?;
    posting.event_id = Some(event.id);

    match deps.postings.insert(&posting).await {
        Ok(posting) => {
            info!(
                posting_id = %posting.id,
                event_id = %event.id,
                status = %posting.status,
                "Discussion recorded"
            );
            Ok(receipt(&posting))
        }
        Err(e) => {
            error!(event_id = %event.id, error = %e, "Posting insert failed after its event was recorded");
            withdraw(deps, event.id).await;
            Err(ModerationError::Unavailable(e))
        }
    }
}

fn receipt(posting: &Posting) -> PostingReceipt {
    PostingReceipt {
        posting_id: posting.id,
        event_id: posting.event_id,
        status: posting.status,
    }
}
