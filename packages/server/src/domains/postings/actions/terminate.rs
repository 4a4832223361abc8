use tracing::info;

use crate::common::{PostingId, UserId};
use crate::domains::moderation::{ModerationError, ModerationResult};
use crate::domains::postings::{Posting, PostingKind, PostingStatus};
use crate::kernel::ServerDeps;

/// Close an open discussion. Only its author may do so.
pub async fn terminate_posting(
    author_id: UserId,
    posting_id: PostingId,
    deps: &ServerDeps,
) -> ModerationResult<Posting> {
    let mut posting = deps
        .postings
        .find_by_id(posting_id)
        .await?
        .ok_or_else(|| ModerationError::not_found(format!("Posting {}", posting_id)))?;

    if posting.author_id != author_id {
        return Err(ModerationError::Forbidden(
            "Only the author can terminate a posting".to_string(),
        ));
    }
    if posting.kind != PostingKind::Discussion || posting.status != PostingStatus::Open {
        return Err(ModerationError::precondition(
            "Only open discussions can be terminated",
        ));
    }

    let change = deps
        .postings
        .transition_posting(posting_id, PostingStatus::Open, PostingStatus::Terminated)
        .await?;
    if !change.is_applied() {
        return Err(ModerationError::conflict("Posting changed while terminating"));
    }

    info!(%posting_id, "Discussion terminated by its author");
    posting.status = PostingStatus::Terminated;
    Ok(posting)
}
