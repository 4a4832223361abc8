use tracing::info;

use crate::common::{ConversationId, UserId};
use crate::domains::conversations::ConversationStatus;
use crate::domains::moderation::{ModerationError, ModerationResult};
use crate::kernel::ServerDeps;

/// Check a participant's one-time password. Returns whether it matched.
pub async fn validate_conversation_password(
    conversation_id: ConversationId,
    user_id: UserId,
    password: &str,
    deps: &ServerDeps,
) -> ModerationResult<bool> {
    let conversation = deps
        .conversations
        .find_by_id(conversation_id)
        .await?
        .ok_or_else(|| ModerationError::not_found(format!("Conversation {}", conversation_id)))?;

    if !conversation.is_participant(user_id) {
        return Err(ModerationError::Forbidden(
            "Not a participant in this conversation".to_string(),
        ));
    }
    if conversation.status != ConversationStatus::Open {
        return Err(ModerationError::precondition("Conversation is not open"));
    }
    if conversation.password.as_deref() != Some(password) {
        return Ok(false);
    }

    deps.conversations
        .mark_participant_verified(conversation_id, user_id)
        .await?;
    info!(%conversation_id, %user_id, "Conversation participant verified");
    Ok(true)
}
