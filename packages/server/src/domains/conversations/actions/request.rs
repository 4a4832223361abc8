use chrono::Utc;
use serde::Deserialize;
use tracing::{error, info};

use crate::common::{ConversationId, UserId};
use crate::domains::conversations::{Conversation, ConversationStatus};
use crate::domains::events::{EventType, Initiator, NewEvent};
use crate::domains::moderation::{ModerationError, ModerationResult};
use crate::domains::events::actions::withdraw;
use crate::domains::users::UserRole;
use crate::kernel::ServerDeps;

#[derive(Debug, Clone, Deserialize)]
pub struct ConversationRequest {
    pub physician_id: UserId,
    pub topic: Option<String>,
    pub message: Option<String>,
}

/// Ask for a private channel between a patient and a physician.
///
/// The conversation stays pending, without a password, until reviewed.
pub async fn request_private_conversation(
    patient_id: UserId,
    request: ConversationRequest,
    deps: &ServerDeps,
) -> ModerationResult<Conversation> {
    expect_role(deps, patient_id, UserRole::Patient).await?;
    expect_role(deps, request.physician_id, UserRole::Physician).await?;

    let event = deps
        .events
        .create_event(
            NewEvent::builder()
                .event_type(EventType::PrivateRequest)
                .initiator(Initiator::User(patient_id))
                .target(request.physician_id.into_uuid())
                .build(),
        )
        .await?;

    let conversation = Conversation {
        id: ConversationId::new(),
        event_id: event.id,
        patient_id,
        physician_id: request.physician_id,
        topic: request.topic,
        message: request.message,
        password: None,
        patient_verified: false,
        physician_verified: false,
        status: ConversationStatus::Pending,
        created_at: Utc::now(),
    };

    match deps.conversations.insert(&conversation).await {
        Ok(conversation) => {
            info!(
                conversation_id = %conversation.id,
                event_id = %event.id,
                "Private conversation requested"
            );
            Ok(conversation)
        }
        Err(e) => {
            error!(event_id = %event.id, error = %e, "Conversation insert failed after its event was recorded");
            withdraw(deps, event.id).await;
            Err(ModerationError::Unavailable(e))
        }
    }
}

async fn expect_role(deps: &ServerDeps, user_id: UserId, expected: UserRole) -> ModerationResult<()> {
    match deps.users.lookup_user_role(user_id).await? {
        Some(role) if role == expected => Ok(()),
        Some(role) => Err(ModerationError::precondition(format!(
            "User {} is a {}, not a {}",
            user_id, role, expected
        ))),
        None => Err(ModerationError::precondition(format!(
            "User {} does not exist",
            user_id
        ))),
    }
}
