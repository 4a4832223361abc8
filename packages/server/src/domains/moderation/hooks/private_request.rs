use anyhow::Result;
use async_trait::async_trait;

use super::{DomainHook, HookEffect, MirrorState, Notification};
use crate::common::{StatusChange, UserId};
use crate::domains::conversations::{generate_one_time_password, ConversationStatus};
use crate::domains::events::Event;
use crate::domains::moderation::outcome::HookDetail;
use crate::kernel::ServerDeps;

/// Private request approved: open the conversation and send both
/// participants its one-time password.
pub struct OpenConversation;

#[async_trait]
impl DomainHook for OpenConversation {
    fn mutation(&self) -> &'static str {
        "open_conversation"
    }

    async fn apply(&self, event: &Event, deps: &ServerDeps) -> Result<HookEffect> {
        let Some(conversation) = deps.conversations.find_by_event(event.id).await? else {
            return Ok(HookEffect::TargetMissing);
        };

        let password = generate_one_time_password();
        match deps
            .conversations
            .open_conversation(conversation.id, &password)
            .await?
        {
            StatusChange::Missing => return Ok(HookEffect::TargetMissing),
            StatusChange::Unchanged => return Ok(HookEffect::AlreadyApplied),
            StatusChange::Applied => {}
        }

        let patient = display_name(deps, conversation.patient_id).await?;
        let physician = display_name(deps, conversation.physician_id).await?;

        let notifications = vec![
            Notification::new(
                conversation.patient_id,
                "APPROVED: Private Conversation Request",
                format!(
                    "<b>Request approved</b><br/>Your private conversation request to {} is \
                     approved by the administrator.<br/>One-time password: <b>{}</b>",
                    physician, password
                ),
            ),
            Notification::new(
                conversation.physician_id,
                "NEW: Private Conversation",
                format!(
                    "<b>Private conversation opened</b><br/>{} opened a private conversation \
                     with you.<br/>One-time password: <b>{}</b>",
                    patient, password
                ),
            ),
        ];

        Ok(HookEffect::Applied {
            notifications,
            detail: Some(HookDetail::ConversationOpened {
                conversation_id: conversation.id,
            }),
        })
    }

    async fn mirror_state(&self, event: &Event, deps: &ServerDeps) -> Result<MirrorState> {
        Ok(match deps.conversations.find_by_event(event.id).await? {
            None => MirrorState::TargetMissing,
            Some(c) if c.status == ConversationStatus::Open => MirrorState::InSync,
            Some(_) => MirrorState::Diverged,
        })
    }
}

/// Private request rejected: close the conversation and tell the patient.
pub struct RejectConversation;

#[async_trait]
impl DomainHook for RejectConversation {
    fn mutation(&self) -> &'static str {
        "reject_conversation"
    }

    async fn apply(&self, event: &Event, deps: &ServerDeps) -> Result<HookEffect> {
        let Some(conversation) = deps.conversations.find_by_event(event.id).await? else {
            return Ok(HookEffect::TargetMissing);
        };

        match deps
            .conversations
            .set_conversation_status(conversation.id, ConversationStatus::Rejected)
            .await?
        {
            StatusChange::Missing => return Ok(HookEffect::TargetMissing),
            StatusChange::Unchanged => return Ok(HookEffect::AlreadyApplied),
            StatusChange::Applied => {}
        }

        let physician = display_name(deps, conversation.physician_id).await?;
        Ok(HookEffect::applied(vec![Notification::new(
            conversation.patient_id,
            "REJECTED: Private Conversation Request",
            format!(
                "<b>Request Rejected</b><br/>We are sorry to tell you that your private \
                 conversation request to {} is rejected by the administrator",
                physician
            ),
        )]))
    }

    async fn mirror_state(&self, event: &Event, deps: &ServerDeps) -> Result<MirrorState> {
        Ok(match deps.conversations.find_by_event(event.id).await? {
            None => MirrorState::TargetMissing,
            Some(c) if c.status == ConversationStatus::Rejected => MirrorState::InSync,
            Some(_) => MirrorState::Diverged,
        })
    }
}

async fn display_name(deps: &ServerDeps, user_id: UserId) -> Result<String> {
    Ok(deps
        .users
        .get_user_contact(user_id)
        .await?
        .map(|contact| contact.username)
        .unwrap_or_else(|| user_id.to_string()))
}
