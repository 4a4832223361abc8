use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::models::{Conversation, ConversationStatus};
use super::store::ConversationStore;
use crate::common::{ConversationId, EventId, StatusChange, UserId};

#[derive(Default)]
pub struct InMemoryConversationStore {
    conversations: RwLock<HashMap<ConversationId, Conversation>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a conversation verbatim, bypassing the store's transitions.
    pub async fn put(&self, conversation: Conversation) {
        self.conversations
            .write()
            .await
            .insert(conversation.id, conversation);
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn insert(&self, conversation: &Conversation) -> Result<Conversation> {
        let mut conversations = self.conversations.write().await;
        if conversations.contains_key(&conversation.id) {
            bail!("Conversation {} already exists", conversation.id);
        }
        conversations.insert(conversation.id, conversation.clone());
        Ok(conversation.clone())
    }

    async fn find_by_id(&self, id: ConversationId) -> Result<Option<Conversation>> {
        Ok(self.conversations.read().await.get(&id).cloned())
    }

    async fn find_by_event(&self, event_id: EventId) -> Result<Option<Conversation>> {
        Ok(self
            .conversations
            .read()
            .await
            .values()
            .find(|c| c.event_id == event_id)
            .cloned())
    }

    async fn open_conversation(&self, id: ConversationId, password: &str) -> Result<StatusChange> {
        let mut conversations = self.conversations.write().await;
        Ok(match conversations.get_mut(&id) {
            None => StatusChange::Missing,
            Some(c) if c.status == ConversationStatus::Open => StatusChange::Unchanged,
            Some(c) => {
                c.status = ConversationStatus::Open;
                c.password = Some(password.to_string());
                StatusChange::Applied
            }
        })
    }

    async fn set_conversation_status(
        &self,
        id: ConversationId,
        status: ConversationStatus,
    ) -> Result<StatusChange> {
        let mut conversations = self.conversations.write().await;
        Ok(match conversations.get_mut(&id) {
            None => StatusChange::Missing,
            Some(c) if c.status == status => StatusChange::Unchanged,
            Some(c) => {
                c.status = status;
                StatusChange::Applied
            }
        })
    }

    async fn mark_participant_verified(&self, id: ConversationId, user_id: UserId) -> Result<bool> {
        let mut conversations = self.conversations.write().await;
        let Some(c) = conversations.get_mut(&id) else {
            return Ok(false);
        };
        if !c.is_participant(user_id) {
            return Ok(false);
        }
        if c.patient_id == user_id {
            c.patient_verified = true;
        }
        if c.physician_id == user_id {
            c.physician_verified = true;
        }
        Ok(true)
    }
}
