use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;

use super::models::{Conversation, ConversationRow, ConversationStatus};
use crate::common::{ConversationId, EventId, StatusChange, UserId};

#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn insert(&self, conversation: &Conversation) -> Result<Conversation>;

    async fn find_by_id(&self, id: ConversationId) -> Result<Option<Conversation>>;

    async fn find_by_event(&self, event_id: EventId) -> Result<Option<Conversation>>;

    /// Open a conversation and store its one-time password.
    ///
    /// `Unchanged` if it is already open, so a password is issued at most once.
    async fn open_conversation(&self, id: ConversationId, password: &str) -> Result<StatusChange>;

    async fn set_conversation_status(
        &self,
        id: ConversationId,
        status: ConversationStatus,
    ) -> Result<StatusChange>;

    /// Record that `user_id` presented the conversation password.
    async fn mark_participant_verified(&self, id: ConversationId, user_id: UserId) -> Result<bool>;
}

pub struct PostgresConversationStore {
    pool: PgPool,
}

impl PostgresConversationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn change_or_probe(&self, id: ConversationId, rows_affected: u64) -> Result<StatusChange> {
        if rows_affected > 0 {
            return Ok(StatusChange::Applied);
        }
        Ok(match self.find_by_id(id).await? {
            Some(_) => StatusChange::Unchanged,
            None => StatusChange::Missing,
        })
    }
}

#[async_trait]
impl ConversationStore for PostgresConversationStore {
    async fn insert(&self, conversation: &Conversation) -> Result<Conversation> {
        let row = sqlx::query_as::<_, ConversationRow>(
            "INSERT INTO conversations
                (id, event_id, patient_id, physician_id, topic, message, password,
                 patient_verified, physician_verified, status, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING *",
        )
        .bind(conversation.id)
        .bind(conversation.event_id)
        .bind(conversation.patient_id)
        .bind(conversation.physician_id)
        .bind(&conversation.topic)
        .bind(&conversation.message)
        .bind(&conversation.password)
        .bind(conversation.patient_verified)
        .bind(conversation.physician_verified)
        .bind(conversation.status.as_str())
        .bind(conversation.created_at)
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert conversation")?;

        row.try_into()
    }

    async fn find_by_id(&self, id: ConversationId) -> Result<Option<Conversation>> {
        sqlx::query_as::<_, ConversationRow>("SELECT * FROM conversations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to load conversation")?
            .map(Conversation::try_from)
            .transpose()
    }

    async fn find_by_event(&self, event_id: EventId) -> Result<Option<Conversation>> {
        sqlx::query_as::<_, ConversationRow>("SELECT * FROM conversations WHERE event_id = $1")
            .bind(event_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to load conversation by event")?
            .map(Conversation::try_from)
            .transpose()
    }

    async fn open_conversation(&self, id: ConversationId, password: &str) -> Result<StatusChange> {
        let result = sqlx::query(
            "UPDATE conversations SET status = 'open', password = $2
             WHERE id = $1 AND status <> 'open'",
        )
        .bind(id)
        .bind(password)
        .execute(&self.pool)
        .await
        .context("Failed to open conversation")?;

        self.change_or_probe(id, result.rows_affected()).await
    }

    async fn set_conversation_status(
        &self,
        id: ConversationId,
        status: ConversationStatus,
    ) -> Result<StatusChange> {
        let result =
            sqlx::query("UPDATE conversations SET status = $2 WHERE id = $1 AND status <> $2")
                .bind(id)
                .bind(status.as_str())
                .execute(&self.pool)
                .await
                .context("Failed to update conversation status")?;

        self.change_or_probe(id, result.rows_affected()).await
    }

    async fn mark_participant_verified(&self, id: ConversationId, user_id: UserId) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE conversations
             SET patient_verified = patient_verified OR patient_id = $2,
                 physician_verified = physician_verified OR physician_id = $2
             WHERE id = $1 AND (patient_id = $2 OR physician_id = $2)",
        )
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .context("Failed to verify conversation participant")?;

        Ok(result.rows_affected() > 0)
    }
}
