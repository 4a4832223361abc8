use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;

use super::models::{Posting, PostingRow, PostingStatus, RemovedPosting};
use crate::common::{EventId, PostingId, StatusChange};

#[async_trait]
pub trait PostingStore: Send + Sync {
    async fn insert(&self, posting: &Posting) -> Result<Posting>;

    async fn find_by_id(&self, id: PostingId) -> Result<Option<Posting>>;

    /// The posting whose review event is `event_id`.
    async fn find_by_event(&self, event_id: EventId) -> Result<Option<Posting>>;

    async fn set_posting_status(&self, id: PostingId, status: PostingStatus) -> Result<StatusChange>;

    /// Move a posting to `to` only while it is still in `from`.
    ///
    /// `Unchanged` when the posting has since moved on.
    async fn transition_posting(
        &self,
        id: PostingId,
        from: PostingStatus,
        to: PostingStatus,
    ) -> Result<StatusChange>;

    /// Delete a posting, returning what its author should be told.
    async fn delete_posting(&self, id: PostingId) -> Result<Option<RemovedPosting>>;

    /// Mark a posting as cited by `event_id`. `Unchanged` if it already carries a citation.
    async fn flag_posting(&self, id: PostingId, event_id: EventId) -> Result<StatusChange>;

    /// Remove the citation marker left by `event_id`.
    async fn clear_flag(&self, id: PostingId, event_id: EventId) -> Result<StatusChange>;

    async fn ping(&self) -> Result<()>;
}

pub struct PostgresPostingStore {
    pool: PgPool,
}

impl PostgresPostingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn change_or_probe(&self, id: PostingId, rows_affected: u64) -> Result<StatusChange> {
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
impl PostingStore for PostgresPostingStore {
    async fn insert(&self, posting: &Posting) -> Result<Posting> {
        let row = sqlx::query_as::<_, PostingRow>(
            "INSERT INTO postings
                (id, event_id, author_id, kind, topic, message, group_id, status,
                 cite_event_id, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING *",
        )
        .bind(posting.id)
        .bind(posting.event_id)
        .bind(posting.author_id)
        .bind(posting.kind.as_str())
        .bind(&posting.topic)
        .bind(&posting.message)
        .bind(&posting.group_id)
        .bind(posting.status.as_str())
        .bind(posting.cite_event_id)
        .bind(posting.created_at)
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert posting")?;

        row.try_into()
    }

    async fn find_by_id(&self, id: PostingId) -> Result<Option<Posting>> {
        sqlx::query_as::<_, PostingRow>("SELECT * FROM postings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to load posting")?
            .map(Posting::try_from)
            .transpose()
    }

    async fn find_by_event(&self, event_id: EventId) -> Result<Option<Posting>> {
        sqlx::query_as::<_, PostingRow>("SELECT * FROM postings WHERE event_id = $1")
            .bind(event_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to load posting by event")?
            .map(Posting::try_from)
            .transpose()
    }

    async fn set_posting_status(&self, id: PostingId, status: PostingStatus) -> Result<StatusChange> {
        let result = sqlx::query("UPDATE postings SET status = $2 WHERE id = $1 AND status <> $2")
            .bind(id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await
            .context("Failed to update posting status")?;

        self.change_or_probe(id, result.rows_affected()).await
    }

    async fn transition_posting(
        &self,
        id: PostingId,
        from: PostingStatus,
        to: PostingStatus,
    ) -> Result<StatusChange> {
        let result = sqlx::query("UPDATE postings SET status = $3 WHERE id = $1 AND status = $2")
            .bind(id)
            .bind(from.as_str())
            .bind(to.as_str())
            .execute(&self.pool)
            .await
            .context("Failed to transition posting status")?;

        self.change_or_probe(id, result.rows_affected()).await
    }

    async fn delete_posting(&self, id: PostingId) -> Result<Option<RemovedPosting>> {
        sqlx::query_as::<_, PostingRow>("DELETE FROM postings WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to delete posting")?
            .map(|row| Posting::try_from(row).map(RemovedPosting::from))
            .transpose()
    }

    async fn flag_posting(&self, id: PostingId, event_id: EventId) -> Result<StatusChange> {
        let result = sqlx::query(
            "UPDATE postings SET cite_event_id = $2 WHERE id = $1 AND cite_event_id IS NULL",
        )
        .bind(id)
        .bind(event_id)
        .execute(&self.pool)
        .await
        .context("Failed to flag posting")?;

        self.change_or_probe(id, result.rows_affected()).await
    }

    async fn clear_flag(&self, id: PostingId, event_id: EventId) -> Result<StatusChange> {
        let result = sqlx::query(
            "UPDATE postings SET cite_event_id = NULL WHERE id = $1 AND cite_event_id = $2",
        )
        .bind(id)
        .bind(event_id)
        .execute(&self.pool)
        .await
        .context("Failed to clear posting flag")?;

        self.change_or_probe(id, result.rows_affected()).await
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("Posting store unreachable")?;
        Ok(())
    }
}
