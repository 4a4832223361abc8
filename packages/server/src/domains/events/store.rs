//! The event ledger: durable record of every decidable administrator action.
//!
//! `decide` is the only operation that mutates an existing entry, and it does
//! so through a conditional `pending -> terminal` transition so concurrent
//! deciders cannot both win.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use super::models::{Event, EventRow, EventStatus, EventType, LedgerDecision, NewEvent, Outcome};
use crate::common::pagination::trim_results;
use crate::common::{EventId, Page, ValidatedPage};

/// Listing filter. `None` fields match everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventFilter {
    pub event_type: Option<EventType>,
    pub status: Option<EventStatus>,
}

impl EventFilter {
    /// Pending entries of one type: the administrator review queue.
    pub fn pending(event_type: EventType) -> Self {
        Self {
            event_type: Some(event_type),
            status: Some(EventStatus::Pending),
        }
    }

    pub fn matches(&self, event: &Event) -> bool {
        self.event_type.map_or(true, |t| t == event.event_type)
            && self.status.map_or(true, |s| s == event.status)
    }
}

#[async_trait]
pub trait EventLedger: Send + Sync {
    async fn create_event(&self, new_event: NewEvent) -> Result<Event>;

    async fn get_event(&self, id: EventId) -> Result<Option<Event>>;

    /// Entries matching `filter`, oldest first.
    async fn list_events(&self, filter: EventFilter, page: ValidatedPage) -> Result<Page<Event>>;

    /// Conditionally move a pending entry to the outcome's terminal status.
    async fn decide(&self, id: EventId, outcome: Outcome) -> Result<LedgerDecision>;

    /// The pending entry of `event_type` concerning `target`, if any.
    async fn find_pending_for_target(
        &self,
        event_type: EventType,
        target: Uuid,
    ) -> Result<Option<Event>>;

    /// Connectivity check for health probes.
    async fn ping(&self) -> Result<()>;
}

// =============================================================================
// Postgres
// =============================================================================

pub struct PostgresEventLedger {
    pool: PgPool,
}

impl PostgresEventLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventLedger for PostgresEventLedger {
    async fn create_event(&self, new_event: NewEvent) -> Result<Event> {
        let event = new_event.into_event(Utc::now());

        let row = sqlx::query_as::<_, EventRow>(
            "INSERT INTO moderation_events
                (id, event_type, initiator, target, created_at, decided_at, status, note)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING *",
        )
        .bind(event.id)
        .bind(event.event_type.as_str())
        .bind(event.initiator.to_string())
        .bind(event.target)
        .bind(event.created_at)
        .bind(event.decided_at)
        .bind(event.status.as_str())
        .bind(&event.note)
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert moderation event")?;

        row.try_into()
    }

    async fn get_event(&self, id: EventId) -> Result<Option<Event>> {
        sqlx::query_as::<_, EventRow>("SELECT * FROM moderation_events WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to load moderation event")?
            .map(Event::try_from)
            .transpose()
    }

    async fn list_events(&self, filter: EventFilter, page: ValidatedPage) -> Result<Page<Event>> {
        let rows = sqlx::query_as::<_, EventRow>(
            "SELECT * FROM moderation_events
             WHERE ($1::text IS NULL OR event_type = $1)
               AND ($2::text IS NULL OR status = $2)
               AND ($3::uuid IS NULL OR (created_at, id) > (
                    SELECT created_at, id FROM moderation_events WHERE id = $3))
             ORDER BY created_at ASC, id ASC
             LIMIT $4",
        )
        .bind(filter.event_type.map(|t| t.as_str()))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(page.cursor)
        .bind(page.fetch_limit())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list moderation events")?;

        let events = rows
            .into_iter()
            .map(Event::try_from)
            .collect::<Result<Vec<_>>>()?;
        let (events, has_more) = trim_results(events, page.limit);

        Ok(Page::from_trimmed(events, has_more, |e| e.id.into_uuid()))
    }

    async fn decide(&self, id: EventId, outcome: Outcome) -> Result<LedgerDecision> {
        let updated = sqlx::query_as::<_, EventRow>(
            "UPDATE moderation_events
             SET status = $2, decided_at = NOW()
             WHERE id = $1 AND status = 'pending'
             RETURNING *",
        )
        .bind(id)
        .bind(outcome.terminal_status().as_str())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to decide moderation event")?;

        if let Some(row) = updated {
            return Ok(LedgerDecision::Decided(row.try_into()?));
        }

        // Lost the race or never existed; the caller needs to know which.
        Ok(match self.get_event(id).await? {
            Some(existing) => LedgerDecision::AlreadyDecided(existing),
            None => LedgerDecision::NotFound,
        })
    }

    async fn find_pending_for_target(
        &self,
        event_type: EventType,
        target: Uuid,
    ) -> Result<Option<Event>> {
        sqlx::query_as::<_, EventRow>(
            "SELECT * FROM moderation_events
             WHERE event_type = $1 AND target = $2 AND status = 'pending'
             ORDER BY created_at ASC
             LIMIT 1",
        )
        .bind(event_type.as_str())
        .bind(target)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to look up pending moderation event")?
        .map(Event::try_from)
        .transpose()
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("Event ledger unreachable")?;
        Ok(())
    }
}
