use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::{Event, EventType, LedgerDecision, NewEvent, Outcome};
use super::store::{EventFilter, EventLedger};
use crate::common::pagination::trim_results;
use crate::common::{EventId, Page, ValidatedPage};

/// Ledger held in process memory. Used by tests and local tooling.
///
/// The write lock makes `decide` a compare-and-swap, same as the conditional
/// UPDATE in Postgres.
#[derive(Default)]
pub struct InMemoryEventLedger {
    events: RwLock<HashMap<EventId, Event>>,
}

impl InMemoryEventLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite an entry verbatim. Lets tests stage ledger states that the
    /// public operations refuse to produce.
    pub async fn put(&self, event: Event) {
        self.events.write().await.insert(event.id, event);
    }

    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }
}

#[async_trait]
impl EventLedger for InMemoryEventLedger {
    async fn create_event(&self, new_event: NewEvent) -> Result<Event> {
        let event = new_event.into_event(Utc::now());
        self.events.write().await.insert(event.id, event.clone());
        Ok(event)
    }

    async fn get_event(&self, id: EventId) -> Result<Option<Event>> {
        Ok(self.events.read().await.get(&id).cloned())
    }

    async fn list_events(&self, filter: EventFilter, page: ValidatedPage) -> Result<Page<Event>> {
        let events = self.events.read().await;

        let mut matching: Vec<Event> = events
            .values()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        matching.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));

        if let Some(cursor) = page.cursor {
            let Some(anchor) = events.get(&EventId::from_uuid(cursor)) else {
                return Ok(Page::from_trimmed(Vec::new(), false, |e: &Event| e.id.into_uuid()));
            };
            let position = (anchor.created_at, anchor.id);
            matching.retain(|e| (e.created_at, e.id) > position);
        }

        let (items, has_more) = trim_results(matching, page.limit);
        Ok(Page::from_trimmed(items, has_more, |e| e.id.into_uuid()))
    }

    async fn decide(&self, id: EventId, outcome: Outcome) -> Result<LedgerDecision> {
        let mut events = self.events.write().await;

        let Some(event) = events.get_mut(&id) else {
            return Ok(LedgerDecision::NotFound);
        };
        if !event.is_pending() {
            return Ok(LedgerDecision::AlreadyDecided(event.clone()));
        }

        event.status = outcome.terminal_status();
        event.decided_at = Some(Utc::now());
        Ok(LedgerDecision::Decided(event.clone()))
    }

    async fn find_pending_for_target(
        &self,
        event_type: EventType,
        target: Uuid,
    ) -> Result<Option<Event>> {
        let events = self.events.read().await;
        Ok(events
            .values()
            .filter(|e| e.event_type == event_type && e.target == Some(target) && e.is_pending())
            .min_by_key(|e| (e.created_at, e.id))
            .cloned())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
