use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;
use uuid::Uuid;

use crate::common::{EventId, UserId};

/// Kind of action awaiting administrator sign-off.
///
/// Each variant has its own approve/reject hooks in the moderation registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Registration,
    Posting,
    Cite,
    PrivateRequest,
}

impl EventType {
    pub const ALL: [EventType; 4] = [
        EventType::Registration,
        EventType::Posting,
        EventType::Cite,
        EventType::PrivateRequest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Registration => "registration",
            EventType::Posting => "posting",
            EventType::Cite => "cite",
            EventType::PrivateRequest => "private_request",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "registration" => Ok(EventType::Registration),
            "posting" => Ok(EventType::Posting),
            "cite" => Ok(EventType::Cite),
            "private_request" => Ok(EventType::PrivateRequest),
            _ => Err(anyhow!("Invalid event type: {}", s)),
        }
    }
}

/// Ledger status. `Approved` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Pending,
    Approved,
    Rejected,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Pending => "pending",
            EventStatus::Approved => "approved",
            EventStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, EventStatus::Pending)
    }

    /// The decision that produced this status, if any.
    pub fn outcome(&self) -> Option<Outcome> {
        match self {
            EventStatus::Pending => None,
            EventStatus::Approved => Some(Outcome::Approve),
            EventStatus::Rejected => Some(Outcome::Reject),
        }
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(EventStatus::Pending),
            "approved" => Ok(EventStatus::Approved),
            "rejected" => Ok(EventStatus::Rejected),
            _ => Err(anyhow!("Invalid event status: {}", s)),
        }
    }
}

/// An administrator's decision on a pending event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Approve,
    Reject,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Approve => "approve",
            Outcome::Reject => "reject",
        }
    }

    /// Terminal ledger status this decision moves an event to.
    pub fn terminal_status(&self) -> EventStatus {
        match self {
            Outcome::Approve => EventStatus::Approved,
            Outcome::Reject => EventStatus::Rejected,
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Outcome {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "approve" => Ok(Outcome::Approve),
            "reject" => Ok(Outcome::Reject),
            _ => Err(anyhow!("Invalid outcome: {}", s)),
        }
    }
}

/// Who triggered an event: a user, or the administrator actor itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Initiator {
    Admin,
    User(UserId),
}

impl Initiator {
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Initiator::Admin => None,
            Initiator::User(id) => Some(*id),
        }
    }
}

impl std::fmt::Display for Initiator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Initiator::Admin => f.write_str("admin"),
            Initiator::User(id) => write!(f, "{}", id),
        }
    }
}

impl std::str::FromStr for Initiator {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        if s == "admin" {
            return Ok(Initiator::Admin);
        }
        UserId::parse(s)
            .map(Initiator::User)
            .map_err(|_| anyhow!("Invalid initiator: {}", s))
    }
}

impl Serialize for Initiator {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Initiator {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A ledger entry: one decidable administrator action.
///
/// Only `status` and `decided_at` ever change after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub event_type: EventType,
    pub initiator: Initiator,
    /// Entity the event concerns; what it points at depends on `event_type`.
    pub target: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
    pub status: EventStatus,
    /// Type-specific payload (e.g. `"spam@@off-topic"` for citations).
    pub note: Option<String>,
}

impl Event {
    pub fn is_pending(&self) -> bool {
        self.status == EventStatus::Pending
    }
}

/// Raw `moderation_events` row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventRow {
    pub id: EventId,
    pub event_type: String,
    pub initiator: String,
    pub target: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
    pub status: String,
    pub note: Option<String>,
}

impl TryFrom<EventRow> for Event {
    type Error = anyhow::Error;

    fn try_from(row: EventRow) -> Result<Self> {
        Ok(Event {
            id: row.id,
            event_type: row.event_type.parse()?,
            initiator: row.initiator.parse()?,
            target: row.target,
            created_at: row.created_at,
            decided_at: row.decided_at,
            status: row.status.parse()?,
            note: row.note,
        })
    }
}

/// Input for a new ledger entry.
#[derive(Debug, Clone, TypedBuilder)]
pub struct NewEvent {
    pub event_type: EventType,
    pub initiator: Initiator,
    #[builder(default, setter(strip_option))]
    pub target: Option<Uuid>,
    #[builder(default, setter(strip_option, into))]
    pub note: Option<String>,
    /// Backdated creation time; defaults to now.
    #[builder(default, setter(strip_option))]
    pub created_at: Option<DateTime<Utc>>,
    /// Record the entry as already decided at its creation time.
    ///
    /// Used when the acting user is an administrator, whose actions need no review.
    #[builder(default, setter(strip_option))]
    pub decided: Option<Outcome>,
}

impl NewEvent {
    /// Materialize the row this input describes.
    pub fn into_event(self, now: DateTime<Utc>) -> Event {
        let created_at = self.created_at.unwrap_or(now);
        let (status, decided_at) = match self.decided {
            Some(outcome) => (outcome.terminal_status(), Some(created_at)),
            None => (EventStatus::Pending, None),
        };

        Event {
            id: EventId::new(),
            event_type: self.event_type,
            initiator: self.initiator,
            target: self.target,
            created_at,
            decided_at,
            status,
            note: self.note,
        }
    }
}

/// Convert a caller-supplied Unix epoch (seconds) into a creation timestamp.
pub fn created_at_from_epoch(epoch_seconds: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(epoch_seconds, 0)
        .ok_or_else(|| anyhow!("Timestamp out of range: {}", epoch_seconds))
}

/// Result of the ledger's conditional `pending -> outcome` transition.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerDecision {
    /// This call moved the event to its terminal status.
    Decided(Event),
    /// Someone else decided it first; the event is returned unchanged.
    AlreadyDecided(Event),
    NotFound,
}
