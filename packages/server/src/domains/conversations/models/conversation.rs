use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::{ConversationId, EventId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    Pending,
    Open,
    Rejected,
}

impl ConversationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationStatus::Pending => "pending",
            ConversationStatus::Open => "open",
            ConversationStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for ConversationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ConversationStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(ConversationStatus::Pending),
            "open" => Ok(ConversationStatus::Open),
            "rejected" => Ok(ConversationStatus::Rejected),
            _ => Err(anyhow!("Invalid conversation status: {}", s)),
        }
    }
}

/// A private patient/physician channel, opened only after review.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub event_id: EventId,
    pub patient_id: UserId,
    pub physician_id: UserId,
    pub topic: Option<String>,
    pub message: Option<String>,
    /// One-time password, issued when the request is approved.
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub patient_verified: bool,
    pub physician_verified: bool,
    pub status: ConversationStatus,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn is_participant(&self, user_id: UserId) -> bool {
        self.patient_id == user_id || self.physician_id == user_id
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ConversationRow {
    pub id: ConversationId,
    pub event_id: EventId,
    pub patient_id: UserId,
    pub physician_id: UserId,
    pub topic: Option<String>,
    pub message: Option<String>,
    pub password: Option<String>,
    pub patient_verified: bool,
    pub physician_verified: bool,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ConversationRow> for Conversation {
    type Error = anyhow::Error;

    fn try_from(row: ConversationRow) -> Result<Self> {
        Ok(Conversation {
            id: row.id,
            event_id: row.event_id,
            patient_id: row.patient_id,
            physician_id: row.physician_id,
            topic: row.topic,
            message: row.message,
            password: row.password,
            patient_verified: row.patient_verified,
            physician_verified: row.physician_verified,
            status: row.status.parse()?,
            created_at: row.created_at,
        })
    }
}

/// `X` + six hex characters + `X`.
pub fn generate_one_time_password() -> String {
    let raw = uuid::Uuid::new_v4().simple().to_string();
    format!("X{}X", &raw[..6])
}
