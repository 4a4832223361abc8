use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::{EventId, PostingId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostingKind {
    /// Threaded discussion; needs review unless posted by an administrator.
    Discussion,
    /// Broadcast announcement; published without review.
    Dissemination,
}

impl PostingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostingKind::Discussion => "discussion",
            PostingKind::Dissemination => "dissemination",
        }
    }
}

impl std::fmt::Display for PostingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PostingKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "discussion" => Ok(PostingKind::Discussion),
            "dissemination" => Ok(PostingKind::Dissemination),
            _ => Err(anyhow!("Invalid posting kind: {}", s)),
        }
    }
}

/// Visibility status, mirroring the posting's review event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostingStatus {
    Pending,
    Open,
    Rejected,
    /// Closed by its author after publication. Still visible, no new replies.
    Terminated,
}

impl PostingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostingStatus::Pending => "pending",
            PostingStatus::Open => "open",
            PostingStatus::Rejected => "rejected",
            PostingStatus::Terminated => "terminated",
        }
    }

    /// Whether the posting has been published at some point.
    pub fn is_published(&self) -> bool {
        matches!(self, PostingStatus::Open | PostingStatus::Terminated)
    }
}

impl std::fmt::Display for PostingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PostingStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(PostingStatus::Pending),
            "open" => Ok(PostingStatus::Open),
            "rejected" => Ok(PostingStatus::Rejected),
            "terminated" => Ok(PostingStatus::Terminated),
            _ => Err(anyhow!("Invalid posting status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub id: PostingId,
    /// Review event; `None` for disseminations.
    pub event_id: Option<EventId>,
    pub author_id: UserId,
    pub kind: PostingKind,
    pub topic: Option<String>,
    pub message: String,
    pub group_id: String,
    pub status: PostingStatus,
    /// Pending citation against this posting, if any.
    pub cite_event_id: Option<EventId>,
    pub created_at: DateTime<Utc>,
}

impl Posting {
    pub fn excerpt(&self) -> String {
        excerpt(&self.message)
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostingRow {
    pub id: PostingId,
    pub event_id: Option<EventId>,
    pub author_id: UserId,
    pub kind: String,
    pub topic: Option<String>,
    pub message: String,
    pub group_id: String,
    pub status: String,
    pub cite_event_id: Option<EventId>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<PostingRow> for Posting {
    type Error = anyhow::Error;

    fn try_from(row: PostingRow) -> Result<Self> {
        Ok(Posting {
            id: row.id,
            event_id: row.event_id,
            author_id: row.author_id,
            kind: row.kind.parse()?,
            topic: row.topic,
            message: row.message,
            group_id: row.group_id,
            status: row.status.parse()?,
            cite_event_id: row.cite_event_id,
            created_at: row.created_at,
        })
    }
}

/// What remains of a posting after it is removed, for telling its author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemovedPosting {
    pub posting_id: PostingId,
    pub author_id: UserId,
    pub excerpt: String,
}

impl From<Posting> for RemovedPosting {
    fn from(posting: Posting) -> Self {
        RemovedPosting {
            posting_id: posting.id,
            author_id: posting.author_id,
            excerpt: posting.excerpt(),
        }
    }
}

const EXCERPT_CHARS: usize = 10;

/// First ten characters of a message followed by an ellipsis.
pub fn excerpt(message: &str) -> String {
    let head: String = message.chars().take(EXCERPT_CHARS).collect();
    format!("{}...", head)
}
