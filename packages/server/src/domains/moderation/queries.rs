//! Review queues: ledger entries joined with the entities they concern.
//!
//! Entities deleted since their event was recorded show up as `None` in the
//! row instead of failing the listing.

use serde::Serialize;

use super::errors::ModerationResult;
use super::hooks::posting::reviewed_posting;
use crate::common::{Page, PostingId, UserId, ValidatedPage};
use crate::domains::conversations::Conversation;
use crate::domains::events::{Event, EventFilter, EventStatus, EventType};
use crate::domains::postings::{CitationNote, Posting};
use crate::domains::users::{User, UserContact};
use crate::kernel::ServerDeps;

#[derive(Debug, Clone, Serialize)]
pub struct ReviewRow {
    pub event: Event,
    pub subject: ReviewSubject,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReviewSubject {
    Registration {
        user: Option<User>,
        /// Associate physician named by a patient or nurse.
        associate: Option<UserContact>,
    },
    Posting {
        posting: Option<Posting>,
    },
    Cite {
        posting: Option<Posting>,
        informer: Option<UserContact>,
        author: Option<UserContact>,
        citation: Option<CitationNote>,
    },
    PrivateRequest {
        conversation: Option<Conversation>,
        patient: Option<UserContact>,
        physician: Option<UserContact>,
    },
}

/// One page of the review list for `event_type`, oldest first.
pub async fn review_queue(
    deps: &ServerDeps,
    event_type: EventType,
    status: EventStatus,
    page: ValidatedPage,
) -> ModerationResult<Page<ReviewRow>> {
    let filter = EventFilter {
        event_type: Some(event_type),
        status: Some(status),
    };
    let events = deps.events.list_events(filter, page).await?;

    let mut rows = Vec::with_capacity(events.items.len());
    for event in &events.items {
        let subject = load_subject(deps, event).await?;
        rows.push(ReviewRow {
            event: event.clone(),
            subject,
        });
    }

    Ok(Page {
        items: rows,
        has_next_page: events.has_next_page,
        end_cursor: events.end_cursor,
    })
}

async fn load_subject(deps: &ServerDeps, event: &Event) -> ModerationResult<ReviewSubject> {
    Ok(match event.event_type {
        EventType::Registration => {
            let user = match event.target.map(UserId::from_uuid) {
                Some(user_id) => deps.users.find_by_id(user_id).await?,
                None => None,
            };
            let associate = match user.as_ref().and_then(|u| u.associate_id) {
                Some(associate_id) => deps.users.get_user_contact(associate_id).await?,
                None => None,
            };
            ReviewSubject::Registration { user, associate }
        }
        EventType::Posting => ReviewSubject::Posting {
            posting: reviewed_posting(event, deps).await?,
        },
        EventType::Cite => {
            let posting = match event.target.map(PostingId::from_uuid) {
                Some(posting_id) => deps.postings.find_by_id(posting_id).await?,
                None => None,
            };
            let informer = contact(deps, event.initiator.user_id()).await?;
            let author = contact(deps, posting.as_ref().map(|p| p.author_id)).await?;
            let citation = event
                .note
                .as_deref()
                .and_then(|note| CitationNote::parse(note).ok());
            ReviewSubject::Cite {
                posting,
                informer,
                author,
                citation,
            }
        }
        EventType::PrivateRequest => {
            let conversation = deps.conversations.find_by_event(event.id).await?;
            let patient = contact(deps, event.initiator.user_id()).await?;
            let physician = contact(deps, event.target.map(UserId::from_uuid)).await?;
            ReviewSubject::PrivateRequest {
                conversation,
                patient,
                physician,
            }
        }
    })
}

async fn contact(deps: &ServerDeps, user_id: Option<UserId>) -> ModerationResult<Option<UserContact>> {
    Ok(match user_id {
        Some(user_id) => deps.users.get_user_contact(user_id).await?,
        None => None,
    })
}
