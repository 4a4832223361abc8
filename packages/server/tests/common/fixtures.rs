//! Test fixtures for staging users, postings, conversations and events.
//!
//! Fixtures write straight into the stores so a test can set up any state,
//! including states the actions themselves would refuse to produce.

use chrono::{DateTime, Duration, TimeZone, Utc};
use moderation_core::common::{ConversationId, EventId, PostingId, UserId};
use moderation_core::domains::conversations::{Conversation, ConversationStatus};
use moderation_core::domains::events::{Event, EventType, Initiator, NewEvent};
use moderation_core::domains::postings::{CitationNote, Posting, PostingKind, PostingStatus};
use moderation_core::domains::users::{NewUser, User, UserRole, UserStatus};
use moderation_core::kernel::ServerDeps;

/// A fixed instant `minutes` after a reference time, for ordering tests.
pub fn at_minute(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap() + Duration::minutes(minutes)
}

pub fn email_of(username: &str) -> String {
    format!("{}@example.org", username)
}

/// Insert an account with an email address and the given status.
pub async fn create_user(
    deps: &ServerDeps,
    username: &str,
    role: UserRole,
    status: UserStatus,
) -> User {
    let new_user = NewUser::builder()
        .username(username)
        .full_name(format!("{} Test", username))
        .role(role)
        .email(email_of(username))
        .status(status)
        .build();

    deps.users
        .insert_user(new_user, "abc123")
        .await
        .unwrap()
        .expect("username already taken")
}

pub async fn create_verified_user(deps: &ServerDeps, username: &str, role: UserRole) -> User {
    create_user(deps, username, role, UserStatus::Verified).await
}

/// A discussion awaiting review, with its pending `posting` event.
pub async fn create_pending_discussion(
    deps: &ServerDeps,
    author_id: UserId,
    message: &str,
) -> (PostingId, EventId) {
    let posting_id = PostingId::new();
    let event = deps
        .events
        .create_event(
            NewEvent::builder()
                .event_type(EventType::Posting)
                .initiator(Initiator::User(author_id))
                .target(posting_id.into_uuid())
                .build(),
        )
        .await
        .unwrap();

    deps.postings
        .insert(&Posting {
            id: posting_id,
            event_id: Some(event.id),
            author_id,
            kind: PostingKind::Discussion,
            topic: Some("General".to_string()),
            message: message.to_string(),
            group_id: "PPA".to_string(),
            status: PostingStatus::Pending,
            cite_event_id: None,
            created_at: Utc::now(),
        })
        .await
        .unwrap();

    (posting_id, event.id)
}

/// A published posting with no review event.
pub async fn create_open_posting(deps: &ServerDeps, author_id: UserId, message: &str) -> PostingId {
    let posting = deps
        .postings
        .insert(&Posting {
            id: PostingId::new(),
            event_id: None,
            author_id,
            kind: PostingKind::Discussion,
            topic: None,
            message: message.to_string(),
            group_id: "PPA".to_string(),
            status: PostingStatus::Open,
            cite_event_id: None,
            created_at: Utc::now(),
        })
        .await
        .unwrap();
    posting.id
}

/// A pending `cite` event against `posting_id`, flagging the posting.
pub async fn create_citation(
    deps: &ServerDeps,
    informer_id: UserId,
    posting_id: PostingId,
    kind: &str,
    reason: &str,
) -> Event {
    let event = deps
        .events
        .create_event(
            NewEvent::builder()
                .event_type(EventType::Cite)
                .initiator(Initiator::User(informer_id))
                .target(posting_id.into_uuid())
                .note(CitationNote::new(kind, reason).encode())
                .build(),
        )
        .await
        .unwrap();
    deps.postings.flag_posting(posting_id, event.id).await.unwrap();
    event
}

/// A pending `private_request` event and its conversation.
pub async fn create_conversation_request(
    deps: &ServerDeps,
    patient_id: UserId,
    physician_id: UserId,
) -> (ConversationId, EventId) {
    let event = deps
        .events
        .create_event(
            NewEvent::builder()
                .event_type(EventType::PrivateRequest)
                .initiator(Initiator::User(patient_id))
                .target(physician_id.into_uuid())
                .build(),
        )
        .await
        .unwrap();

    let conversation = deps
        .conversations
        .insert(&Conversation {
            id: ConversationId::new(),
            event_id: event.id,
            patient_id,
            physician_id,
            topic: Some("Follow-up".to_string()),
            message: Some("Can we talk about my results?".to_string()),
            password: None,
            patient_verified: false,
            physician_verified: false,
            status: ConversationStatus::Pending,
            created_at: Utc::now(),
        })
        .await
        .unwrap();

    (conversation.id, event.id)
}

/// A pending `registration` event for `user_id`, created at `created_at`.
pub async fn create_registration_event(
    deps: &ServerDeps,
    user_id: UserId,
    created_at: DateTime<Utc>,
) -> Event {
    deps.events
        .create_event(
            NewEvent::builder()
                .event_type(EventType::Registration)
                .initiator(Initiator::Admin)
                .target(user_id.into_uuid())
                .created_at(created_at)
                .build(),
        )
        .await
        .unwrap()
}
