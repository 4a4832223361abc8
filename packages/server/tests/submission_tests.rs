//! User actions that put events in front of administrators.

mod common;

use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use moderation_core::common::{EventId, PostingId, StatusChange, UserId};
use moderation_core::domains::conversations::{
    request_private_conversation, validate_conversation_password, ConversationRequest,
    ConversationStatus,
};
use moderation_core::domains::events::{EventFilter, EventStatus, EventType, Initiator, Outcome};
use moderation_core::domains::moderation::ModerationError;
use moderation_core::domains::postings::{
    cite_posting, submit_posting, terminate_posting, CitationRequest, InMemoryPostingStore,
    Posting, PostingKind, PostingStatus, PostingStore, PostingSubmission, RemovedPosting,
};
use moderation_core::domains::users::{register_user, RegistrationRequest, UserRole, UserStatus};
use test_context::test_context;

use crate::common::*;

fn registration(username: &str, role: UserRole, associate_id: Option<UserId>) -> RegistrationRequest {
    RegistrationRequest {
        username: username.to_string(),
        full_name: format!("{} Example", username),
        role,
        email: Some(email_of(username)),
        mobile: None,
        preferred_contact: None,
        associate_id,
        hospital_reference: Some("MRN-0042".to_string()),
    }
}

fn discussion(message: &str) -> PostingSubmission {
    PostingSubmission {
        kind: PostingKind::Discussion,
        topic: Some("Recovery".to_string()),
        message: message.to_string(),
        group_id: "PPA".to_string(),
    }
}

fn citation(kind: &str, reason: &str) -> CitationRequest {
    CitationRequest {
        kind: kind.to_string(),
        reason: reason.to_string(),
    }
}

// ============================================================================
// Registration
// ============================================================================

#[test_context(TestHarness)]
#[tokio::test]
async fn test_registration_queues_pending_account(ctx: &TestHarness) {
    let physician = create_verified_user(&ctx.deps, "doc", UserRole::Physician).await;

    let result = register_user(registration("pat", UserRole::Patient, Some(physician.id)), &ctx.deps)
        .await
        .unwrap();

    let user = ctx.deps.users.find_by_id(result.user_id).await.unwrap().unwrap();
    assert_eq!(user.status, UserStatus::Pending);
    let event = ctx.moderation.get_event(result.event_id).await.unwrap().unwrap();
    assert_eq!(event.event_type, EventType::Registration);
    assert_eq!(event.status, EventStatus::Pending);
    assert_eq!(event.initiator, Initiator::Admin);
    assert_eq!(event.target, Some(result.user_id.into_uuid()));
    assert_eq!(event.note.as_deref(), Some("MRN-0042"));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_registration_with_missing_associate_never_reaches_ledger(ctx: &TestHarness) {
    let result = register_user(registration("pat", UserRole::Patient, Some(UserId::new())), &ctx.deps).await;

    assert!(matches!(result, Err(ModerationError::PreconditionFailed(_))));
    assert_eq!(ctx.stores.events.len().await, 0);
    assert_eq!(ctx.stores.users.count().await, 0);
    let pending = ctx
        .moderation
        .list_pending(EventType::Registration, Default::default())
        .await
        .unwrap();
    assert!(pending.items.is_empty());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_registration_with_non_physician_associate_fails(ctx: &TestHarness) {
    let nurse = create_verified_user(&ctx.deps, "nurse", UserRole::Nurse).await;

    let result = register_user(registration("pat", UserRole::Patient, Some(nurse.id)), &ctx.deps).await;

    assert!(matches!(result, Err(ModerationError::PreconditionFailed(_))));
    assert_eq!(ctx.stores.events.len().await, 0);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_nurse_without_associate_fails(ctx: &TestHarness) {
    let result = register_user(registration("nurse", UserRole::Nurse, None), &ctx.deps).await;

    assert!(matches!(result, Err(ModerationError::PreconditionFailed(_))));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_physician_needs_no_associate(ctx: &TestHarness) {
    let result = register_user(registration("doc", UserRole::Physician, None), &ctx.deps).await;

    assert!(result.is_ok());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_admin_cannot_self_register(ctx: &TestHarness) {
    let result = register_user(registration("root", UserRole::Admin, None), &ctx.deps).await;

    assert!(matches!(result, Err(ModerationError::PreconditionFailed(_))));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_registration_requires_contact(ctx: &TestHarness) {
    let mut request = registration("doc", UserRole::Physician, None);
    request.email = Some("   ".to_string());

    let result = register_user(request, &ctx.deps).await;

    assert!(matches!(result, Err(ModerationError::PreconditionFailed(_))));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_taken_username_conflicts(ctx: &TestHarness) {
    create_verified_user(&ctx.deps, "doc", UserRole::Physician).await;

    let result = register_user(registration("doc", UserRole::Physician, None), &ctx.deps).await;

    assert!(matches!(result, Err(ModerationError::Conflict(_))));
    assert_eq!(ctx.stores.events.len().await, 0);
}

// ============================================================================
// Postings
// ============================================================================

/// Posting store that refuses new postings; reads and updates go to the
/// in-memory store.
struct RefusingInserts(Arc<InMemoryPostingStore>);

#[async_trait]
impl PostingStore for RefusingInserts {
    async fn insert(&self, _posting: &Posting) -> Result<Posting> {
        bail!("postings table is read-only")
    }

    async fn find_by_id(&self, id: PostingId) -> Result<Option<Posting>> {
        self.0.find_by_id(id).await
    }

    async fn find_by_event(&self, event_id: EventId) -> Result<Option<Posting>> {
        self.0.find_by_event(event_id).await
    }

    async fn set_posting_status(&self, id: PostingId, status: PostingStatus) -> Result<StatusChange> {
        self.0.set_posting_status(id, status).await
    }

    async fn transition_posting(
        &self,
        id: PostingId,
        from: PostingStatus,
        to: PostingStatus,
    ) -> Result<StatusChange> {
        self.0.transition_posting(id, from, to).await
    }

    async fn delete_posting(&self, id: PostingId) -> Result<Option<RemovedPosting>> {
        self.0.delete_posting(id).await
    }

    async fn flag_posting(&self, id: PostingId, event_id: EventId) -> Result<StatusChange> {
        self.0.flag_posting(id, event_id).await
    }

    async fn clear_flag(&self, id: PostingId, event_id: EventId) -> Result<StatusChange> {
        self.0.clear_flag(id, event_id).await
    }

    async fn ping(&self) -> Result<()> {
        self.0.ping().await
    }
}

#[tokio::test]
async fn test_failed_posting_insert_withdraws_its_event() {
    let ctx = TestHarness::with_deps(|stores, deps| {
        deps.postings = Arc::new(RefusingInserts(stores.postings.clone()));
    });
    let author = create_verified_user(&ctx.deps, "pat", UserRole::Patient).await;

    let result = submit_posting(author.id, false, discussion("Lost in transit"), &ctx.deps).await;

    assert!(matches!(result, Err(ModerationError::Unavailable(_))));
    let events = ctx
        .moderation
        .list_events(EventFilter::default(), Default::default())
        .await
        .unwrap();
    assert_eq!(events.items.len(), 1);
    assert_eq!(events.items[0].event_type, EventType::Posting);
    assert_eq!(events.items[0].status, EventStatus::Rejected);
    let pending = ctx
        .moderation
        .list_pending(EventType::Posting, Default::default())
        .await
        .unwrap();
    assert!(pending.items.is_empty());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_discussion_waits_for_review(ctx: &TestHarness) {
    let author = create_verified_user(&ctx.deps, "pat", UserRole::Patient).await;

    let receipt = submit_posting(author.id, false, discussion("Anyone else?"), &ctx.deps)
        .await
        .unwrap();

    assert_eq!(receipt.status, PostingStatus::Pending);
    let event_id = receipt.event_id.expect("discussion has a review event");
    let event = ctx.moderation.get_event(event_id).await.unwrap().unwrap();
    assert_eq!(event.status, EventStatus::Pending);
    assert_eq!(event.initiator, Initiator::User(author.id));
    assert_eq!(event.target, Some(receipt.posting_id.into_uuid()));

    ctx.moderation.decide(event_id, Outcome::Approve).await.unwrap();
    let posting = ctx.deps.postings.find_by_id(receipt.posting_id).await.unwrap().unwrap();
    assert_eq!(posting.status, PostingStatus::Open);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_admin_discussion_is_recorded_approved(ctx: &TestHarness) {
    let admin = create_verified_user(&ctx.deps, "admin", UserRole::Admin).await;

    let receipt = submit_posting(admin.id, false, discussion("Welcome"), &ctx.deps)
        .await
        .unwrap();

    assert_eq!(receipt.status, PostingStatus::Open);
    let event = ctx
        .moderation
        .get_event(receipt.event_id.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.status, EventStatus::Approved);
    assert_eq!(event.decided_at, Some(event.created_at));
    let pending = ctx
        .moderation
        .list_pending(EventType::Posting, Default::default())
        .await
        .unwrap();
    assert!(pending.items.is_empty());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_dissemination_skips_review(ctx: &TestHarness) {
    let physician = create_verified_user(&ctx.deps, "doc", UserRole::Physician).await;
    let mut submission = discussion("Clinic closed Monday");
    submission.kind = PostingKind::Dissemination;

    let receipt = submit_posting(physician.id, false, submission, &ctx.deps).await.unwrap();

    assert_eq!(receipt.status, PostingStatus::Open);
    assert!(receipt.event_id.is_none());
    assert_eq!(ctx.stores.events.len().await, 0);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_unknown_author_cannot_post(ctx: &TestHarness) {
    let result = submit_posting(UserId::new(), false, discussion("Hi"), &ctx.deps).await;

    assert!(matches!(result, Err(ModerationError::NotFound(_))));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_only_author_terminates_open_discussion(ctx: &TestHarness) {
    let author = create_verified_user(&ctx.deps, "pat", UserRole::Patient).await;
    let other = create_verified_user(&ctx.deps, "other", UserRole::Patient).await;
    let open = create_open_posting(&ctx.deps, author.id, "Thanks all").await;
    let (pending, _) = create_pending_discussion(&ctx.deps, author.id, "Not yet").await;

    let by_other = terminate_posting(other.id, open, &ctx.deps).await;
    assert!(matches!(by_other, Err(ModerationError::Forbidden(_))));

    let still_pending = terminate_posting(author.id, pending, &ctx.deps).await;
    assert!(matches!(still_pending, Err(ModerationError::PreconditionFailed(_))));

    let terminated = terminate_posting(author.id, open, &ctx.deps).await.unwrap();
    assert_eq!(terminated.status, PostingStatus::Terminated);

    let missing = terminate_posting(author.id, PostingId::new(), &ctx.deps).await;
    assert!(matches!(missing, Err(ModerationError::NotFound(_))));
}

// ============================================================================
// Citations
// ============================================================================

#[test_context(TestHarness)]
#[tokio::test]
async fn test_citation_flags_posting(ctx: &TestHarness) {
    let author = create_verified_user(&ctx.deps, "author", UserRole::Patient).await;
    let informer = create_verified_user(&ctx.deps, "informer", UserRole::Nurse).await;
    let posting_id = create_open_posting(&ctx.deps, author.id, "Cheap pills").await;

    let event = cite_posting(informer.id, posting_id, citation("spam", "off-topic"), &ctx.deps)
        .await
        .unwrap();

    assert_eq!(event.event_type, EventType::Cite);
    assert_eq!(event.note.as_deref(), Some("spam@@off-topic"));
    let posting = ctx.deps.postings.find_by_id(posting_id).await.unwrap().unwrap();
    assert_eq!(posting.cite_event_id, Some(event.id));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_second_citation_conflicts(ctx: &TestHarness) {
    let author = create_verified_user(&ctx.deps, "author", UserRole::Patient).await;
    let informer = create_verified_user(&ctx.deps, "informer", UserRole::Nurse).await;
    let posting_id = create_open_posting(&ctx.deps, author.id, "Cheap pills").await;
    cite_posting(informer.id, posting_id, citation("spam", "ads"), &ctx.deps)
        .await
        .unwrap();

    let second = cite_posting(author.id, posting_id, citation("rude", "tone"), &ctx.deps).await;

    assert!(matches!(second, Err(ModerationError::Conflict(_))));
    assert_eq!(ctx.stores.events.len().await, 1);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_citation_input_is_validated(ctx: &TestHarness) {
    let author = create_verified_user(&ctx.deps, "author", UserRole::Patient).await;
    let posting_id = create_open_posting(&ctx.deps, author.id, "Hello").await;

    let bad_kind = cite_posting(author.id, posting_id, citation("a@@b", "x"), &ctx.deps).await;
    let no_reason = cite_posting(author.id, posting_id, citation("spam", " "), &ctx.deps).await;
    let no_posting = cite_posting(author.id, PostingId::new(), citation("spam", "x"), &ctx.deps).await;

    assert!(matches!(bad_kind, Err(ModerationError::PreconditionFailed(_))));
    assert!(matches!(no_reason, Err(ModerationError::PreconditionFailed(_))));
    assert!(matches!(no_posting, Err(ModerationError::NotFound(_))));
    assert_eq!(ctx.stores.events.len().await, 0);
}

// ============================================================================
// Private conversations
// ============================================================================

#[test_context(TestHarness)]
#[tokio::test]
async fn test_private_request_roles_are_checked(ctx: &TestHarness) {
    let patient = create_verified_user(&ctx.deps, "pat", UserRole::Patient).await;
    let nurse = create_verified_user(&ctx.deps, "nurse", UserRole::Nurse).await;

    let result = request_private_conversation(
        patient.id,
        ConversationRequest {
            physician_id: nurse.id,
            topic: None,
            message: None,
        },
        &ctx.deps,
    )
    .await;

    assert!(matches!(result, Err(ModerationError::PreconditionFailed(_))));
    assert_eq!(ctx.stores.events.len().await, 0);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_one_time_password_flow(ctx: &TestHarness) {
    let patient = create_verified_user(&ctx.deps, "pat", UserRole::Patient).await;
    let physician = create_verified_user(&ctx.deps, "doc", UserRole::Physician).await;
    let stranger = create_verified_user(&ctx.deps, "stranger", UserRole::Patient).await;

    let conversation = request_private_conversation(
        patient.id,
        ConversationRequest {
            physician_id: physician.id,
            topic: Some("Results".to_string()),
            message: Some("Could we talk?".to_string()),
        },
        &ctx.deps,
    )
    .await
    .unwrap();
    assert_eq!(conversation.status, ConversationStatus::Pending);

    let too_early =
        validate_conversation_password(conversation.id, patient.id, "XabcdefX", &ctx.deps).await;
    assert!(matches!(too_early, Err(ModerationError::PreconditionFailed(_))));

    ctx.moderation
        .decide(conversation.event_id, Outcome::Approve)
        .await
        .unwrap();
    let password = ctx
        .deps
        .conversations
        .find_by_id(conversation.id)
        .await
        .unwrap()
        .unwrap()
        .password
        .unwrap();

    let wrong = validate_conversation_password(conversation.id, patient.id, "nope", &ctx.deps)
        .await
        .unwrap();
    let outsider =
        validate_conversation_password(conversation.id, stranger.id, &password, &ctx.deps).await;
    let right = validate_conversation_password(conversation.id, patient.id, &password, &ctx.deps)
        .await
        .unwrap();

    assert!(!wrong);
    assert!(matches!(outsider, Err(ModerationError::Forbidden(_))));
    assert!(right);
    let conversation = ctx
        .deps
        .conversations
        .find_by_id(conversation.id)
        .await
        .unwrap()
        .unwrap();
    assert!(conversation.patient_verified);
    assert!(!conversation.physician_verified);
}
