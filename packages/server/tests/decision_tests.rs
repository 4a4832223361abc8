//! Decisions: one winner per event, status mirrors per type, idempotent hooks.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use crate::common::*;
use moderation_core::common::{EventId, UserId};
use moderation_core::domains::conversations::ConversationStatus;
use moderation_core::domains::events::{Event, EventStatus, EventType, Outcome};
use moderation_core::domains::groups::CareGroup;
use moderation_core::domains::moderation::hooks::PublishPosting;
use moderation_core::domains::moderation::{
    DecideOutcome, DomainHook, HookDetail, HookEffect, HookRegistry, MirrorState, SideEffect,
};
use moderation_core::domains::postings::PostingStatus;
use moderation_core::domains::users::{UserRole, UserStatus};
use moderation_core::kernel::ServerDeps;
use test_context::test_context;

fn report(outcome: DecideOutcome) -> moderation_core::domains::moderation::DecisionReport {
    match outcome {
        DecideOutcome::Decided(report) => report,
        other => panic!("expected a decision, got {:?}", other),
    }
}

// ============================================================================
// Ledger phase
// ============================================================================

#[test_context(TestHarness)]
#[tokio::test]
async fn test_second_decision_reports_already_decided(ctx: &TestHarness) {
    let author = create_verified_user(&ctx.deps, "author", UserRole::Patient).await;
    let (_, event_id) = create_pending_discussion(&ctx.deps, author.id, "Hello everyone").await;

    let first = ctx.moderation.decide(event_id, Outcome::Approve).await.unwrap();
    let second = ctx.moderation.decide(event_id, Outcome::Reject).await.unwrap();

    assert!(first.is_decided());
    assert!(second.is_already_decided());
    assert_eq!(second.event().unwrap().status, EventStatus::Approved);

    let stored = ctx.moderation.get_event(event_id).await.unwrap().unwrap();
    assert_eq!(stored.status, EventStatus::Approved);
    assert!(stored.decided_at.is_some());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_unknown_event_is_not_found_not_already_decided(ctx: &TestHarness) {
    let event_id = EventId::new();

    let outcome = ctx.moderation.decide(event_id, Outcome::Approve).await.unwrap();

    assert!(matches!(outcome, DecideOutcome::NotFound { event_id: id } if id == event_id));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_concurrent_decisions_have_one_winner(ctx: &TestHarness) {
    let author = create_verified_user(&ctx.deps, "author", UserRole::Physician).await;
    let (posting_id, event_id) = create_pending_discussion(&ctx.deps, author.id, "Race").await;

    let mut handles = Vec::new();
    for i in 0..8 {
        let service = ctx.moderation.clone();
        let outcome = if i % 2 == 0 { Outcome::Approve } else { Outcome::Reject };
        handles.push(tokio::spawn(async move { service.decide(event_id, outcome).await }));
    }

    let mut decided = Vec::new();
    let mut already = 0;
    for handle in handles {
        match handle.await.unwrap().unwrap() {
            DecideOutcome::Decided(report) => decided.push(report.event.status),
            DecideOutcome::AlreadyDecided { .. } => already += 1,
            DecideOutcome::NotFound { .. } => panic!("event vanished"),
        }
    }

    assert_eq!(decided.len(), 1);
    assert_eq!(already, 7);

    let expected = match decided[0] {
        EventStatus::Approved => PostingStatus::Open,
        _ => PostingStatus::Rejected,
    };
    let posting = ctx.deps.postings.find_by_id(posting_id).await.unwrap().unwrap();
    assert_eq!(posting.status, expected);
}

/// Publishes after a pause, counting how often it was asked to.
struct CountingPublish {
    calls: Arc<AtomicUsize>,
    delay: Duration,
}

#[async_trait]
impl DomainHook for CountingPublish {
    fn mutation(&self) -> &'static str {
        "publish_posting"
    }

    async fn apply(&self, event: &Event, deps: &ServerDeps) -> Result<HookEffect> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        PublishPosting.apply(event, deps).await
    }

    async fn mirror_state(&self, event: &Event, deps: &ServerDeps) -> Result<MirrorState> {
        PublishPosting.mirror_state(event, deps).await
    }
}

#[tokio::test]
async fn test_losing_decider_does_not_run_hook_while_winner_applies() {
    let calls = Arc::new(AtomicUsize::new(0));
    let hook = CountingPublish {
        calls: calls.clone(),
        delay: Duration::from_millis(50),
    };
    let ctx = TestHarness::with_hooks(
        HookRegistry::standard().with(EventType::Posting, Outcome::Approve, hook),
    );
    let author = create_verified_user(&ctx.deps, "author", UserRole::Patient).await;
    let (posting_id, event_id) = create_pending_discussion(&ctx.deps, author.id, "Twice").await;

    let winner = {
        let service = ctx.moderation.clone();
        tokio::spawn(async move { service.decide(event_id, Outcome::Approve).await })
    };
    tokio::time::sleep(Duration::from_millis(5)).await;
    let loser = ctx.moderation.decide(event_id, Outcome::Approve).await.unwrap();

    match loser {
        DecideOutcome::AlreadyDecided { repair, .. } => assert!(repair.is_none()),
        other => panic!("expected already-decided, got {:?}", other),
    }
    let winner = report(winner.await.unwrap().unwrap());
    assert!(matches!(
        winner.side_effect,
        SideEffect::Applied { mutation: "publish_posting", .. }
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let posting = ctx.deps.postings.find_by_id(posting_id).await.unwrap().unwrap();
    assert_eq!(posting.status, PostingStatus::Open);
}

// ============================================================================
// Status mirrors
// ============================================================================

#[test_context(TestHarness)]
#[tokio::test]
async fn test_posting_mirrors(ctx: &TestHarness) {
    let author = create_verified_user(&ctx.deps, "author", UserRole::Patient).await;
    let (approved, approve_event) = create_pending_discussion(&ctx.deps, author.id, "One").await;
    let (rejected, reject_event) = create_pending_discussion(&ctx.deps, author.id, "Two").await;

    ctx.moderation.decide(approve_event, Outcome::Approve).await.unwrap();
    ctx.moderation.decide(reject_event, Outcome::Reject).await.unwrap();

    let approved = ctx.deps.postings.find_by_id(approved).await.unwrap().unwrap();
    let rejected = ctx.deps.postings.find_by_id(rejected).await.unwrap().unwrap();
    assert_eq!(approved.status, PostingStatus::Open);
    assert_eq!(rejected.status, PostingStatus::Rejected);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_registration_approval_verifies_and_joins_groups(ctx: &TestHarness) {
    let nurse = create_user(&ctx.deps, "nurse", UserRole::Nurse, UserStatus::Pending).await;
    let event = create_registration_event(&ctx.deps, nurse.id, at_minute(0)).await;

    let report = report(ctx.moderation.decide(event.id, Outcome::Approve).await.unwrap());

    assert_eq!(
        report.side_effect.detail(),
        Some(&HookDetail::UserVerified {
            groups: vec![CareGroup::NursePhysicianAdmin]
        })
    );
    let user = ctx.deps.users.find_by_id(nurse.id).await.unwrap().unwrap();
    assert_eq!(user.status, UserStatus::Verified);
    let groups = ctx.deps.groups.groups_for_user(nurse.id).await.unwrap();
    assert_eq!(groups, vec![CareGroup::NursePhysicianAdmin]);

    let mail = ctx.stores.notifier.sent_to(&email_of("nurse"));
    assert_eq!(mail.len(), 1);
    assert_eq!(mail[0].subject, "APPROVED: Registration");
    assert!(mail[0].body.contains("abc123"));
    assert_eq!(report.notifications.sent, 1);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_registration_rejection_marks_user_rejected(ctx: &TestHarness) {
    let patient = create_user(&ctx.deps, "patient", UserRole::Patient, UserStatus::Pending).await;
    let event = create_registration_event(&ctx.deps, patient.id, at_minute(0)).await;

    ctx.moderation.decide(event.id, Outcome::Reject).await.unwrap();

    let user = ctx.deps.users.find_by_id(patient.id).await.unwrap().unwrap();
    assert_eq!(user.status, UserStatus::Rejected);
    assert!(ctx.deps.groups.groups_for_user(patient.id).await.unwrap().is_empty());
    let mail = ctx.stores.notifier.sent_to(&email_of("patient"));
    assert_eq!(mail.len(), 1);
    assert_eq!(mail[0].subject, "REJECTED: Registration");
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_private_request_approval_opens_conversation(ctx: &TestHarness) {
    let patient = create_verified_user(&ctx.deps, "patient", UserRole::Patient).await;
    let physician = create_verified_user(&ctx.deps, "doctor", UserRole::Physician).await;
    let (conversation_id, event_id) =
        create_conversation_request(&ctx.deps, patient.id, physician.id).await;

    let report = report(ctx.moderation.decide(event_id, Outcome::Approve).await.unwrap());

    assert_eq!(
        report.side_effect.detail(),
        Some(&HookDetail::ConversationOpened { conversation_id })
    );
    let conversation = ctx
        .deps
        .conversations
        .find_by_id(conversation_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(conversation.status, ConversationStatus::Open);
    let password = conversation.password.expect("password issued");

    // Both participants receive the same one-time password.
    let to_patient = ctx.stores.notifier.sent_to(&email_of("patient"));
    let to_physician = ctx.stores.notifier.sent_to(&email_of("doctor"));
    assert_eq!(to_patient.len(), 1);
    assert_eq!(to_physician.len(), 1);
    assert!(to_patient[0].body.contains(&password));
    assert!(to_physician[0].body.contains(&password));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_private_request_rejection_notifies_patient_only(ctx: &TestHarness) {
    let patient = create_verified_user(&ctx.deps, "patient", UserRole::Patient).await;
    let physician = create_verified_user(&ctx.deps, "doctor", UserRole::Physician).await;
    let (conversation_id, event_id) =
        create_conversation_request(&ctx.deps, patient.id, physician.id).await;

    ctx.moderation.decide(event_id, Outcome::Reject).await.unwrap();

    let conversation = ctx
        .deps
        .conversations
        .find_by_id(conversation_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(conversation.status, ConversationStatus::Rejected);
    assert!(conversation.password.is_none());
    assert_eq!(ctx.stores.notifier.sent_to(&email_of("patient")).len(), 1);
    assert!(ctx.stores.notifier.sent_to(&email_of("doctor")).is_empty());
}

// ============================================================================
// Scenarios
// ============================================================================

#[test_context(TestHarness)]
#[tokio::test]
async fn test_rejected_posting_stays_rejected_after_late_approval(ctx: &TestHarness) {
    let u1 = create_verified_user(&ctx.deps, "u1", UserRole::Patient).await;
    let (p1, event_id) = create_pending_discussion(&ctx.deps, u1.id, "Please review").await;

    let first = ctx.moderation.decide(event_id, Outcome::Reject).await.unwrap();
    assert!(first.is_decided());
    let posting = ctx.deps.postings.find_by_id(p1).await.unwrap().unwrap();
    assert_eq!(posting.status, PostingStatus::Rejected);

    let second = ctx.moderation.decide(event_id, Outcome::Approve).await.unwrap();
    match second {
        DecideOutcome::AlreadyDecided { event, repair } => {
            assert_eq!(event.status, EventStatus::Rejected);
            assert!(repair.is_none());
        }
        other => panic!("expected already-decided, got {:?}", other),
    }
    let posting = ctx.deps.postings.find_by_id(p1).await.unwrap().unwrap();
    assert_eq!(posting.status, PostingStatus::Rejected);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_upheld_citation_removes_posting_and_warns_author(ctx: &TestHarness) {
    let author = create_verified_user(&ctx.deps, "author", UserRole::Patient).await;
    let informer = create_verified_user(&ctx.deps, "informer", UserRole::Nurse).await;
    let p2 = create_open_posting(&ctx.deps, author.id, "Buy cheap pills now").await;
    let event = create_citation(&ctx.deps, informer.id, p2, "spam", "off-topic").await;
    assert_eq!(event.note.as_deref(), Some("spam@@off-topic"));

    let report = report(ctx.moderation.decide(event.id, Outcome::Approve).await.unwrap());

    match report.side_effect.detail() {
        Some(HookDetail::PostingRemoved(removed)) => {
            assert_eq!(removed.posting_id, p2);
            assert_eq!(removed.author_id, author.id);
            assert_eq!(removed.excerpt, "Buy cheap ...");
        }
        other => panic!("expected a removal, got {:?}", other),
    }
    assert!(ctx.deps.postings.find_by_id(p2).await.unwrap().is_none());

    let warnings = ctx.stores.notifier.sent_to(&email_of("author"));
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].body.contains("spam (off-topic)"));
    assert!(warnings[0].body.contains("Buy cheap ..."));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_dismissed_citation_clears_flag(ctx: &TestHarness) {
    let author = create_verified_user(&ctx.deps, "author", UserRole::Patient).await;
    let informer = create_verified_user(&ctx.deps, "informer", UserRole::Nurse).await;
    let posting_id = create_open_posting(&ctx.deps, author.id, "Perfectly fine").await;
    let event = create_citation(&ctx.deps, informer.id, posting_id, "rude", "tone").await;

    ctx.moderation.decide(event.id, Outcome::Reject).await.unwrap();

    let posting = ctx.deps.postings.find_by_id(posting_id).await.unwrap().unwrap();
    assert_eq!(posting.status, PostingStatus::Open);
    assert_eq!(posting.cite_event_id, None);
    assert!(ctx.stores.notifier.sent().is_empty());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_pending_registrations_listed_oldest_first(ctx: &TestHarness) {
    let mut expected = Vec::new();
    for (minute, name) in [(5, "late"), (1, "early"), (3, "middle")] {
        let user = create_user(&ctx.deps, name, UserRole::Physician, UserStatus::Pending).await;
        let event = create_registration_event(&ctx.deps, user.id, at_minute(minute)).await;
        expected.push((minute, event.id));
    }
    expected.sort();
    let expected: Vec<EventId> = expected.into_iter().map(|(_, id)| id).collect();

    let page = ctx
        .moderation
        .list_pending(EventType::Registration, Default::default())
        .await
        .unwrap();
    let listed: Vec<EventId> = page.items.iter().map(|e| e.id).collect();
    assert_eq!(listed, expected);

    let oldest = expected[0];
    ctx.moderation.decide(oldest, Outcome::Approve).await.unwrap();

    let page = ctx
        .moderation
        .list_pending(EventType::Registration, Default::default())
        .await
        .unwrap();
    let listed: Vec<EventId> = page.items.iter().map(|e| e.id).collect();
    assert_eq!(listed, expected[1..].to_vec());

    let decided = ctx.moderation.get_event(oldest).await.unwrap().unwrap();
    assert_eq!(decided.status, EventStatus::Approved);
}

// ============================================================================
// Idempotent hooks
// ============================================================================

#[test_context(TestHarness)]
#[tokio::test]
async fn test_publish_hook_twice_leaves_posting_open(ctx: &TestHarness) {
    let author = create_verified_user(&ctx.deps, "author", UserRole::Patient).await;
    let (posting_id, event_id) = create_pending_discussion(&ctx.deps, author.id, "Twice").await;
    let decided = report(ctx.moderation.decide(event_id, Outcome::Approve).await.unwrap());
    assert!(matches!(decided.side_effect, SideEffect::Applied { mutation: "publish_posting", .. }));

    let again = PublishPosting.apply(&decided.event, &ctx.deps).await.unwrap();

    assert_eq!(again, HookEffect::AlreadyApplied);
    let posting = ctx.deps.postings.find_by_id(posting_id).await.unwrap().unwrap();
    assert_eq!(posting.status, PostingStatus::Open);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_verify_hook_twice_sends_one_notification(ctx: &TestHarness) {
    use moderation_core::domains::moderation::hooks::VerifyRegistrant;

    let physician = create_user(&ctx.deps, "doc", UserRole::Physician, UserStatus::Pending).await;
    let event = create_registration_event(&ctx.deps, physician.id, at_minute(0)).await;
    let decided = report(ctx.moderation.decide(event.id, Outcome::Approve).await.unwrap());

    let again = VerifyRegistrant.apply(&decided.event, &ctx.deps).await.unwrap();

    assert_eq!(again, HookEffect::AlreadyApplied);
    assert_eq!(ctx.stores.notifier.sent_to(&email_of("doc")).len(), 1);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_decision_on_event_for_unknown_user_is_partial(ctx: &TestHarness) {
    let event = create_registration_event(&ctx.deps, UserId::new(), at_minute(0)).await;

    let report = report(ctx.moderation.decide(event.id, Outcome::Approve).await.unwrap());

    assert_eq!(report.event.status, EventStatus::Approved);
    assert!(report.side_effect.is_partial());
}
