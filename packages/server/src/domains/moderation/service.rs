//! The decision orchestrator.
//!
//! `decide` runs three phases against stores that share no transaction:
//!
//! 1. Ledger: conditional `pending -> terminal` transition. Anything other
//!    than a win stops here, before any domain mutation.
//! 2. Domain: the registered hook for `(type, outcome)`, bounded by a
//!    timeout. Failure is reported as [`SideEffect::Partial`]; the ledger
//!    decision stands.
//! 3. Notification: best effort, bounded, failures swallowed.
//!
//! A crash between phases 1 and 2 leaves the mirror behind the ledger. A
//! retried `decide` sees `AlreadyDecided`, notices the divergence and re-runs
//! phase 2 alone for the outcome the ledger recorded. It only does so once
//! the winner's phase 2 is past its timeout; before that a diverged mirror
//! may just mean the winner is still running, and only the winner may run
//! the hook.

use anyhow::anyhow;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::errors::{ModerationError, ModerationResult};
use super::hooks::{HookEffect, HookRegistry, MirrorState, Notification};
use super::notifications;
use super::outcome::{
    Consistency, ConsistencyReport, DecideOutcome, DecisionReport, NotificationSummary,
    PartialFailure, PartialReason, ReconcileReport, SideEffect,
};
use crate::common::{EventId, Page, ValidatedPage};
use crate::config::ModerationSettings;
use crate::domains::events::{
    Event, EventFilter, EventStatus, EventType, LedgerDecision, NewEvent, Outcome,
};
use crate::kernel::ServerDeps;

/// Events examined per page while auditing.
const AUDIT_PAGE_SIZE: i32 = 100;

#[derive(Clone)]
pub struct ModerationService {
    deps: ServerDeps,
    hooks: Arc<HookRegistry>,
    settings: ModerationSettings,
}

impl ModerationService {
    pub fn new(deps: ServerDeps, settings: ModerationSettings) -> Self {
        Self::with_hooks(deps, HookRegistry::standard(), settings)
    }

    pub fn with_hooks(deps: ServerDeps, hooks: HookRegistry, settings: ModerationSettings) -> Self {
        Self {
            deps,
            hooks: Arc::new(hooks),
            settings,
        }
    }

    pub fn deps(&self) -> &ServerDeps {
        &self.deps
    }

    // =========================================================================
    // Ledger surface
    // =========================================================================

    pub async fn create_event(&self, new_event: NewEvent) -> ModerationResult<Event> {
        let event = self.deps.events.create_event(new_event).await?;
        info!(
            event_id = %event.id,
            event_type = %event.event_type,
            status = %event.status,
            "Moderation event recorded"
        );
        Ok(event)
    }

    pub async fn get_event(&self, event_id: EventId) -> ModerationResult<Option<Event>> {
        Ok(self.deps.events.get_event(event_id).await?)
    }

    pub async fn list_events(
        &self,
        filter: EventFilter,
        page: ValidatedPage,
    ) -> ModerationResult<Page<Event>> {
        Ok(self.deps.events.list_events(filter, page).await?)
    }

    /// Pending events of one type, oldest first.
    pub async fn list_pending(
        &self,
        event_type: EventType,
        page: ValidatedPage,
    ) -> ModerationResult<Page<Event>> {
        self.list_events(EventFilter::pending(event_type), page).await
    }

    // =========================================================================
    // Decisions
    // =========================================================================

    /// Decide an event. Errors only when phase 1 could not run.
    pub async fn decide(&self, event_id: EventId, outcome: Outcome) -> ModerationResult<DecideOutcome> {
        let decision = self.deps.events.decide(event_id, outcome).await.map_err(|e| {
            error!(%event_id, %outcome, error = %e, "Ledger decision failed");
            ModerationError::Unavailable(e)
        })?;

        match decision {
            LedgerDecision::NotFound => {
                info!(%event_id, %outcome, "Decision on unknown event");
                Ok(DecideOutcome::NotFound { event_id })
            }
            LedgerDecision::AlreadyDecided(event) => {
                info!(
                    %event_id,
                    %outcome,
                    recorded = %event.status,
                    "Event already decided"
                );
                let repair = self.repair_if_diverged(&event).await;
                Ok(DecideOutcome::AlreadyDecided { event, repair })
            }
            LedgerDecision::Decided(event) => {
                info!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    %outcome,
                    "Ledger decision recorded"
                );
                let (side_effect, pending) = self.run_domain_phase(&event, outcome).await;
                let notifications = self.notify(&event, pending).await;
                Ok(DecideOutcome::Decided(DecisionReport {
                    event,
                    side_effect,
                    notifications,
                }))
            }
        }
    }

    /// Run `decide` on its own task so a dropped caller cannot cancel it
    /// between phases.
    pub async fn decide_detached(
        &self,
        event_id: EventId,
        outcome: Outcome,
    ) -> ModerationResult<DecideOutcome> {
        let service = self.clone();
        tokio::spawn(async move { service.decide(event_id, outcome).await })
            .await
            .map_err(|e| ModerationError::Unavailable(anyhow!("Decision task failed: {}", e)))?
    }

    // =========================================================================
    // Consistency
    // =========================================================================

    pub async fn check_consistency(&self, event_id: EventId) -> ModerationResult<ConsistencyReport> {
        let event = self
            .deps
            .events
            .get_event(event_id)
            .await?
            .ok_or_else(|| ModerationError::not_found(format!("Event {}", event_id)))?;

        let consistency = self.consistency_of(&event).await?;
        Ok(ConsistencyReport { event, consistency })
    }

    /// Re-run the domain phase for a decided event whose mirror diverged.
    pub async fn reconcile(&self, event_id: EventId) -> ModerationResult<ReconcileReport> {
        let ConsistencyReport { event, consistency } = self.check_consistency(event_id).await?;

        let repair = match (&consistency, event.status.outcome()) {
            (Consistency::Diverged { .. }, Some(outcome)) => {
                Some(self.repair(&event, outcome).await)
            }
            _ => None,
        };

        Ok(ReconcileReport {
            event,
            before: consistency,
            repair,
        })
    }

    /// Decided events whose mirror disagrees with the ledger or whose
    /// target has disappeared.
    pub async fn audit(&self, event_type: Option<EventType>) -> ModerationResult<Vec<ConsistencyReport>> {
        let mut findings = Vec::new();

        for status in [EventStatus::Approved, EventStatus::Rejected] {
            let filter = EventFilter {
                event_type,
                status: Some(status),
            };
            let mut page = ValidatedPage {
                limit: AUDIT_PAGE_SIZE,
                cursor: None,
            };

            loop {
                let batch = self.deps.events.list_events(filter, page).await?;
                for event in batch.items.iter() {
                    let consistency = self.consistency_of(event).await?;
                    if consistency.needs_attention() {
                        warn!(
                            event_id = %event.id,
                            event_type = %event.event_type,
                            ?consistency,
                            "Ledger and domain mirror disagree"
                        );
                        findings.push(ConsistencyReport {
                            event: event.clone(),
                            consistency,
                        });
                    }
                }

                let next = batch.items.last().map(|e| e.id.into_uuid());
                if !batch.has_next_page || next.is_none() {
                    break;
                }
                page.cursor = next;
            }
        }

        findings.sort_by(|a, b| (a.event.created_at, a.event.id).cmp(&(b.event.created_at, b.event.id)));
        Ok(findings)
    }

    // =========================================================================
    // Phases
    // =========================================================================

    async fn run_domain_phase(&self, event: &Event, outcome: Outcome) -> (SideEffect, Vec<Notification>) {
        let Some(hook) = self.hooks.get(event.event_type, outcome) else {
            debug!(event_id = %event.id, event_type = %event.event_type, "No domain hook registered");
            return (SideEffect::NoHook, Vec::new());
        };
        let mutation = hook.mutation();
        let timeout = self.settings.domain_call_timeout;

        let reason = match tokio::time::timeout(timeout, hook.apply(event, &self.deps)).await {
            Ok(Ok(HookEffect::Applied {
                notifications,
                detail,
            })) => {
                info!(event_id = %event.id, mutation, "Domain mirror updated");
                return (SideEffect::Applied { mutation, detail }, notifications);
            }
            Ok(Ok(HookEffect::AlreadyApplied)) => {
                debug!(event_id = %event.id, mutation, "Domain mirror already up to date");
                return (SideEffect::AlreadyApplied { mutation }, Vec::new());
            }
            Ok(Ok(HookEffect::TargetMissing)) => PartialReason::TargetMissing,
            Ok(Err(e)) => PartialReason::Failed {
                error: format!("{:#}", e),
            },
            Err(_) => PartialReason::TimedOut {
                after_ms: timeout.as_millis() as u64,
            },
        };

        error!(
            event_id = %event.id,
            event_type = %event.event_type,
            %outcome,
            mutation,
            ?reason,
            "Ledger decided but domain mirror not updated; needs reconciliation"
        );
        (
            SideEffect::Partial(PartialFailure { mutation, reason }),
            Vec::new(),
        )
    }

    async fn notify(&self, event: &Event, pending: Vec<Notification>) -> NotificationSummary {
        if pending.is_empty() {
            return NotificationSummary::default();
        }
        notifications::dispatch(&self.deps, event, pending, self.settings.notification_timeout).await
    }

    /// Domain phase plus notifications for an already-decided event.
    async fn repair(&self, event: &Event, outcome: Outcome) -> SideEffect {
        info!(event_id = %event.id, %outcome, "Re-running domain phase for decided event");
        let (side_effect, pending) = self.run_domain_phase(event, outcome).await;
        self.notify(event, pending).await;
        side_effect
    }

    /// Best effort: a failed check leaves the repair to an explicit reconcile.
    async fn repair_if_diverged(&self, event: &Event) -> Option<SideEffect> {
        let outcome = event.status.outcome()?;
        if !self.domain_phase_settled(event) {
            debug!(event_id = %event.id, "Decision too recent to repair; winner may still be applying it");
            return None;
        }
        match self.consistency_of(event).await {
            Ok(Consistency::Diverged { .. }) => Some(self.repair(event, outcome).await),
            Ok(_) => None,
            Err(e) => {
                warn!(event_id = %event.id, error = %e, "Could not check domain mirror");
                None
            }
        }
    }

    /// Whether the domain phase of whoever decided `event` has finished or
    /// been cut off by its timeout.
    fn domain_phase_settled(&self, event: &Event) -> bool {
        let Some(decided_at) = event.decided_at else {
            return false;
        };
        Utc::now()
            .signed_duration_since(decided_at)
            .to_std()
            .map(|elapsed| elapsed >= self.settings.domain_call_timeout)
            .unwrap_or(false)
    }

    async fn consistency_of(&self, event: &Event) -> ModerationResult<Consistency> {
        let Some(outcome) = event.status.outcome() else {
            return Ok(Consistency::Pending);
        };
        let Some(hook) = self.hooks.get(event.event_type, outcome) else {
            return Ok(Consistency::NoHook);
        };

        let state = tokio::time::timeout(
            self.settings.domain_call_timeout,
            hook.mirror_state(event, &self.deps),
        )
        .await
        .map_err(|_| anyhow!("Mirror check for event {} timed out", event.id))??;

        Ok(match state {
            MirrorState::InSync => Consistency::InSync,
            MirrorState::Diverged => Consistency::Diverged {
                expected: hook.mutation(),
            },
            MirrorState::TargetMissing => Consistency::TargetMissing,
        })
    }
}
