//! Ledger routes: record, list, fetch and decide events.

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::authorized;
use crate::common::{AdminCapability, EventId, Page, PageRequest};
use crate::domains::events::{created_at_from_epoch, Event, EventFilter, EventStatus, EventType, Initiator, NewEvent, Outcome};
use crate::domains::moderation::{ConsistencyReport, DecideOutcome, ModerationError, ReconcileReport};
use crate::server::app::AppState;
use crate::server::error::{ApiError, ApiResult};
use crate::server::middleware::AuthUser;

/// Body of `POST /api/v1/events`.
#[derive(Debug, Deserialize)]
pub struct RecordEventBody {
    pub event_type: EventType,
    pub initiator: Initiator,
    #[serde(default)]
    pub target: Option<Uuid>,
    #[serde(default)]
    pub note: Option<String>,
    /// Unix epoch seconds; defaults to now.
    #[serde(default)]
    pub created_at: Option<i64>,
    #[serde(default)]
    pub decided: Option<Outcome>,
}

#[derive(Debug, Deserialize)]
pub struct ListEventsQuery {
    #[serde(rename = "type")]
    pub event_type: Option<EventType>,
    pub status: Option<EventStatus>,
    pub first: Option<i32>,
    pub after: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    #[serde(rename = "type")]
    pub event_type: Option<EventType>,
}

pub async fn record_event_handler(
    Extension(state): Extension<AppState>,
    user: Option<Extension<AuthUser>>,
    Json(body): Json<RecordEventBody>,
) -> ApiResult<(StatusCode, Json<Event>)> {
    authorized(user, AdminCapability::RecordEvents, &state.deps).await?;

    let created_at = body
        .created_at
        .map(created_at_from_epoch)
        .transpose()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let event = state
        .moderation
        .create_event(NewEvent {
            event_type: body.event_type,
            initiator: body.initiator,
            target: body.target,
            note: body.note,
            created_at,
            decided: body.decided,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn list_events_handler(
    Extension(state): Extension<AppState>,
    user: Option<Extension<AuthUser>>,
    Query(query): Query<ListEventsQuery>,
) -> ApiResult<Json<Page<Event>>> {
    authorized(user, AdminCapability::ReviewQueue, &state.deps).await?;

    let page = PageRequest {
        first: query.first,
        after: query.after,
    }
    .validate()
    .map_err(ApiError::bad_request)?;

    let filter = EventFilter {
        event_type: query.event_type,
        status: query.status,
    };
    Ok(Json(state.moderation.list_events(filter, page).await?))
}

pub async fn get_event_handler(
    Extension(state): Extension<AppState>,
    user: Option<Extension<AuthUser>>,
    Path(event_id): Path<EventId>,
) -> ApiResult<Json<Event>> {
    authorized(user, AdminCapability::ReviewQueue, &state.deps).await?;

    state
        .moderation
        .get_event(event_id)
        .await?
        .map(Json)
        .ok_or_else(|| ModerationError::not_found(format!("Event {}", event_id)).into())
}

pub async fn approve_event_handler(
    state: Extension<AppState>,
    user: Option<Extension<AuthUser>>,
    event_id: Path<EventId>,
) -> ApiResult<(StatusCode, Json<DecideOutcome>)> {
    decide(state, user, event_id, Outcome::Approve).await
}

pub async fn reject_event_handler(
    state: Extension<AppState>,
    user: Option<Extension<AuthUser>>,
    event_id: Path<EventId>,
) -> ApiResult<(StatusCode, Json<DecideOutcome>)> {
    decide(state, user, event_id, Outcome::Reject).await
}

async fn decide(
    Extension(state): Extension<AppState>,
    user: Option<Extension<AuthUser>>,
    Path(event_id): Path<EventId>,
    outcome: Outcome,
) -> ApiResult<(StatusCode, Json<DecideOutcome>)> {
    let admin = authorized(user, AdminCapability::DecideEvents, &state.deps).await?;
    info!(%event_id, %outcome, admin_id = %admin.user_id, "Decision requested");

    let result = state.moderation.decide_detached(event_id, outcome).await?;
    let status = match &result {
        DecideOutcome::Decided(_) => StatusCode::OK,
        DecideOutcome::AlreadyDecided { .. } => StatusCode::CONFLICT,
        DecideOutcome::NotFound { .. } => StatusCode::NOT_FOUND,
    };
    Ok((status, Json(result)))
}

pub async fn consistency_handler(
    Extension(state): Extension<AppState>,
    user: Option<Extension<AuthUser>>,
    Path(event_id): Path<EventId>,
) -> ApiResult<Json<ConsistencyReport>> {
    authorized(user, AdminCapability::ReviewQueue, &state.deps).await?;
    Ok(Json(state.moderation.check_consistency(event_id).await?))
}

pub async fn reconcile_handler(
    Extension(state): Extension<AppState>,
    user: Option<Extension<AuthUser>>,
    Path(event_id): Path<EventId>,
) -> ApiResult<Json<ReconcileReport>> {
    authorized(user, AdminCapability::Reconcile, &state.deps).await?;
    Ok(Json(state.moderation.reconcile(event_id).await?))
}

pub async fn audit_handler(
    Extension(state): Extension<AppState>,
    user: Option<Extension<AuthUser>>,
    Query(query): Query<AuditQuery>,
) -> ApiResult<Json<Vec<ConsistencyReport>>> {
    authorized(user, AdminCapability::Reconcile, &state.deps).await?;
    Ok(Json(state.moderation.audit(query.event_type).await?))
}
