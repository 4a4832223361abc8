//! User-facing routes that create events for review.

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use super::authenticated;
use crate::common::{Actor, AdminCapability, ConversationId, PostingId};
use crate::domains::conversations::{
    request_private_conversation, validate_conversation_password, Conversation, ConversationRequest,
};
use crate::domains::events::Event;
use crate::domains::postings::{
    cite_posting, submit_posting, terminate_posting, CitationRequest, Posting, PostingReceipt,
    PostingSubmission,
};
use crate::domains::users::{register_user, Registration, RegistrationRequest};
use crate::server::app::AppState;
use crate::server::error::ApiResult;
use crate::server::middleware::AuthUser;

#[derive(Debug, Deserialize)]
pub struct PasswordBody {
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct PasswordCheck {
    pub valid: bool,
}

/// Self-registration; no token required.
pub async fn register_handler(
    Extension(state): Extension<AppState>,
    Json(request): Json<RegistrationRequest>,
) -> ApiResult<(StatusCode, Json<Registration>)> {
    let registration = register_user(request, &state.deps).await?;
    Ok((StatusCode::CREATED, Json(registration)))
}

pub async fn submit_posting_handler(
    Extension(state): Extension<AppState>,
    user: Option<Extension<AuthUser>>,
    Json(submission): Json<PostingSubmission>,
) -> ApiResult<(StatusCode, Json<PostingReceipt>)> {
    let user = authenticated(user)?;
    // Administrators' discussions skip review.
    let is_admin = Actor::new(user.user_id, user.is_admin)
        .can(AdminCapability::DecideEvents)
        .check(&state.deps)
        .await
        .is_ok();

    let receipt = submit_posting(user.user_id, is_admin, submission, &state.deps).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

pub async fn cite_posting_handler(
    Extension(state): Extension<AppState>,
    user: Option<Extension<AuthUser>>,
    Path(posting_id): Path<PostingId>,
    Json(request): Json<CitationRequest>,
) -> ApiResult<(StatusCode, Json<Event>)> {
    let user = authenticated(user)?;
    let event = cite_posting(user.user_id, posting_id, request, &state.deps).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn terminate_posting_handler(
    Extension(state): Extension<AppState>,
    user: Option<Extension<AuthUser>>,
    Path(posting_id): Path<PostingId>,
) -> ApiResult<Json<Posting>> {
    let user = authenticated(user)?;
    Ok(Json(terminate_posting(user.user_id, posting_id, &state.deps).await?))
}

pub async fn request_conversation_handler(
    Extension(state): Extension<AppState>,
    user: Option<Extension<AuthUser>>,
    Json(request): Json<ConversationRequest>,
) -> ApiResult<(StatusCode, Json<Conversation>)> {
    let user = authenticated(user)?;
    let conversation = request_private_conversation(user.user_id, request, &state.deps).await?;
    Ok((StatusCode::CREATED, Json(conversation)))
}

pub async fn validate_password_handler(
    Extension(state): Extension<AppState>,
    user: Option<Extension<AuthUser>>,
    Path(conversation_id): Path<ConversationId>,
    Json(body): Json<PasswordBody>,
) -> ApiResult<Json<PasswordCheck>> {
    let user = authenticated(user)?;
    let valid =
        validate_conversation_password(conversation_id, user.user_id, &body.password, &state.deps)
            .await?;
    Ok(Json(PasswordCheck { valid }))
}
