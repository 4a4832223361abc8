use axum::{
    extract::{Extension, Path, Query},
    Json,
};
use serde::Deserialize;

use super::authorized;
use crate::common::{AdminCapability, Page, PageRequest};
use crate::domains::events::{EventStatus, EventType};
use crate::domains::moderation::{review_queue, ReviewRow};
use crate::server::app::AppState;
use crate::server::error::{ApiError, ApiResult};
use crate::server::middleware::AuthUser;

#[derive(Debug, Deserialize)]
pub struct ReviewQuery {
    /// Defaults to pending.
    pub status: Option<EventStatus>,
    pub first: Option<i32>,
    pub after: Option<String>,
}

/// `GET /api/v1/review/:event_type`
pub async fn review_queue_handler(
    Extension(state): Extension<AppState>,
    user: Option<Extension<AuthUser>>,
    Path(event_type): Path<EventType>,
    Query(query): Query<ReviewQuery>,
) -> ApiResult<Json<Page<ReviewRow>>> {
    authorized(user, AdminCapability::ReviewQueue, &state.deps).await?;

    let page = PageRequest {
        first: query.first,
        after: query.after,
    }
    .validate()
    .map_err(ApiError::bad_request)?;

    let status = query.status.unwrap_or(EventStatus::Pending);
    Ok(Json(review_queue(&state.deps, event_type, status, page).await?))
}
