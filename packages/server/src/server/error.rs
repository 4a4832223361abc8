//! Mapping of moderation errors onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::common::AuthError;
use crate::domains::moderation::ModerationError;

#[derive(Debug)]
pub struct ApiError(pub ModerationError);

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError(ModerationError::PreconditionFailed(message.into()))
    }

    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ModerationError::NotFound(_) => StatusCode::NOT_FOUND,
            ModerationError::Conflict(_) => StatusCode::CONFLICT,
            ModerationError::PreconditionFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ModerationError::Forbidden(_) => StatusCode::FORBIDDEN,
            ModerationError::Auth(AuthError::AuthenticationRequired)
            | ModerationError::Auth(AuthError::InvalidToken) => StatusCode::UNAUTHORIZED,
            ModerationError::Auth(_) => StatusCode::FORBIDDEN,
            ModerationError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<ModerationError> for ApiError {
    fn from(err: ModerationError) -> Self {
        ApiError(err)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError(ModerationError::Auth(err))
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError(ModerationError::Unavailable(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::SERVICE_UNAVAILABLE {
            error!(error = %self.0, "Request failed on a backing store");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
