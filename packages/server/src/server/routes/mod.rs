// HTTP routes
pub mod events;
pub mod health;
pub mod review;
pub mod submissions;

pub use events::*;
pub use health::*;
pub use review::*;
pub use submissions::*;

use axum::extract::Extension;

use crate::common::{Actor, AdminCapability, AuthError};
use crate::kernel::ServerDeps;
use crate::server::error::ApiError;
use crate::server::middleware::AuthUser;

/// The caller set by the JWT middleware, or 401.
pub(crate) fn authenticated(user: Option<Extension<AuthUser>>) -> Result<AuthUser, ApiError> {
    user.map(|Extension(user)| user)
        .ok_or_else(|| AuthError::AuthenticationRequired.into())
}

/// The caller, provided they hold `capability`.
pub(crate) async fn authorized(
    user: Option<Extension<AuthUser>>,
    capability: AdminCapability,
    deps: &ServerDeps,
) -> Result<AuthUser, ApiError> {
    let user = authenticated(user)?;
    Actor::new(user.user_id, user.is_admin)
        .can(capability)
        .check(deps)
        .await?;
    Ok(user)
}
