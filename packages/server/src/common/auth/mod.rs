/// Authorization module for the moderation server
///
/// Provides a fluent API for authorization checks in route handlers:
///
/// ```rust,ignore
/// use crate::common::auth::{Actor, AdminCapability};
///
/// Actor::new(actor_id, is_admin)
///     .can(AdminCapability::DecideEvents)
///     .check(&deps)
///     .await?;
/// ```

mod builder;
mod capability;
mod errors;

pub use builder::{Actor, CapabilityBuilder, HasAuthContext};
pub use capability::AdminCapability;
pub use errors::AuthError;
