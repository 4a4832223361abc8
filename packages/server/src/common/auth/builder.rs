use super::{AdminCapability, AuthError};
use crate::common::entity_ids::UserId;
use tracing::debug;

/// Entry point for authorization checks
///
/// Usage:
/// ```rust,ignore
/// Actor::new(actor_id, is_admin)
///     .can(AdminCapability::DecideEvents)
///     .check(&deps)
///     .await?;
/// ```
pub struct Actor {
    actor_id: UserId,
    is_admin: bool,
}

impl Actor {
    /// Create a new actor for authorization checks
    ///
    /// `is_admin` comes from the verified JWT claims.
    pub fn new(actor_id: UserId, is_admin: bool) -> Self {
        Self { actor_id, is_admin }
    }

    /// Specify what capability the actor needs
    pub fn can(self, capability: AdminCapability) -> CapabilityBuilder {
        CapabilityBuilder {
            actor_id: self.actor_id,
            is_admin: self.is_admin,
            capability,
        }
    }
}

/// Builder after specifying capability
pub struct CapabilityBuilder {
    actor_id: UserId,
    is_admin: bool,
    capability: AdminCapability,
}

impl CapabilityBuilder {
    /// Perform the authorization check
    pub async fn check<D>(self, deps: &D) -> Result<(), AuthError>
    where
        D: HasAuthContext,
    {
        check_admin_permission(self.actor_id, self.is_admin, self.capability, deps).await
    }
}

/// Trait for dependencies that can perform auth checks
pub trait HasAuthContext: Send + Sync {
    /// Usernames or user ids that are always treated as administrators
    fn admin_identifiers(&self) -> &[String];
}

/// Core permission check function
///
/// The token's admin flag is authoritative; the configured identifier list
/// additionally grants admin to bootstrap accounts that predate the flag.
async fn check_admin_permission<D>(
    actor_id: UserId,
    is_admin: bool,
    capability: AdminCapability,
    deps: &D,
) -> Result<(), AuthError>
where
    D: HasAuthContext,
{
    if !capability.requires_admin() {
        return Ok(());
    }

    let listed = deps
        .admin_identifiers()
        .iter()
        .any(|identifier| identifier == &actor_id.to_string());

    if !is_admin && !listed {
        debug!(
            actor_id = %actor_id,
            capability = capability.as_str(),
            "Admin capability denied"
        );
        return Err(AuthError::AdminRequired);
    }

    Ok(())
}
