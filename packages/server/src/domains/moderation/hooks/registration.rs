use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use super::{DomainHook, HookEffect, MirrorState, Notification};
use crate::common::{StatusChange, UserId};
use crate::domains::events::Event;
use crate::domains::groups::CareGroup;
use crate::domains::moderation::outcome::HookDetail;
use crate::domains::users::{User, UserStatus};
use crate::kernel::ServerDeps;

/// Registration approved: join the role's groups, then mark the account verified.
///
/// Groups go first so a verified account always has its memberships.
pub struct VerifyRegistrant;

#[async_trait]
impl DomainHook for VerifyRegistrant {
    fn mutation(&self) -> &'static str {
        "verify_user"
    }

    async fn apply(&self, event: &Event, deps: &ServerDeps) -> Result<HookEffect> {
        let Some(user_id) = event.target.map(UserId::from_uuid) else {
            return Ok(HookEffect::TargetMissing);
        };
        let Some(user) = deps.users.find_by_id(user_id).await? else {
            return Ok(HookEffect::TargetMissing);
        };

        let groups = CareGroup::for_role(user.role);
        let mut joined = false;
        for group in &groups {
            joined |= deps.groups.add_to_group(user.id, *group).await?;
        }

        match deps.users.set_user_status(user.id, UserStatus::Verified).await? {
            StatusChange::Missing => Ok(HookEffect::TargetMissing),
            StatusChange::Unchanged if !joined => Ok(HookEffect::AlreadyApplied),
            StatusChange::Unchanged => {
                debug!(user_id = %user.id, "Restored missing group memberships");
                Ok(HookEffect::Applied {
                    notifications: Vec::new(),
                    detail: Some(HookDetail::UserVerified { groups }),
                })
            }
            StatusChange::Applied => {
                let password = deps.users.initial_password(user.id).await?;
                let body = match password {
                    Some(password) => format!(
                        "<b>Registration approved</b><br/>Welcome, {}. Your account is now active.\
                         <br/>Initial password: <b>{}</b>",
                        user.username, password
                    ),
                    None => format!(
                        "<b>Registration approved</b><br/>Welcome, {}. Your account is now active.",
                        user.username
                    ),
                };

                Ok(HookEffect::Applied {
                    notifications: vec![Notification::new(
                        user.id,
                        "APPROVED: Registration",
                        body,
                    )],
                    detail: Some(HookDetail::UserVerified { groups }),
                })
            }
        }
    }

    async fn mirror_state(&self, event: &Event, deps: &ServerDeps) -> Result<MirrorState> {
        let Some(user) = load_target(event, deps).await? else {
            return Ok(MirrorState::TargetMissing);
        };
        if user.status != UserStatus::Verified {
            return Ok(MirrorState::Diverged);
        }

        let joined = deps.groups.groups_for_user(user.id).await?;
        let complete = CareGroup::for_role(user.role)
            .iter()
            .all(|group| joined.contains(group));
        Ok(if complete {
            MirrorState::InSync
        } else {
            MirrorState::Diverged
        })
    }
}

/// Registration rejected: mark the account rejected and tell the registrant.
pub struct RejectRegistration;

#[async_trait]
impl DomainHook for RejectRegistration {
    fn mutation(&self) -> &'static str {
        "reject_user"
    }

    async fn apply(&self, event: &Event, deps: &ServerDeps) -> Result<HookEffect> {
        let Some(user) = load_target(event, deps).await? else {
            return Ok(HookEffect::TargetMissing);
        };

        Ok(
            match deps.users.set_user_status(user.id, UserStatus::Rejected).await? {
                StatusChange::Missing => HookEffect::TargetMissing,
                StatusChange::Unchanged => HookEffect::AlreadyApplied,
                StatusChange::Applied => HookEffect::applied(vec![Notification::new(
                    user.id,
                    "REJECTED: Registration",
                    format!(
                        "<b>Registration rejected</b><br/>We are sorry to tell you that the \
                         registration of {} was rejected by the administrator.",
                        user.username
                    ),
                )]),
            },
        )
    }

    async fn mirror_state(&self, event: &Event, deps: &ServerDeps) -> Result<MirrorState> {
        Ok(match load_target(event, deps).await? {
            None => MirrorState::TargetMissing,
            Some(user) if user.status == UserStatus::Rejected => MirrorState::InSync,
            Some(_) => MirrorState::Diverged,
        })
    }
}

async fn load_target(
    event: &Event,
    deps: &ServerDeps,
) -> Result<Option<User>> {
    match event.target.map(UserId::from_uuid) {
        Some(user_id) => deps.users.find_by_id(user_id).await,
        None => Ok(None),
    }
}
