use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::common::{EventId, UserId};
use crate::domains::events::{EventType, Initiator, NewEvent};
use crate::domains::moderation::{ModerationError, ModerationResult};
use crate::domains::users::{generate_initial_password, NewUser, UserRole};
use crate::kernel::ServerDeps;

#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationRequest {
    pub username: String,
    pub full_name: String,
    pub role: UserRole,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub preferred_contact: Option<String>,
    pub associate_id: Option<UserId>,
    pub hospital_reference: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub user_id: UserId,
    pub event_id: EventId,
}

/// Store a pending account and queue it for review.
///
/// Every check runs before anything is written, so a refused registration
/// never reaches the ledger.
pub async fn register_user(
    request: RegistrationRequest,
    deps: &ServerDeps,
) -> ModerationResult<Registration> {
    validate(&request, deps).await?;

    let mut new_user = NewUser::builder()
        .username(request.username.trim())
        .full_name(request.full_name)
        .role(request.role)
        .preferred_contact(
            request
                .preferred_contact
                .unwrap_or_else(|| "email".to_string()),
        )
        .build();
    new_user.email = non_empty(request.email);
    new_user.mobile = non_empty(request.mobile);
    new_user.associate_id = request.associate_id;
    new_user.hospital_reference = non_empty(request.hospital_reference);
    let hospital_reference = new_user.hospital_reference.clone();

    let password = generate_initial_password();
    let user = deps
        .users
        .insert_user(new_user, &password)
        .await?
        .ok_or_else(|| ModerationError::conflict("Username has already been taken"))?;

    let mut event = NewEvent::builder()
        .event_type(EventType::Registration)
        .initiator(Initiator::Admin)
        .target(user.id.into_uuid())
        .build();
    event.note = hospital_reference;

    let event = match deps.events.create_event(event).await {
        Ok(event) => event,
        Err(e) => {
            error!(user_id = %user.id, error = %e, "Registration event not recorded; removing account");
            if let Err(cleanup) = deps.users.delete_user(user.id).await {
                warn!(user_id = %user.id, error = %cleanup, "Could not remove unreviewed account");
            }
            return Err(ModerationError::Unavailable(e));
        }
    };

    info!(
        user_id = %user.id,
        event_id = %event.id,
        role = %user.role,
        "Registration queued for review"
    );
    Ok(Registration {
        user_id: user.id,
        event_id: event.id,
    })
}

async fn validate(request: &RegistrationRequest, deps: &ServerDeps) -> ModerationResult<()> {
    if request.username.trim().is_empty() {
        return Err(ModerationError::precondition("Username is required"));
    }
    if !request.role.is_self_registrable() {
        return Err(ModerationError::precondition(format!(
            "Role {} cannot self-register",
            request.role
        )));
    }
    if non_empty(request.email.clone()).is_none() && non_empty(request.mobile.clone()).is_none() {
        return Err(ModerationError::precondition(
            "An email address or mobile number is required",
        ));
    }

    if request.role.requires_associate() {
        let Some(associate_id) = request.associate_id else {
            return Err(ModerationError::precondition(format!(
                "A {} must name an associate physician",
                request.role
            )));
        };
        match deps.users.lookup_user_role(associate_id).await? {
            Some(UserRole::Physician) => {}
            Some(role) => {
                return Err(ModerationError::precondition(format!(
                    "Associate {} is a {}, not a physician",
                    associate_id, role
                )))
            }
            None => {
                return Err(ModerationError::precondition(format!(
                    "Associate {} does not exist",
                    associate_id
                )))
            }
        }
    }

    Ok(())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
