use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::common::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Patient,
    Nurse,
    Physician,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Patient => "patient",
            UserRole::Nurse => "nurse",
            UserRole::Physician => "physician",
            UserRole::Admin => "admin",
        }
    }

    /// Roles that must name an associate physician when registering.
    pub fn requires_associate(&self) -> bool {
        matches!(self, UserRole::Patient | UserRole::Nurse)
    }

    /// Roles open to self-registration.
    pub fn is_self_registrable(&self) -> bool {
        !matches!(self, UserRole::Admin)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "patient" => Ok(UserRole::Patient),
            "nurse" => Ok(UserRole::Nurse),
            "physician" => Ok(UserRole::Physician),
            "admin" => Ok(UserRole::Admin),
            _ => Err(anyhow!("Invalid user role: {}", s)),
        }
    }
}

/// Account status, mirroring the account's registration event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Pending,
    Verified,
    Rejected,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Pending => "pending",
            UserStatus::Verified => "verified",
            UserStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for UserStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(UserStatus::Pending),
            "verified" => Ok(UserStatus::Verified),
            "rejected" => Ok(UserStatus::Rejected),
            _ => Err(anyhow!("Invalid user status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub full_name: String,
    pub role: UserRole,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub preferred_contact: String,
    pub associate_id: Option<UserId>,
    /// Identifier in the hospital's own records, checked by reviewers.
    pub hospital_reference: Option<String>,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: UserId,
    pub username: String,
    pub full_name: String,
    pub role: String,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub preferred_contact: String,
    pub associate_id: Option<UserId>,
    pub hospital_reference: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = anyhow::Error;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(User {
            id: row.id,
            username: row.username,
            full_name: row.full_name,
            role: row.role.parse()?,
            email: row.email,
            mobile: row.mobile,
            preferred_contact: row.preferred_contact,
            associate_id: row.associate_id,
            hospital_reference: row.hospital_reference,
            status: row.status.parse()?,
            created_at: row.created_at,
        })
    }
}

/// A new account, stored `pending` until its registration is decided.
#[derive(Debug, Clone, TypedBuilder)]
pub struct NewUser {
    #[builder(setter(into))]
    pub username: String,
    #[builder(setter(into))]
    pub full_name: String,
    pub role: UserRole,
    #[builder(default, setter(strip_option, into))]
    pub email: Option<String>,
    #[builder(default, setter(strip_option, into))]
    pub mobile: Option<String>,
    #[builder(default = "email".to_string(), setter(into))]
    pub preferred_contact: String,
    #[builder(default, setter(strip_option))]
    pub associate_id: Option<UserId>,
    #[builder(default, setter(strip_option, into))]
    pub hospital_reference: Option<String>,
    #[builder(default = UserStatus::Pending)]
    pub status: UserStatus,
}

impl NewUser {
    pub fn into_user(self, now: DateTime<Utc>) -> User {
        User {
            id: UserId::new(),
            username: self.username,
            full_name: self.full_name,
            role: self.role,
            email: self.email,
            mobile: self.mobile,
            preferred_contact: self.preferred_contact,
            associate_id: self.associate_id,
            hospital_reference: self.hospital_reference,
            status: self.status,
            created_at: now,
        }
    }
}

/// Where notifications for a user go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserContact {
    pub username: String,
    pub email: Option<String>,
}

/// Six hex characters handed to a newly registered user.
pub fn generate_initial_password() -> String {
    let raw = uuid::Uuid::new_v4().simple().to_string();
    raw[..6].to_string()
}
