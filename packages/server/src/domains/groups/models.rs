use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::domains::users::UserRole;

/// Standing care groups an approved account is placed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CareGroup {
    /// Nurses, physicians and administrators.
    #[serde(rename = "NPA")]
    NursePhysicianAdmin,
    /// Patients, physicians and administrators.
    #[serde(rename = "PPA")]
    PatientPhysicianAdmin,
}

impl CareGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            CareGroup::NursePhysicianAdmin => "NPA",
            CareGroup::PatientPhysicianAdmin => "PPA",
        }
    }

    /// Groups a user of `role` belongs to once verified.
    pub fn for_role(role: UserRole) -> Vec<CareGroup> {
        match role {
            UserRole::Nurse => vec![CareGroup::NursePhysicianAdmin],
            UserRole::Patient => vec![CareGroup::PatientPhysicianAdmin],
            UserRole::Physician | UserRole::Admin => vec![
                CareGroup::NursePhysicianAdmin,
                CareGroup::PatientPhysicianAdmin,
            ],
        }
    }
}

impl std::fmt::Display for CareGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CareGroup {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "NPA" => Ok(CareGroup::NursePhysicianAdmin),
            "PPA" => Ok(CareGroup::PatientPhysicianAdmin),
            _ => Err(anyhow!("Invalid group: {}", s)),
        }
    }
}
