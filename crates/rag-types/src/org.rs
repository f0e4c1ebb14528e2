use serde::{Deserialize, Serialize};

use crate::error::{ConsoleError, ConsoleResult};

pub const ORG_FIELDS_REQUIRED: &str = "Organization ID and Name are required";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub org_id: String,
    pub name: String,
}

/// `GET /orgs` body.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgList {
    #[serde(default)]
    pub orgs: Vec<Organization>,
}

/// `POST /admin/orgs` body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrgRequest {
    pub org_id: String,
    pub org_name: String,
}

impl CreateOrgRequest {
    /// Client-side checks run before anything goes over the wire.
    pub fn validate(org_id: &str, org_name: &str) -> ConsoleResult<Self> {
        let orgId = org_id.trim();
        let orgName = org_name.trim();
        if orgId.is_empty() || orgName.is_empty() {
            return Err(ConsoleError::validation(ORG_FIELDS_REQUIRED));
        }
        if !is_identifier(orgId) {
            return Err(ConsoleError::validation(
                "Organization ID may only contain letters, digits, '_' and '-'",
            ));
        }
        Ok(Self {
            org_id: orgId.to_string(),
            org_name: orgName.to_string(),
        })
    }
}

/// Identifier rule the backend enforces on org ids and usernames:
/// `^[A-Za-z0-9_-]+$`.
pub fn is_identifier(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
