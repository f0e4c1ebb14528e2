use serde::{Deserialize, Serialize};

use crate::error::{ConsoleError, ConsoleResult};
use crate::org::is_identifier;
use crate::role::Role;

pub const USER_FIELDS_REQUIRED: &str = "Username and Password are required";
pub const USER_TARGET_REQUIRED: &str = "Organization ID and Username are required";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgUser {
    pub username: String,
    pub role: Role,
}

/// `GET /orgs/{org_id}/users` body.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserList {
    #[serde(default)]
    pub users: Vec<OrgUser>,
}

/// `POST /orgs/{org_id}/users` body.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub role: Role,
}

impl std::fmt::Debug for CreateUserRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreateUserRequest")
            .field("username", &self.username)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

impl CreateUserRequest {
    /// Checks required fields, the identifier rule and the creator's role
    /// ceiling. `creator` is `None` when nobody is logged in.
    pub fn validate(
        username: &str,
        password: &str,
        role: Role,
        creator: Option<Role>,
    ) -> ConsoleResult<Self> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(ConsoleError::validation(USER_FIELDS_REQUIRED));
        }
        if !is_identifier(username) {
            return Err(ConsoleError::validation(
                "Username may only contain letters, digits, '_' and '-'",
            ));
        }
        match creator {
            Some(creatorRole) if creatorRole.can_assign(role) => {}
            Some(creatorRole) => {
                return Err(ConsoleError::Authorization(format!(
                    "{} users cannot assign the {} role",
                    creatorRole.label(),
                    role
                )));
            }
            None => return Err(ConsoleError::Authorization("not logged in".into())),
        }
        Ok(Self {
            username: username.to_string(),
            password: password.to_string(),
            role,
        })
    }
}

/// Path segments naming one user of one organization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserTarget {
    pub org_id: String,
    pub username: String,
}

impl UserTarget {
    /// Rejects blank or malformed segments so no request is sent for them.
    pub fn validate(org_id: &str, username: &str) -> ConsoleResult<Self> {
        let orgId = org_id.trim();
        let username = username.trim();
        if orgId.is_empty() || username.is_empty() {
            return Err(ConsoleError::validation(USER_TARGET_REQUIRED));
        }
        if !is_identifier(orgId) || !is_identifier(username) {
            return Err(ConsoleError::validation(
                "Organization ID and Username may only contain letters, digits, '_' and '-'",
            ));
        }
        Ok(Self {
            org_id: orgId.to_string(),
            username: username.to_string(),
        })
    }
}

/// Backend confirmation for a created user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedUser {
    pub username: String,
    pub role: Role,
    pub org_id: String,
}

/// Backend confirmation for a deleted user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedUser {
    pub deleted: String,
}

/// The user list as currently displayed for one organization.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRoster {
    users: Vec<OrgUser>,
}

impl UserRoster {
    pub fn new(users: Vec<OrgUser>) -> Self {
        Self { users }
    }

    pub fn users(&self) -> &[OrgUser] {
        &self.users
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Removes exactly the named user; returns whether it was present.
    pub fn remove(&mut self, username: &str) -> bool {
        let before = self.users.len();
        self.users.retain(|user| user.username != username);
        before != self.users.len()
    }

    /// Adds a user or replaces the entry with the same username.
    pub fn upsert(&mut self, user: OrgUser) {
        match self.users.iter_mut().find(|u| u.username == user.username) {
            Some(existing) => *existing = user,
            None => self.users.push(user),
        }
    }
}

impl From<UserList> for UserRoster {
    fn from(list: UserList) -> Self {
        Self::new(list.users)
    }
}
