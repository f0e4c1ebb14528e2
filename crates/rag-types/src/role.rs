use serde::{Deserialize, Serialize};

/// Console role, ordered from least to most privileged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Viewer,
    Editor,
    Admin,
}

/// Actions the console can gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    ListOrgs,
    CreateOrg,
    ListUsers,
    CreateUser,
    DeleteUser,
}

const ADMIN_ACTIONS: &[Action] = &[
    Action::ListOrgs,
    Action::CreateOrg,
    Action::ListUsers,
    Action::CreateUser,
    Action::DeleteUser,
];

const EDITOR_ACTIONS: &[Action] = &[
    Action::ListOrgs,
    Action::ListUsers,
    Action::CreateUser,
    Action::DeleteUser,
];

const VIEWER_ACTIONS: &[Action] = &[Action::ListOrgs, Action::ListUsers];

impl Role {
    pub const ALL: [Role; 3] = [Role::Viewer, Role::Editor, Role::Admin];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Viewer => "viewer",
            Role::Editor => "editor",
            Role::Admin => "admin",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Role::Viewer => "Viewer",
            Role::Editor => "Editor",
            Role::Admin => "Admin",
        }
    }

    /// Capability table row for this role.
    pub fn capabilities(self) -> &'static [Action] {
        match self {
            Role::Admin => ADMIN_ACTIONS,
            Role::Editor => EDITOR_ACTIONS,
            Role::Viewer => VIEWER_ACTIONS,
        }
    }

    /// Roles this role may hand out when creating a user.
    pub fn assignable_roles(self) -> &'static [Role] {
        match self {
            Role::Admin => &[Role::Viewer, Role::Editor, Role::Admin],
            Role::Editor => &[Role::Viewer, Role::Editor],
            Role::Viewer => &[],
        }
    }

    pub fn can_assign(self, target: Role) -> bool {
        self.assignable_roles().contains(&target)
    }
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::ListOrgs => "list_orgs",
            Action::CreateOrg => "create_org",
            Action::ListUsers => "list_users",
            Action::CreateUser => "create_user",
            Action::DeleteUser => "delete_user",
        }
    }
}

/// Single gate used by the guard, the API routes and the views.
///
/// `target` only matters for [`Action::CreateUser`], where it must fall
/// under the caller's role ceiling. A missing role permits nothing.
pub fn permits(role: Option<Role>, action: Action, target: Option<Role>) -> bool {
    let Some(role) = role else {
        return false;
    };
    if !role.capabilities().contains(&action) {
        return false;
    }
    match (action, target) {
        (Action::CreateUser, Some(target)) => role.can_assign(target),
        _ => true,
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "viewer" => Ok(Role::Viewer),
            "editor" => Ok(Role::Editor),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}
