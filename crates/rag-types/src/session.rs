use serde::{Deserialize, Serialize};

use crate::role::{permits, Action, Role};

/// Identity half of a session. This is what gets persisted under the
/// `user` key and what views are allowed to see.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub username: String,
    pub role: Role,
}

impl SessionUser {
    pub fn can(&self, action: Action, target: Option<Role>) -> bool {
        permits(Some(self.role), action, target)
    }
}

/// Opaque bearer token. Debug output is redacted.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BearerToken(String);

impl BearerToken {
    /// Returns `None` for blank input; a blank token is never a session.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            None
        } else {
            Some(Self(raw))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn header_value(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BearerToken(***)")
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub user: SessionUser,
    pub token: BearerToken,
}

impl Session {
    pub fn username(&self) -> &str {
        &self.user.username
    }

    pub fn role(&self) -> Role {
        self.user.role
    }

    /// Rebuilds a session from the two persisted strings. Anything that
    /// does not parse into a complete identity yields `None`.
    pub fn from_persisted(user: &str, token: &str) -> Option<Self> {
        let user: SessionUser = serde_json::from_str(user).ok()?;
        if user.username.trim().is_empty() {
            return None;
        }
        let token = BearerToken::new(token)?;
        Some(Self { user, token })
    }

    pub fn persisted_user(&self) -> String {
        // SessionUser holds only strings and a unit enum; serialization cannot fail.
        serde_json::to_string(&self.user).unwrap_or_default()
    }
}

/// Body of a successful `POST /token`.
///
/// The backend answers `{access_token, token_type, role}`; older builds
/// answered `{token, user}`. Both are accepted.
#[derive(Clone, Debug, Deserialize)]
pub struct TokenGrant {
    #[serde(alias = "token")]
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub user: Option<GrantUser>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct GrantUser {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
}

impl TokenGrant {
    /// Resolves the grant into a session for `requested_username`.
    /// Returns `None` when the grant lacks a usable token or role.
    pub fn into_session(self, requested_username: &str) -> Option<Session> {
        if let Some(kind) = self.token_type.as_deref() {
            if !kind.eq_ignore_ascii_case("bearer") {
                return None;
            }
        }
        let (grantUsername, grantRole) = match self.user {
            Some(user) => (user.username, user.role),
            None => (None, None),
        };
        let role = self.role.or(grantRole)?;
        let username = grantUsername
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| requested_username.to_string());
        if username.trim().is_empty() {
            return None;
        }
        let token = BearerToken::new(self.access_token)?;
        Some(Session {
            user: SessionUser { username, role },
            token,
        })
    }
}
