//! Console session cookie.
//!
//! Every login mints a fresh [`AccessKey`]. Browsers hold it in an
//! `HttpOnly; SameSite=Strict` cookie and every request to the console has
//! to present it; the backend bearer never leaves the process.

use uuid::Uuid;

pub const SESSION_COOKIE: &str = "console_session";

/// 7 days, matching how long the console keeps a session around.
const COOKIE_MAX_AGE_SECS: u64 = 604_800;

#[derive(Clone, PartialEq, Eq)]
pub struct AccessKey(String);

impl AccessKey {
    pub fn generate() -> Self {
        Self(format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple()))
    }

    /// Rebuilds a persisted key. Blank values are not keys.
    pub fn from_persisted(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        (!raw.is_empty()).then(|| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compares without an early exit on the first differing byte.
    pub fn matches(&self, presented: &str) -> bool {
        let expected = self.0.as_bytes();
        let presented = presented.as_bytes();
        expected.len() == presented.len()
            && expected
                .iter()
                .zip(presented)
                .fold(0u8, |acc, (a, b)| acc | (a ^ b))
                == 0
    }
}

impl std::fmt::Debug for AccessKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessKey(..)")
    }
}

/// `Set-Cookie` value handing `key` to the browser.
pub fn issue_cookie(key: &AccessKey) -> String {
    format!(
        "{SESSION_COOKIE}={}; HttpOnly; Secure; SameSite=Strict; Path=/; Max-Age={COOKIE_MAX_AGE_SECS}",
        key.as_str()
    )
}

/// `Set-Cookie` value that makes the browser forget the session.
pub fn expired_cookie() -> String {
    format!("{SESSION_COOKIE}=; HttpOnly; Secure; SameSite=Strict; Path=/; Max-Age=0")
}

/// Value of the session cookie in a `Cookie` request header.
pub fn cookie_value<'a>(cookieHeader: &'a str) -> Option<&'a str> {
    let prefix = format!("{SESSION_COOKIE}=");
    cookieHeader
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix(prefix.as_str()))
        .filter(|value| !value.is_empty())
}
