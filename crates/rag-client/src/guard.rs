use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use rag_types::{
    permits, Action, BearerToken, ConsoleError, ConsoleResult, Role, Session, SessionUser,
};
use tracing::{debug, info, warn};

use crate::access::AccessKey;
use crate::metrics::ConsoleMetrics;
use crate::storage::{SessionStorage, ACCESS_KEY, TOKEN_KEY, USER_KEY};

/// Exchanges credentials for a session. The production implementation is
/// [`crate::api::TokenEndpoint`].
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, username: &str, password: &str) -> ConsoleResult<Session>;
}

/// Result of a successful login: the backend session and the key callers
/// must present to act under it.
#[derive(Clone, Debug)]
pub struct SignedIn {
    pub session: Session,
    pub key: AccessKey,
}

/// Owner of the current session.
///
/// The guard is the only writer of the in-memory session and of the
/// persisted record, and it updates both under one write lock. Clones share
/// state; everything else reads through it.
#[derive(Clone)]
pub struct SessionGuard {
    inner: Arc<GuardInner>,
}

struct GuardInner {
    storage: Arc<dyn SessionStorage>,
    authenticator: Arc<dyn Authenticator>,
    metrics: Option<ConsoleMetrics>,
    current: RwLock<Option<SignedIn>>,
}

impl SessionGuard {
    pub fn new(storage: Arc<dyn SessionStorage>, authenticator: Arc<dyn Authenticator>) -> Self {
        Self::build(storage, authenticator, None)
    }

    /// Like [`Self::new`], counting login attempts in `metrics`.
    pub fn with_metrics(
        storage: Arc<dyn SessionStorage>,
        authenticator: Arc<dyn Authenticator>,
        metrics: ConsoleMetrics,
    ) -> Self {
        Self::build(storage, authenticator, Some(metrics))
    }

    fn build(
        storage: Arc<dyn SessionStorage>,
        authenticator: Arc<dyn Authenticator>,
        metrics: Option<ConsoleMetrics>,
    ) -> Self {
        Self {
            inner: Arc::new(GuardInner {
                storage,
                authenticator,
                metrics,
                current: RwLock::new(None),
            }),
        }
    }

    /// Loads the persisted session. Missing, partial or malformed records
    /// leave the guard logged out and are wiped from storage. A record
    /// without an access key gets a fresh one.
    pub fn restore(&self) -> Option<SessionUser> {
        let mut current = self.write();
        let storage = &self.inner.storage;
        let restored = match (storage.get(USER_KEY), storage.get(TOKEN_KEY)) {
            (Ok(None), Ok(None)) => {
                debug!("no persisted session");
                None
            }
            (Ok(Some(user)), Ok(Some(token))) => {
                let session = Session::from_persisted(&user, &token);
                if session.is_none() {
                    warn!("persisted session is malformed, discarding");
                }
                session
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!("failed to read persisted session: {e}, discarding");
                None
            }
            _ => {
                warn!("persisted session is incomplete, discarding");
                None
            }
        };

        let Some(session) = restored else {
            self.clear_storage();
            *current = None;
            return None;
        };

        let persistedKey = storage
            .get(ACCESS_KEY)
            .ok()
            .flatten()
            .and_then(|raw| AccessKey::from_persisted(&raw));
        let key = match persistedKey {
            Some(key) => key,
            None => {
                let key = AccessKey::generate();
                self.persist(&session, &key);
                key
            }
        };

        info!(
            "restored session for {} ({})",
            session.username(),
            session.role()
        );
        let user = session.user.clone();
        *current = Some(SignedIn { session, key });
        Some(user)
    }

    /// Authenticates and, on success, replaces the current session and
    /// mints a new access key. A failed attempt leaves whatever session
    /// existed untouched.
    pub async fn login(&self, username: &str, password: &str) -> ConsoleResult<SignedIn> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(ConsoleError::validation(
                rag_types::USER_FIELDS_REQUIRED,
            ));
        }

        let session = match self.inner.authenticator.authenticate(username, password).await {
            Ok(s) => s,
            Err(e) => {
                self.record_login(false, None);
                warn!("login failed for {username}: {e}");
                return Err(e);
            }
        };

        let signedIn = SignedIn {
            session,
            key: AccessKey::generate(),
        };
        {
            let mut current = self.write();
            self.persist(&signedIn.session, &signedIn.key);
            *current = Some(signedIn.clone());
        }

        self.record_login(true, Some(signedIn.session.role()));
        info!(
            "logged in as {} ({})",
            signedIn.session.username(),
            signedIn.session.role()
        );
        Ok(signedIn)
    }

    /// Clears the session in memory and on disk. Safe to call repeatedly.
    pub fn logout(&self) {
        let mut current = self.write();
        let previous = current.take();
        self.clear_storage();
        drop(current);
        if let Some(signedIn) = previous {
            info!("logged out {}", signedIn.session.username());
        }
    }

    /// Logs out only if `presented` is the current access key.
    pub fn revoke(&self, presented: &str) -> bool {
        let mut current = self.write();
        if !current.as_ref().is_some_and(|s| s.key.matches(presented)) {
            return false;
        }
        let previous = current.take();
        self.clear_storage();
        drop(current);
        if let Some(signedIn) = previous {
            info!("logged out {}", signedIn.session.username());
        }
        true
    }

    /// Drops the session if it still carries `token`. Called when the
    /// backend rejects that token, so a newer login is never clobbered.
    pub fn invalidate(&self, token: &BearerToken) {
        let mut current = self.write();
        if !current.as_ref().is_some_and(|s| &s.session.token == token) {
            return;
        }
        let expired = current.take();
        self.clear_storage();
        drop(current);
        if let Some(signedIn) = expired {
            warn!(
                "backend rejected session for {}, re-authentication required",
                signedIn.session.username()
            );
        }
    }

    /// The logged-in user, if `presented` is the current access key.
    pub fn user_for(&self, presented: &str) -> Option<SessionUser> {
        self.read()
            .as_ref()
            .filter(|s| s.key.matches(presented))
            .map(|s| s.session.user.clone())
    }

    pub fn current_role(&self) -> Option<Role> {
        self.read().as_ref().map(|s| s.session.role())
    }

    pub fn current_user(&self) -> Option<SessionUser> {
        self.read().as_ref().map(|s| s.session.user.clone())
    }

    pub fn session(&self) -> Option<Session> {
        self.read().as_ref().map(|s| s.session.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_some()
    }

    /// Token to attach to the next outbound request, read fresh each time.
    pub fn bearer(&self) -> Option<BearerToken> {
        self.read().as_ref().map(|s| s.session.token.clone())
    }

    /// Derived from [`Self::current_role`] alone.
    pub fn can(&self, action: Action, target: Option<Role>) -> bool {
        permits(self.current_role(), action, target)
    }

    pub fn assignable_roles(&self) -> &'static [Role] {
        self.current_role()
            .map(Role::assignable_roles)
            .unwrap_or(&[])
    }

    /// Callers hold the write lock. A failed write wipes the record so a
    /// restart never pairs one user with another user's token.
    fn persist(&self, session: &Session, key: &AccessKey) {
        let user = session.persisted_user();
        let result = self.inner.storage.set_record(&[
            (USER_KEY, user.as_str()),
            (TOKEN_KEY, session.token.as_str()),
            (ACCESS_KEY, key.as_str()),
        ]);
        if let Err(e) = result {
            warn!("failed to persist session, it will not survive a restart: {e}");
            self.clear_storage();
        }
    }

    fn clear_storage(&self) {
        if let Err(e) = self.inner.storage.clear() {
            warn!("failed to clear persisted session: {e}");
        }
    }

    fn record_login(&self, succeeded: bool, role: Option<Role>) {
        if let Some(metrics) = &self.inner.metrics {
            metrics.login_attempt(succeeded, role);
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Option<SignedIn>> {
        self.inner.current.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Option<SignedIn>> {
        self.inner.current.write().unwrap_or_else(|e| e.into_inner())
    }
}
