//! Session state: who is signed in, reconciled with durable storage.
//!
//! The store is the single source of truth for the authenticated identity
//! and its bearer token. The pair lives behind one lock and is replaced as
//! a whole record, so no reader can observe an identity from one sign-in
//! combined with a token from another. Durable storage is written only
//! here, as a result of the store's own transitions.

use parking_lot::Mutex;
use serde_json::Value;

use crate::api::{ApiClient, ApiError, ApiResult, AuthSuccess};
use crate::identity::{Identity, LoginCredentials, RegisterProfile};
use crate::storage::{ACCESS_TOKEN_KEY, CredentialStorage, FileStorage, USER_KEY};

/// An authenticated session: identity and token, always set together.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: Identity,
    pub token: String,
}

struct Inner {
    session: Option<Session>,
    /// Bumped by every logout. A sign-in that resolves against an older
    /// generation is stale and must not write state.
    generation: u64,
}

/// Single source of truth for "who is logged in".
pub struct SessionStore {
    storage: Box<dyn CredentialStorage>,
    inner: Mutex<Inner>,
}

impl SessionStore {
    /// A store over the given storage backend, initially unauthenticated.
    /// Call [`Self::restore`] to pick up a persisted session.
    pub fn new(storage: Box<dyn CredentialStorage>) -> Self {
        Self {
            storage,
            inner: Mutex::new(Inner {
                session: None,
                generation: 0,
            }),
        }
    }

    /// A store over the default on-disk credentials file.
    pub fn with_default_storage() -> Self {
        Self::new(Box::new(FileStorage::new()))
    }

    /// Restores a persisted session, run once at startup.
    ///
    /// Requires both entries, a non-empty token, and an identity that
    /// parses as a JSON object. Anything less reads as "no session":
    /// corrupt storage is never an error the caller sees.
    pub fn restore(&self) {
        let token = self
            .storage
            .get(ACCESS_TOKEN_KEY)
            .filter(|t| !t.is_empty());
        let user_raw = self.storage.get(USER_KEY);

        let session = match (token, user_raw) {
            (Some(token), Some(raw)) => match Identity::from_json(&raw) {
                Some(user) => Some(Session { user, token }),
                None => {
                    tracing::warn!("stored identity is unreadable, starting signed out");
                    None
                }
            },
            _ => None,
        };

        self.inner.lock().session = session;
    }

    /// The current session, if any.
    pub fn current(&self) -> Option<Session> {
        self.inner.lock().session.clone()
    }

    /// The current bearer token, if any.
    pub fn token(&self) -> Option<String> {
        self.inner.lock().session.as_ref().map(|s| s.token.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.lock().session.is_some()
    }

    /// Signs in and returns the raw service response.
    ///
    /// Validation failures surface before any dispatch; network and
    /// service failures propagate unmodified with state untouched.
    pub async fn login(
        &self,
        api: &ApiClient,
        credentials: &LoginCredentials,
    ) -> ApiResult<Value> {
        credentials.validate().map_err(ApiError::validation)?;

        let generation = self.inner.lock().generation;
        let auth = api.login(credentials).await?;
        self.complete_auth(generation, auth)
    }

    /// Creates an account and signs in. Same contract as [`Self::login`].
    pub async fn register(&self, api: &ApiClient, profile: &RegisterProfile) -> ApiResult<Value> {
        profile.validate().map_err(ApiError::validation)?;

        let generation = self.inner.lock().generation;
        let auth = api.register(profile).await?;
        self.complete_auth(generation, auth)
    }

    /// Signs out. Idempotent; never fails the caller.
    pub fn logout(&self) {
        let mut inner = self.inner.lock();
        inner.generation += 1;
        inner.session = None;

        if let Err(err) = self.storage.remove(ACCESS_TOKEN_KEY) {
            tracing::warn!(error = %err, "failed to clear stored token");
        }
        if let Err(err) = self.storage.remove(USER_KEY) {
            tracing::warn!(error = %err, "failed to clear stored identity");
        }
    }

    /// Installs the outcome of a successful sign-in, unless a logout
    /// happened while the request was in flight.
    fn complete_auth(&self, generation: u64, auth: AuthSuccess) -> ApiResult<Value> {
        let AuthSuccess { token, user, raw } = auth;

        let mut inner = self.inner.lock();
        if inner.generation != generation {
            tracing::debug!("discarding sign-in that resolved after a logout");
            return Err(ApiError::auth("Signed out while the sign-in was in flight"));
        }

        // Serialization of a JSON object cannot fail; keep the identity
        // exactly as received.
        let user_json =
            serde_json::to_string(user.as_value()).unwrap_or_else(|_| String::from("{}"));
        if let Err(err) = self.storage.set(ACCESS_TOKEN_KEY, &token) {
            tracing::warn!(error = %err, "failed to persist token; session will not survive a restart");
        }
        if let Err(err) = self.storage.set(USER_KEY, &user_json) {
            tracing::warn!(error = %err, "failed to persist identity; session will not survive a restart");
        }

        inner.session = Some(Session { user, token });
        Ok(raw)
    }
}
