//! The session store: single owner of "who is logged in".
//!
//! State lives in a `watch` channel so every view reads the same snapshot;
//! only `hydrate`, `login`, `refresh`/`ensure_fresh` and `logout` write it.
//! Every failure on the silent paths folds into `Unauthenticated`.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::credentials::{Credential, CredentialStorage, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
use super::{token, AuthError};
use crate::api::AuthBackend;
use crate::clock::Clock;
use crate::guard::{Navigation, Navigator};
use crate::models::{BackendUser, Identity, LoginCredentials};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Initializing,
    Authenticated(Identity),
    Unauthenticated,
}

impl SessionState {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            SessionState::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, SessionState::Initializing)
    }
}

pub struct SessionStore {
    backend: Arc<dyn AuthBackend>,
    storage: Arc<dyn CredentialStorage>,
    clock: Arc<dyn Clock>,
    navigator: Arc<dyn Navigator>,
    state: watch::Sender<SessionState>,
    /// Bumped by logout and by a committed login. A network call that started
    /// under an older epoch must not touch state or storage when it resolves.
    epoch: Mutex<u64>,
}

impl SessionStore {
    pub fn new(
        backend: Arc<dyn AuthBackend>,
        storage: Arc<dyn CredentialStorage>,
        clock: Arc<dyn Clock>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Initializing);
        Self {
            backend,
            storage,
            clock,
            navigator,
            state,
            epoch: Mutex::new(0),
        }
    }

    /// Current snapshot
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receive every state change
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.state.borrow().identity().cloned()
    }

    fn lock_epoch(&self) -> MutexGuard<'_, u64> {
        self.epoch.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn current_epoch(&self) -> u64 {
        *self.lock_epoch()
    }

    /// Run `write` and publish `next` only if no logout or successful login
    /// happened since `epoch` was taken. Returns `Superseded` otherwise.
    fn commit<F>(&self, epoch: u64, write: F, next: Option<SessionState>) -> Result<(), AuthError>
    where
        F: FnOnce(&dyn CredentialStorage) -> anyhow::Result<()>,
    {
        self.commit_at(epoch, false, write, next)
    }

    /// Like `commit`, but a successful commit also supersedes every call
    /// still in flight.
    fn commit_superseding<F>(&self, epoch: u64, write: F, next: SessionState) -> Result<(), AuthError>
    where
        F: FnOnce(&dyn CredentialStorage) -> anyhow::Result<()>,
    {
        self.commit_at(epoch, true, write, Some(next))
    }

    fn commit_at<F>(&self, epoch: u64, advance: bool, write: F, next: Option<SessionState>) -> Result<(), AuthError>
    where
        F: FnOnce(&dyn CredentialStorage) -> anyhow::Result<()>,
    {
        let mut guard = self.lock_epoch();
        if *guard != epoch {
            debug!(started = epoch, current = *guard, "Discarding stale session result");
            return Err(AuthError::Superseded);
        }
        write(self.storage.as_ref())?;
        if advance {
            *guard += 1;
        }
        if let Some(next) = next {
            self.state.send_replace(next);
        }
        Ok(())
    }

    /// Restore the session from the persisted credential. Call once at startup.
    ///
    /// Never fails: a missing, malformed, or unrenewable credential ends in
    /// `Unauthenticated`. At most one network call (a refresh) is made.
    pub async fn hydrate(&self) -> SessionState {
        let epoch = self.current_epoch();

        let credential = match Credential::load(self.storage.as_ref()) {
            Ok(Some(credential)) => credential,
            Ok(None) => {
                debug!("No persisted credential");
                let _ = self.commit(epoch, |_| Ok(()), Some(SessionState::Unauthenticated));
                return self.state();
            }
            Err(e) => {
                warn!(error = %e, "Failed to read persisted credential");
                self.logout();
                return self.state();
            }
        };

        let identity = match token::decode_identity(&credential.access_token, credential.account.clone()) {
            Ok(identity) => identity,
            Err(e) => {
                warn!(error = %e, "Persisted credential could not be decoded");
                self.logout();
                return self.state();
            }
        };

        if identity.is_valid_at(self.clock.now()) {
            info!(user = %identity.id(), role = %identity.role(), "Session restored");
            let _ = self.commit(epoch, |_| Ok(()), Some(SessionState::Authenticated(identity)));
            return self.state();
        }

        debug!(expired_at = %identity.expires_at(), "Persisted credential expired, refreshing");
        let fallback = BackendUser::from(&identity);
        match self.renew(epoch, Some(fallback)).await {
            Ok(()) => {}
            Err(AuthError::Superseded) => {}
            Err(e) => {
                warn!(error = %e, "Refresh during hydrate failed");
                self.logout_if_current(epoch);
            }
        }
        self.state()
    }

    /// Submit credentials to the backend. On success the tokens are
    /// persisted and the state becomes `Authenticated`; on failure nothing
    /// changes and the error is returned for display.
    pub async fn login(&self, credentials: LoginCredentials) -> Result<Identity, AuthError> {
        let epoch = self.current_epoch();

        let grant = self.backend.login(&credentials).await.map_err(|e| {
            warn!(error = %e, "Login failed");
            e
        })?;

        let identity = token::decode_identity(&grant.access_token, grant.account.clone())?;
        if !identity.is_valid_at(self.clock.now()) {
            warn!("Backend issued an already-expired access token");
            return Err(AuthError::ExpiredCredential);
        }

        let credential = Credential {
            access_token: grant.access_token,
            refresh_token: grant.refresh_token,
            account: Some(BackendUser::from(&identity)),
        };
        self.commit_superseding(
            epoch,
            |storage| {
                // A fresh login never inherits an older renewal token.
                Credential::clear(storage)?;
                credential.save(storage)
            },
            SessionState::Authenticated(identity.clone()),
        )?;

        info!(user = %identity.id(), role = %identity.role(), "Login successful");
        Ok(identity)
    }

    /// Exchange the stored renewal token for a new bearer token and persist
    /// it. Single attempt; does not change the session state or log out on
    /// failure, that is the caller's decision.
    pub async fn refresh(&self) -> Result<String, AuthError> {
        let epoch = self.current_epoch();
        let (access_token, _) = self.refresh_tokens(epoch).await?;
        Ok(access_token)
    }

    async fn refresh_tokens(&self, epoch: u64) -> Result<(String, Option<BackendUser>), AuthError> {
        let refresh_token = self
            .storage
            .get(REFRESH_TOKEN_KEY)?
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::ExpiredCredential)?;

        let grant = self.backend.refresh(&refresh_token).await?;
        token::expiry(&grant.access_token)?;

        let credential = Credential {
            access_token: grant.access_token.clone(),
            refresh_token: grant.refresh_token,
            account: grant.account.clone(),
        };
        self.commit(epoch, |storage| credential.save(storage), None)?;
        debug!("Access token refreshed");
        Ok((grant.access_token, grant.account))
    }

    /// Refresh and move to `Authenticated` with the renewed identity.
    async fn renew(&self, epoch: u64, fallback: Option<BackendUser>) -> Result<(), AuthError> {
        let (access_token, account) = self.refresh_tokens(epoch).await?;
        let identity = token::decode_identity(&access_token, account.or(fallback))?;
        if !identity.is_valid_at(self.clock.now()) {
            return Err(AuthError::ExpiredCredential);
        }
        info!(user = %identity.id(), "Session renewed");
        self.commit(epoch, |_| Ok(()), Some(SessionState::Authenticated(identity)))
    }

    /// Re-check expiry of an authenticated session, renewing it once if
    /// needed. A failed renewal logs the user out.
    pub async fn ensure_fresh(&self) -> SessionState {
        let identity = match self.state() {
            SessionState::Authenticated(identity) => identity,
            other => return other,
        };
        if identity.is_valid_at(self.clock.now()) {
            return SessionState::Authenticated(identity);
        }

        let epoch = self.current_epoch();
        match self.renew(epoch, Some(BackendUser::from(&identity))).await {
            Ok(()) | Err(AuthError::Superseded) => {}
            Err(e) => {
                warn!(error = %e, "Session expired and could not be renewed");
                self.logout_if_current(epoch);
            }
        }
        self.state()
    }

    /// Bearer token for an authenticated request, renewing it first if it
    /// has expired. `None` when there is no usable session.
    pub async fn access_token(&self) -> Option<String> {
        if !self.ensure_fresh().await.is_authenticated() {
            return None;
        }
        match self.storage.get(ACCESS_TOKEN_KEY) {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Failed to read access token");
                None
            }
        }
    }

    fn logout_if_current(&self, epoch: u64) {
        if self.current_epoch() == epoch {
            self.logout();
        }
    }

    /// Clear the credential, become `Unauthenticated` and send the user to
    /// the login view. Safe to call repeatedly.
    pub fn logout(&self) {
        {
            let mut epoch = self.lock_epoch();
            *epoch += 1;
            if let Err(e) = Credential::clear(self.storage.as_ref()) {
                warn!(error = %e, "Failed to clear persisted credential");
            }
            let was_authenticated = self.state.borrow().is_authenticated();
            self.state.send_replace(SessionState::Unauthenticated);
            if was_authenticated {
                info!("Logged out");
            }
        }
        self.navigator.navigate(&Navigation::login(None));
    }
}
