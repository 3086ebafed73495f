//! Session state and the manager that owns it.
//!
//! The manager is the only writer. Consumers read a cloned [`Session`]
//! snapshot or subscribe to changes through a `watch` receiver.
//!
//! ```text
//! Hydrating ──hydrate()──► Unauthenticated | Authenticated
//! Unauthenticated ──login()──► Authenticated
//! Authenticated ──logout()──► Unauthenticated
//! ```
//!
//! `logout()` wins over a login still waiting on the network: that login
//! fails with [`AuthError::Superseded`] and leaves storage untouched.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use super::authenticator::Authenticator;
use super::claims::{decode_claims, TokenClaims};
use super::credentials::{CookieAttributes, CredentialStore};
use crate::api::AuthError;
use crate::routes::GuardState;
use crate::schema::Credentials;

/// What to do when a token's claims can't be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClaimsPolicy {
    /// Keep the session, drop only the claims (tenant becomes absent).
    #[default]
    Lenient,
    /// Treat an undecodable token as no session at all.
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Hydrating,
    Unauthenticated,
    Authenticated,
}

/// Authentication state as seen by consumers.
///
/// `is_authenticated()` is derived from the token, so the two can never
/// disagree.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    token: Option<String>,
    claims: Option<TokenClaims>,
    loading: bool,
}

impl Session {
    pub(crate) fn hydrating() -> Self {
        Self {
            token: None,
            claims: None,
            loading: true,
        }
    }

    pub(crate) fn signed_out() -> Self {
        Self {
            token: None,
            claims: None,
            loading: false,
        }
    }

    pub(crate) fn signed_in(token: String, claims: Option<TokenClaims>) -> Self {
        Self {
            token: Some(token),
            claims,
            loading: false,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// True only while the session is being restored from storage.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Tenant from the token claims. Informational, not an authorization boundary.
    pub fn tenant_id(&self) -> Option<&str> {
        self.claims.as_ref().and_then(|c| c.tenant_id.as_deref())
    }

    pub fn email(&self) -> Option<&str> {
        self.claims.as_ref().and_then(|c| c.email.as_deref())
    }

    pub fn claims(&self) -> Option<&TokenClaims> {
        self.claims.as_ref()
    }

    pub fn phase(&self) -> SessionPhase {
        if self.loading {
            SessionPhase::Hydrating
        } else if self.is_authenticated() {
            SessionPhase::Authenticated
        } else {
            SessionPhase::Unauthenticated
        }
    }

    pub fn guard_state(&self) -> GuardState {
        GuardState {
            is_authenticated: self.is_authenticated(),
            loading: self.loading,
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("phase", &self.phase())
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("tenant_id", &self.tenant_id())
            .finish()
    }
}

/// Owns the session and its three mutations: hydrate, login, logout.
pub struct SessionManager<A> {
    authenticator: A,
    store: Arc<dyn CredentialStore>,
    cookie: CookieAttributes,
    policy: ClaimsPolicy,
    state: watch::Sender<Session>,
    hydrated: AtomicBool,
    login_gate: Mutex<()>,
    /// Bumped by every logout. Held while storage and state are committed.
    generation: StdMutex<u64>,
}

impl<A: Authenticator> SessionManager<A> {
    pub fn new(authenticator: A, store: Arc<dyn CredentialStore>) -> Self {
        let (state, _) = watch::channel(Session::hydrating());
        Self {
            authenticator,
            store,
            cookie: CookieAttributes::default(),
            policy: ClaimsPolicy::default(),
            state,
            hydrated: AtomicBool::new(false),
            login_gate: Mutex::new(()),
            generation: StdMutex::new(0),
        }
    }

    pub fn with_cookie_attributes(mut self, cookie: CookieAttributes) -> Self {
        self.cookie = cookie;
        self
    }

    pub fn with_claims_policy(mut self, policy: ClaimsPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    /// Handle for consumers that want to react to session changes.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    /// Restore the session from storage. Runs once; later calls are no-ops.
    pub fn hydrate(&self) -> SessionPhase {
        if self.hydrated.swap(true, Ordering::SeqCst) {
            warn!("Session already hydrated");
            return self.snapshot().phase();
        }

        let token = match self.store.read() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Failed to read stored token, starting signed out");
                None
            }
        };

        let session = match token {
            None => Session::signed_out(),
            Some(token) => match decode_claims(&token) {
                Ok(claims) => Session::signed_in(token, Some(claims)),
                Err(e) => {
                    debug!(error = %e, "Stored token claims could not be decoded");
                    match self.policy {
                        ClaimsPolicy::Lenient => Session::signed_in(token, None),
                        ClaimsPolicy::Strict => {
                            if let Err(e) = self.store.clear() {
                                warn!(error = %e, "Failed to clear undecodable token");
                            }
                            Session::signed_out()
                        }
                    }
                }
            },
        };

        let phase = session.phase();
        debug!(?phase, tenant = ?session.tenant_id(), "Session hydrated");
        self.state.send_replace(session);
        phase
    }

    /// Exchange credentials for a token, persist it, then update the session.
    ///
    /// On any failure the in-memory session is left as it was.
    pub async fn login(&self, credentials: &Credentials) -> Result<(), AuthError> {
        let _gate = self.login_gate.lock().await;
        let started = *self.lock_generation();

        let issued = self.authenticator.authenticate(credentials).await?;

        let claims = match decode_claims(&issued.access_token) {
            Ok(claims) => Some(claims),
            Err(e) => match self.policy {
                ClaimsPolicy::Lenient => {
                    debug!(error = %e, "Issued token claims could not be decoded");
                    None
                }
                ClaimsPolicy::Strict => return Err(AuthError::InvalidToken(e)),
            },
        };

        let generation = self.lock_generation();
        if *generation != started {
            info!(username = credentials.username(), "Login superseded by logout");
            return Err(AuthError::Superseded);
        }

        self.store.write(&issued.access_token, &self.cookie)?;

        let session = Session::signed_in(issued.access_token, claims);
        info!(
            username = credentials.username(),
            tenant = ?session.tenant_id(),
            "Login successful"
        );
        self.hydrated.store(true, Ordering::SeqCst);
        self.state.send_replace(session);
        Ok(())
    }

    /// Clear storage and state. Never fails; storage errors are logged.
    ///
    /// Does not wait for an in-flight login; that login is cancelled instead.
    pub fn logout(&self) {
        let mut generation = self.lock_generation();
        *generation += 1;
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear stored token");
        }
        self.hydrated.store(true, Ordering::SeqCst);
        self.state.send_replace(Session::signed_out());
        info!("Logged out");
    }

    fn lock_generation(&self) -> std::sync::MutexGuard<'_, u64> {
        self.generation
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
