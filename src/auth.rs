//! Admin session: who is signed in, and the GoTrue calls that change it

use crate::api::{create_agent, error_message};
use crate::config::SessionFile;
use crate::models::Principal;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AuthError {
    /// Rejected before anything was sent
    #[error("{0}")]
    Invalid(String),
    /// The auth service said no; message is shown verbatim
    #[error("{0}")]
    Rejected(String),
    #[error("network error: {0}")]
    Transport(String),
    #[error("unexpected response from auth service: {0}")]
    Decode(String),
}

impl From<ureq::Error> for AuthError {
    fn from(e: ureq::Error) -> Self {
        AuthError::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(e: serde_json::Error) -> Self {
        AuthError::Decode(e.to_string())
    }
}

/// Client-side checks done before a credential pair is sent anywhere
pub fn validate_credentials(email: &str, password: &str) -> Result<(), AuthError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(AuthError::Invalid("Email is required".to_string()));
    }
    if !email.contains('@') {
        return Err(AuthError::Invalid("Enter a valid email address".to_string()));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::Invalid(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// The external auth service
pub trait AuthBackend: Send + Sync {
    fn sign_in(&self, email: &str, password: &str) -> Result<Principal, AuthError>;
    /// `None` when the account was created but needs confirmation first
    fn sign_up(&self, email: &str, password: &str) -> Result<Option<Principal>, AuthError>;
    fn refresh(&self, principal: &Principal) -> Result<Principal, AuthError>;
    /// Check a stored session is still accepted
    fn verify(&self, principal: &Principal) -> Result<Principal, AuthError>;
    fn sign_out(&self, principal: &Principal) -> Result<(), AuthError>;
}

#[derive(Debug, Deserialize)]
struct GoTrueUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: GoTrueUser,
}

impl TokenResponse {
    fn into_principal(self, now: i64) -> Principal {
        let expires_at = self
            .expires_at
            .unwrap_or_else(|| now + self.expires_in.unwrap_or(3600));
        Principal {
            user_id: self.user.id,
            email: self.user.email.unwrap_or_default(),
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
        }
    }
}

fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Supabase GoTrue (`{url}/auth/v1`)
pub struct GoTrueAuth {
    base_url: String,
    anon_key: String,
    agent: ureq::Agent,
}

impl GoTrueAuth {
    pub fn new(base_url: &str, anon_key: &str) -> Self {
        Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            anon_key: anon_key.trim().to_string(),
            agent: create_agent(10, 30),
        }
    }

    pub fn with_timeouts(mut self, connect_secs: u64, request_secs: u64) -> Self {
        self.agent = create_agent(connect_secs, request_secs);
        self
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn ensure_configured(&self) -> Result<(), AuthError> {
        if self.base_url.is_empty() || self.anon_key.is_empty() {
            return Err(AuthError::Invalid(
                "Backend is not configured (set the Supabase URL and anon key in Settings)".to_string(),
            ));
        }
        Ok(())
    }

    fn read(mut response: ureq::http::Response<ureq::Body>) -> Result<Value, AuthError> {
        let status = response.status().as_u16();
        let body = response.body_mut().read_to_string()?;
        if !(200..300).contains(&status) {
            return Err(AuthError::Rejected(error_message(&body)));
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }

    fn post(&self, path: &str, grant_type: Option<&str>, bearer: Option<&str>, body: &Value) -> Result<Value, AuthError> {
        self.ensure_configured()?;

        let mut request = self
            .agent
            .post(&self.auth_url(path))
            .header("apikey", &self.anon_key)
            .header("Content-Type", "application/json");
        if let Some(grant_type) = grant_type {
            request = request.query("grant_type", grant_type);
        }
        if let Some(token) = bearer {
            request = request.header("Authorization", &format!("Bearer {}", token));
        }

        Self::read(request.send(body.to_string())?)
    }

    fn token_grant(&self, grant_type: &str, body: &Value) -> Result<Principal, AuthError> {
        let value = self.post("token", Some(grant_type), None, body)?;
        let token: TokenResponse = serde_json::from_value(value)?;
        Ok(token.into_principal(now_secs()))
    }
}

impl AuthBackend for GoTrueAuth {
    fn sign_in(&self, email: &str, password: &str) -> Result<Principal, AuthError> {
        self.token_grant("password", &json!({ "email": email, "password": password }))
    }

    fn sign_up(&self, email: &str, password: &str) -> Result<Option<Principal>, AuthError> {
        let value = self.post("signup", None, None, &json!({ "email": email, "password": password }))?;

        // With email confirmation on, GoTrue answers with just the user
        if value.get("access_token").is_some() {
            let token: TokenResponse = serde_json::from_value(value)?;
            Ok(Some(token.into_principal(now_secs())))
        } else {
            Ok(None)
        }
    }

    fn refresh(&self, principal: &Principal) -> Result<Principal, AuthError> {
        self.token_grant("refresh_token", &json!({ "refresh_token": principal.refresh_token }))
    }

    fn verify(&self, principal: &Principal) -> Result<Principal, AuthError> {
        self.ensure_configured()?;

        let response = self
            .agent
            .get(&self.auth_url("user"))
            .header("apikey", &self.anon_key)
            .header("Authorization", &format!("Bearer {}", principal.access_token))
            .call()?;
        let user: GoTrueUser = serde_json::from_value(Self::read(response)?)?;

        Ok(Principal {
            user_id: user.id,
            email: user.email.unwrap_or_else(|| principal.email.clone()),
            ..principal.clone()
        })
    }

    fn sign_out(&self, principal: &Principal) -> Result<(), AuthError> {
        self.post("logout", None, Some(&principal.access_token), &json!({}))?;
        Ok(())
    }
}

/// Where the session currently stands
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// The stored session has not been checked yet
    Loading,
    SignedOut,
    SignedIn(Principal),
}

impl SessionState {
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            SessionState::SignedIn(p) => Some(p),
            _ => None,
        }
    }

    pub fn is_signed_in(&self) -> bool {
        matches!(self, SessionState::SignedIn(_))
    }
}

pub type ListenerId = u64;
pub type Listener = Arc<dyn Fn(&SessionState) + Send + Sync>;

struct SessionInner {
    state: SessionState,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: ListenerId,
}

/// Shared session context. Cheap to clone; every clone sees the same state.
#[derive(Clone)]
pub struct AuthSession {
    backend: Arc<dyn AuthBackend>,
    store: Option<SessionFile>,
    inner: Arc<Mutex<SessionInner>>,
}

impl AuthSession {
    pub fn new(backend: Arc<dyn AuthBackend>, store: Option<SessionFile>) -> Self {
        Self {
            backend,
            store,
            inner: Arc::new(Mutex::new(SessionInner {
                state: SessionState::Loading,
                listeners: Vec::new(),
                next_listener: 1,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self) -> SessionState {
        self.lock().state.clone()
    }

    pub fn principal(&self) -> Option<Principal> {
        self.lock().state.principal().cloned()
    }

    pub fn subscribe(&self, listener: Listener) -> ListenerId {
        let mut inner = self.lock();
        let id = inner.next_listener;
        inner.next_listener += 1;
        inner.listeners.push((id, listener));
        id
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut inner = self.lock();
        let before = inner.listeners.len();
        inner.listeners.retain(|(listener_id, _)| *listener_id != id);
        inner.listeners.len() != before
    }

    /// Overwrite the state and notify listeners outside the lock
    fn set_state(&self, state: SessionState) {
        self.transition(state, |_| true);
    }

    /// Apply `state` only if `allowed` accepts the current one.
    /// The check, the write and persistence happen under one lock.
    fn transition(&self, state: SessionState, allowed: impl FnOnce(&SessionState) -> bool) -> bool {
        let listeners: Vec<Listener> = {
            let mut inner = self.lock();
            if !allowed(&inner.state) {
                return false;
            }
            inner.state = state.clone();
            if let Some(store) = &self.store {
                match &state {
                    SessionState::SignedIn(p) => store.save(p),
                    SessionState::SignedOut => store.clear(),
                    SessionState::Loading => {}
                }
            }
            inner.listeners.iter().map(|(_, l)| Arc::clone(l)).collect()
        };

        for listener in listeners {
            listener(&state);
        }
        true
    }

    /// Resolve the initial `Loading` state from the stored session, if any
    pub fn restore(&self) -> SessionState {
        self.restore_at(now_secs())
    }

    pub fn restore_at(&self, now: i64) -> SessionState {
        let stored = self.store.as_ref().and_then(|s| s.load());

        let state = match stored {
            None => SessionState::SignedOut,
            Some(principal) => {
                let checked = if principal.is_expired(now) {
                    self.backend.refresh(&principal)
                } else {
                    self.backend.verify(&principal)
                };
                match checked {
                    Ok(p) => {
                        log::info!("Restored session for {}", p.email);
                        SessionState::SignedIn(p)
                    }
                    Err(e) => {
                        log::warn!("Stored session is no longer valid: {}", e);
                        SessionState::SignedOut
                    }
                }
            }
        };

        self.set_state(state.clone());
        state
    }

    pub fn sign_in(&self, email: &str, password: &str) -> Result<(), AuthError> {
        validate_credentials(email, password)?;

        match self.backend.sign_in(email.trim(), password) {
            Ok(principal) => {
                log::info!("Signed in as {}", principal.email);
                self.set_state(SessionState::SignedIn(principal));
                Ok(())
            }
            Err(e) => {
                log::warn!("Sign-in failed: {}", e);
                Err(e)
            }
        }
    }

    /// Returns true if the new account is already signed in
    pub fn sign_up(&self, email: &str, password: &str) -> Result<bool, AuthError> {
        validate_credentials(email, password)?;

        match self.backend.sign_up(email.trim(), password) {
            Ok(Some(principal)) => {
                log::info!("Created account {}", principal.email);
                self.set_state(SessionState::SignedIn(principal));
                Ok(true)
            }
            Ok(None) => {
                log::info!("Created account {} (confirmation pending)", email.trim());
                Ok(false)
            }
            Err(e) => {
                log::warn!("Sign-up failed: {}", e);
                Err(e)
            }
        }
    }

    /// Always succeeds locally; a failed remote logout is only logged.
    /// The principal is gone before the remote call starts.
    pub fn sign_out(&self) {
        let principal = self.principal();
        self.set_state(SessionState::SignedOut);

        if let Some(principal) = principal {
            log::info!("Signed out {}", principal.email);
            if let Err(e) = self.backend.sign_out(&principal) {
                log::warn!("Remote sign-out failed: {}", e);
            }
        }
    }

    pub fn needs_refresh(&self, now: i64) -> bool {
        self.principal().is_some_and(|p| p.is_expired(now))
    }

    /// Refresh an expired session, or drop it if the refresh is refused.
    /// Returns true if the state changed.
    pub fn check_expiry(&self, now: i64) -> bool {
        let Some(principal) = self.principal().filter(|p| p.is_expired(now)) else {
            return false;
        };

        let outcome = self.backend.refresh(&principal);

        // A sign-out or new sign-in during the refresh wins
        let unchanged = |current: &SessionState| {
            current
                .principal()
                .is_some_and(|p| p.access_token == principal.access_token)
        };
        match outcome {
            Ok(fresh) => {
                let email = fresh.email.clone();
                if self.transition(SessionState::SignedIn(fresh), unchanged) {
                    log::debug!("Session refreshed for {}", email);
                    return true;
                }
            }
            Err(e) => {
                if self.transition(SessionState::SignedOut, unchanged) {
                    log::warn!("Session expired: {}", e);
                    return true;
                }
            }
        }
        log::debug!("Session changed during refresh, result discarded");
        false
    }
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
