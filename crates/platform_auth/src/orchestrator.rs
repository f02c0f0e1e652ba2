use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use credential_store::{AuthSession, CredentialStore};
use platform_api::payload::LoginRequest;
use platform_api::{endpoints, ApiRequest, NormalizedResponse, PlatformApiError, PlatformTransport};
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::error::AuthError;
use crate::jwt::is_expired_at;

pub const DEFAULT_REFRESH_REASON: &str = "Access token expired. Trying auth refresh...";

/// In-memory mirror of the signed-in session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    pub access_credential: Option<String>,
    pub refresh_credential: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearReason {
    MissingRefreshCredential,
    RefreshRejected,
    RefreshMissingAccessCredential,
    UnauthorizedAfterRetry,
    ExpiredAtStartup,
    Logout,
}

impl ClearReason {
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::MissingRefreshCredential => "No refresh_token found. Please run login.",
            Self::RefreshRejected => "Token refresh failed. Please run login.",
            Self::RefreshMissingAccessCredential => {
                "Refresh response missing access_token. Please run login."
            }
            Self::UnauthorizedAfterRetry => {
                "Authorization expired or invalid after retry. Please run login."
            }
            Self::ExpiredAtStartup => "Stored token is expired. Please run login.",
            Self::Logout => "Logged out.",
        }
    }
}

/// Progress reported to whoever renders the session log.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    /// Any response the orchestrator received, including refresh and login.
    Response(NormalizedResponse),
    RefreshStarted { reason: String },
    /// Refresh was requested without a refresh credential and the session
    /// was kept.
    RefreshUnavailable,
    Refreshed,
    Retrying,
    SessionCleared(ClearReason),
    LoggedIn { username: String },
}

pub type AuthEventSink = Arc<dyn Fn(&AuthEvent) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    Restored,
    /// The stored credential was an expired JWT and has been cleared.
    Expired,
    /// Nothing stored. `warning` is set when a bad file was quarantined.
    Missing { warning: Option<String> },
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoginOutcome {
    Succeeded { username: String },
    Rejected(NormalizedResponse),
    MissingAccessCredential(NormalizedResponse),
}

/// Owns the session and applies the refresh/retry policy.
pub struct AuthOrchestrator {
    transport: Arc<dyn PlatformTransport>,
    store: CredentialStore,
    state: Mutex<AuthState>,
    events: Option<AuthEventSink>,
}

impl std::fmt::Debug for AuthOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthOrchestrator")
            .field("store", &self.store)
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}

impl AuthOrchestrator {
    pub fn new(transport: Arc<dyn PlatformTransport>, store: CredentialStore) -> Self {
        Self {
            transport,
            store,
            state: Mutex::new(AuthState::default()),
            events: None,
        }
    }

    #[must_use]
    pub fn with_event_sink(mut self, sink: AuthEventSink) -> Self {
        self.events = Some(sink);
        self
    }

    pub fn transport(&self) -> &Arc<dyn PlatformTransport> {
        &self.transport
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    #[must_use]
    pub fn snapshot(&self) -> AuthState {
        lock_unpoisoned(&self.state).clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        lock_unpoisoned(&self.state).access_credential.is_some()
    }

    /// Load the stored session at startup.
    pub fn restore(&self) -> RestoreOutcome {
        self.restore_at(now_epoch_ms())
    }

    pub fn restore_at(&self, now_ms: u64) -> RestoreOutcome {
        let loaded = match self.store.load() {
            Ok(loaded) => loaded,
            Err(error) => {
                warn!(%error, "failed to restore auth session");
                return RestoreOutcome::Failed(format!("Failed to restore token: {error}"));
            }
        };

        let Some(session) = loaded.value else {
            return RestoreOutcome::Missing {
                warning: loaded.warning,
            };
        };

        if is_expired_at(&session.access_credential, now_ms) {
            self.clear_session(ClearReason::ExpiredAtStartup);
            return RestoreOutcome::Expired;
        }

        *lock_unpoisoned(&self.state) = AuthState {
            access_credential: Some(session.access_credential),
            refresh_credential: session.refresh_credential,
            username: None,
        };
        info!("restored auth session from local store");
        RestoreOutcome::Restored
    }

    pub fn ensure_authenticated(&self) -> Result<String, AuthError> {
        lock_unpoisoned(&self.state)
            .access_credential
            .clone()
            .ok_or(AuthError::NotAuthenticated)
    }

    /// Exchange the refresh credential for a new access credential.
    ///
    /// `Ok(None)` means no usable credential came back; the session has been
    /// cleared unless no refresh credential was held and `clear_if_missing`
    /// is false. Transport failures leave the session untouched. A session
    /// replaced or cleared while the request is in flight is left as it is
    /// and its current access credential returned.
    pub async fn refresh(
        &self,
        reason: &str,
        clear_if_missing: bool,
    ) -> Result<Option<String>, AuthError> {
        let refresh_credential = lock_unpoisoned(&self.state).refresh_credential.clone();
        let Some(refresh_credential) = refresh_credential else {
            if clear_if_missing {
                self.clear_session(ClearReason::MissingRefreshCredential);
            } else {
                self.emit(AuthEvent::RefreshUnavailable);
            }
            return Ok(None);
        };

        info!(reason, "refreshing access credential");
        self.emit(AuthEvent::RefreshStarted {
            reason: reason.to_string(),
        });
        let response = self
            .transport
            .execute(endpoints::refresh_token(&refresh_credential)?)
            .await?;
        self.emit(AuthEvent::Response(response.clone()));

        if !self.holds_refresh_credential(&refresh_credential) {
            debug!("session changed while refreshing; discarding refresh result");
            return Ok(lock_unpoisoned(&self.state).access_credential.clone());
        }

        if !response.ok {
            self.clear_session(ClearReason::RefreshRejected);
            return Ok(None);
        }

        let Some(access) = non_blank(response.body_str("access_token")) else {
            self.clear_session(ClearReason::RefreshMissingAccessCredential);
            return Ok(None);
        };
        let rotated = non_blank(response.body_str("refresh_token")).unwrap_or(refresh_credential);

        self.save_session(&access, Some(rotated), None);
        self.emit(AuthEvent::Refreshed);
        Ok(Some(access))
    }

    /// Run `attempt` with the current credential, refreshing and retrying
    /// exactly once when it answers 401.
    pub async fn run_with_retry<F, Fut>(&self, mut attempt: F) -> Result<NormalizedResponse, AuthError>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<NormalizedResponse, PlatformApiError>>,
    {
        let credential = self.ensure_authenticated()?;
        let response = attempt(credential).await?;
        self.emit(AuthEvent::Response(response.clone()));
        if !response.is_unauthorized() {
            return Ok(response);
        }

        let Some(refreshed) = self.refresh(DEFAULT_REFRESH_REASON, true).await? else {
            return Ok(response);
        };

        debug!(path = %response.path, "retrying request with refreshed credential");
        self.emit(AuthEvent::Retrying);
        let retried = attempt(refreshed).await?;
        self.emit(AuthEvent::Response(retried.clone()));
        if retried.is_unauthorized() {
            self.clear_session(ClearReason::UnauthorizedAfterRetry);
        }
        Ok(retried)
    }

    /// Execute `request` under [`Self::run_with_retry`].
    pub async fn execute_authorized(
        &self,
        request: ApiRequest,
    ) -> Result<NormalizedResponse, AuthError> {
        let transport = Arc::clone(&self.transport);
        self.run_with_retry(move |credential| {
            let transport = Arc::clone(&transport);
            let request = request.clone().with_credential(credential);
            async move { transport.execute(request).await }
        })
        .await
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        let request = endpoints::login(&LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        })?;
        let response = self.transport.execute(request).await?;
        self.emit(AuthEvent::Response(response.clone()));

        if !response.ok {
            return Ok(LoginOutcome::Rejected(response));
        }
        let Some(access) = non_blank(response.body_str("access_token")) else {
            return Ok(LoginOutcome::MissingAccessCredential(response));
        };
        let refresh = non_blank(response.body_str("refresh_token"));

        self.save_session(&access, refresh, Some(username.to_string()));
        info!(username, "login succeeded");
        self.emit(AuthEvent::LoggedIn {
            username: username.to_string(),
        });
        Ok(LoginOutcome::Succeeded {
            username: username.to_string(),
        })
    }

    pub fn logout(&self) {
        self.clear_session(ClearReason::Logout);
    }

    /// Replace the session in memory and on disk. A blank refresh credential
    /// is dropped; `username: None` keeps the previous one.
    pub fn save_session(&self, access: &str, refresh: Option<String>, username: Option<String>) {
        let refresh = refresh.filter(|value| !value.trim().is_empty());
        {
            let mut state = lock_unpoisoned(&self.state);
            state.access_credential = Some(access.to_string());
            state.refresh_credential = refresh.clone();
            if username.is_some() {
                state.username = username;
            }
        }

        if let Err(error) = self.store.save(&AuthSession::new(access, refresh)) {
            warn!(%error, "failed to persist auth session");
        }
    }

    pub fn clear_session(&self, reason: ClearReason) {
        *lock_unpoisoned(&self.state) = AuthState::default();
        if let Err(error) = self.store.clear() {
            warn!(%error, "failed to clear stored auth session");
        }
        info!(?reason, "auth session cleared");
        self.emit(AuthEvent::SessionCleared(reason));
    }

    fn holds_refresh_credential(&self, expected: &str) -> bool {
        lock_unpoisoned(&self.state).refresh_credential.as_deref() == Some(expected)
    }

    fn emit(&self, event: AuthEvent) {
        if let Some(sink) = &self.events {
            sink(&event);
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .filter(|value| !value.trim().is_empty())
        .map(str::to_string)
}

fn now_epoch_ms() -> u64 {
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    u64::try_from(millis).unwrap_or_default()
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
