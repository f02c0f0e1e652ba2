use std::sync::Arc;

use anyhow::{bail, Context as _, Result};
use credential_store::{CredentialStore, ThemeName};
use platform_api::{NormalizedResponse, PlatformApiClient, PlatformTransport};
use platform_auth::{AuthOrchestrator, LoginFlow, RestoreOutcome};
use task_follow::{FollowConfig, FollowController, ReconnectingFollower};
use tracing::debug;

use crate::config::AppConfig;
use crate::output::Output;

/// State shared by every command of one CLI process.
#[derive(Debug)]
pub struct CommandContext {
    pub auth: Arc<AuthOrchestrator>,
    pub follower: ReconnectingFollower,
    pub follows: Arc<FollowController>,
    pub output: Output,
    pub active_session: Option<u64>,
    pub theme: ThemeName,
    pub login: LoginFlow,
    /// Set while the interactive shell drives the context.
    pub interactive: bool,
}

impl CommandContext {
    pub fn new(transport: Arc<dyn PlatformTransport>, store: CredentialStore, output: Output) -> Self {
        Self::with_follow_config(transport, store, output, FollowConfig::default())
    }

    pub fn with_follow_config(
        transport: Arc<dyn PlatformTransport>,
        store: CredentialStore,
        output: Output,
        follow_config: FollowConfig,
    ) -> Self {
        let auth = Arc::new(AuthOrchestrator::new(transport, store).with_event_sink(output.auth_sink()));
        let follower = ReconnectingFollower::with_config(Arc::clone(&auth), follow_config);
        Self {
            auth,
            follower,
            follows: Arc::new(FollowController::new()),
            output,
            active_session: None,
            theme: ThemeName::default(),
            login: LoginFlow::new(),
            interactive: false,
        }
    }

    /// Build the context for a real process: HTTP transport, on-disk store,
    /// restored session and theme.
    pub fn bootstrap(config: &AppConfig, output: Output) -> Result<Self> {
        let client = PlatformApiClient::new(config.api_config())
            .context("failed to build the HTTP client")?;
        let store = config
            .open_store()
            .context("failed to locate the CLI home directory")?;
        debug!(root = %store.root().display(), base_url = client.base_url(), "bootstrapping");

        let mut context = Self::new(Arc::new(client), store, output);
        context.restore_session();
        context.load_theme();
        Ok(context)
    }

    pub fn store(&self) -> &CredentialStore {
        self.auth.store()
    }

    pub fn restore_session(&self) {
        match self.auth.restore() {
            RestoreOutcome::Restored => {
                self.output.success("Restored auth session from local store.");
            }
            // The clear is reported through the auth sink.
            RestoreOutcome::Expired => {}
            RestoreOutcome::Missing { warning } => {
                if let Some(warning) = warning {
                    self.output.error(warning);
                }
            }
            RestoreOutcome::Failed(message) => self.output.error(message),
        }
    }

    pub fn load_theme(&mut self) {
        match self.store().load_preference() {
            Ok(loaded) => {
                if let Some(warning) = loaded.warning {
                    self.output.error(warning);
                }
                self.theme = loaded.value.unwrap_or_default();
            }
            Err(error) => self.output.error(format!("Failed to load theme: {error}")),
        }
    }

    pub fn require_active_session(&self, command: &str) -> Result<u64> {
        match self.active_session {
            Some(session_id) => Ok(session_id),
            None => bail!(
                "run {command} requires an active session. Use `session use <id>` or `session create` first."
            ),
        }
    }

    /// Send `request` with the refresh-and-retry-once policy. The response is
    /// rendered by the auth sink.
    pub async fn execute(&self, request: platform_api::ApiRequest) -> Result<NormalizedResponse> {
        Ok(self.auth.execute_authorized(request).await?)
    }
}
