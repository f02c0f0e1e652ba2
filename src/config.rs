//! Runtime configuration resolved from flags and environment.

use std::path::PathBuf;
use std::time::Duration;

use credential_store::{CredentialStore, CredentialStoreError};
use platform_api::PlatformApiConfig;

use crate::cli::Cli;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppConfig {
    /// `None` falls back to `ABC_API_BASE_URL`, then the built-in default.
    pub base_url: Option<String>,
    /// `None` disables the whole-request timeout.
    pub timeout: Option<Duration>,
    /// `None` falls back to `ABC_CLI_HOME`, then `~/.abc-cli`.
    pub store_root: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_cli(cli: &Cli) -> Self {
        let timeout = match cli.timeout_secs {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => Some(DEFAULT_REQUEST_TIMEOUT),
        };
        Self {
            base_url: non_blank(cli.base_url.as_deref()),
            timeout,
            store_root: cli
                .home
                .clone()
                .filter(|path| !path.as_os_str().is_empty()),
        }
    }

    pub fn api_config(&self) -> PlatformApiConfig {
        let mut config =
            PlatformApiConfig::new(self.base_url.as_deref()).with_connect_timeout(CONNECT_TIMEOUT);
        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }
        config
    }

    pub fn open_store(&self) -> Result<CredentialStore, CredentialStoreError> {
        match &self.store_root {
            Some(root) => Ok(CredentialStore::at(root.clone())),
            None => CredentialStore::open_default(),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
