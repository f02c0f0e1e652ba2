use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::CredentialStoreError;

pub const STORE_HOME_ENV: &str = "ABC_CLI_HOME";
pub const DEFAULT_STORE_DIR: &str = ".abc-cli";
pub const AUTH_FILE_NAME: &str = "auth-token.json";
pub const THEME_FILE_NAME: &str = "theme.json";

/// `$ABC_CLI_HOME` when set and non-blank, else `~/.abc-cli`.
pub fn default_store_root() -> Result<PathBuf, CredentialStoreError> {
    if let Some(root) = std::env::var_os(STORE_HOME_ENV).filter(|value| !is_blank(value)) {
        return Ok(PathBuf::from(root));
    }

    dirs::home_dir()
        .map(|home| home.join(DEFAULT_STORE_DIR))
        .ok_or(CredentialStoreError::NoHomeDirectory {
            env: STORE_HOME_ENV,
        })
}

/// Sibling name a corrupt file is moved to: `<file>.corrupt-<epoch_ms>.json`.
#[must_use]
pub fn quarantine_path(path: &Path, epoch_ms: u64) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".corrupt-{epoch_ms}.json"));
    PathBuf::from(name)
}

fn is_blank(value: &OsString) -> bool {
    value.to_string_lossy().trim().is_empty()
}
