use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::error::CredentialStoreError;
use crate::paths::{default_store_root, quarantine_path, AUTH_FILE_NAME, THEME_FILE_NAME};
use crate::schema::{AuthSession, AuthSessionFileV2, StoredAuthFile, ThemeFile, ThemeName};

const DIR_MODE: u32 = 0o700;
const FILE_MODE: u32 = 0o600;

/// Result of a read that may have recovered from a bad file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loaded<T> {
    pub value: Option<T>,
    /// Set when a file was quarantined during the read.
    pub warning: Option<String>,
}

impl<T> Loaded<T> {
    fn empty() -> Self {
        Self {
            value: None,
            warning: None,
        }
    }

    fn found(value: T) -> Self {
        Self {
            value: Some(value),
            warning: None,
        }
    }

    fn quarantined(warning: String) -> Self {
        Self {
            value: None,
            warning: Some(warning),
        }
    }
}

enum ReadOutcome<T> {
    Missing,
    Parsed(T),
    Quarantined(String),
}

/// File-backed store rooted at one directory.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    root: PathBuf,
}

impl CredentialStore {
    #[must_use]
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store at `$ABC_CLI_HOME`, or `~/.abc-cli`.
    pub fn open_default() -> Result<Self, CredentialStoreError> {
        default_store_root().map(Self::at)
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn auth_path(&self) -> PathBuf {
        self.root.join(AUTH_FILE_NAME)
    }

    #[must_use]
    pub fn theme_path(&self) -> PathBuf {
        self.root.join(THEME_FILE_NAME)
    }

    pub fn load(&self) -> Result<Loaded<AuthSession>, CredentialStoreError> {
        self.ensure_root()?;
        let path = self.auth_path();

        let stored = match read_json::<StoredAuthFile>(&path, "Auth session")? {
            ReadOutcome::Missing => return Ok(Loaded::empty()),
            ReadOutcome::Quarantined(warning) => return Ok(Loaded::quarantined(warning)),
            ReadOutcome::Parsed(stored) => stored,
        };

        match stored.into_session() {
            Some(session) => Ok(Loaded::found(session)),
            None => {
                debug!(path = %path.display(), "removing auth session with blank credential");
                remove_if_present(&path)?;
                Ok(Loaded::empty())
            }
        }
    }

    /// Persist `session` in the current schema, stamped with the current time.
    pub fn save(&self, session: &AuthSession) -> Result<(), CredentialStoreError> {
        self.ensure_root()?;
        let file = AuthSessionFileV2 {
            access_token: session.access_credential.clone(),
            refresh_token: session
                .refresh_credential
                .clone()
                .filter(|value| !value.trim().is_empty()),
            saved_at: now_epoch_ms().into(),
        };
        write_json(&self.auth_path(), &file)
    }

    pub fn clear(&self) -> Result<(), CredentialStoreError> {
        self.ensure_root()?;
        remove_if_present(&self.auth_path())
    }

    pub fn load_preference(&self) -> Result<Loaded<ThemeName>, CredentialStoreError> {
        self.ensure_root()?;
        Ok(match read_json::<ThemeFile>(&self.theme_path(), "Theme")? {
            ReadOutcome::Missing => Loaded::empty(),
            ReadOutcome::Quarantined(warning) => Loaded::quarantined(warning),
            ReadOutcome::Parsed(file) => Loaded::found(file.theme),
        })
    }

    pub fn save_preference(&self, theme: ThemeName) -> Result<(), CredentialStoreError> {
        self.ensure_root()?;
        let file = ThemeFile {
            theme,
            saved_at: now_epoch_ms(),
        };
        write_json(&self.theme_path(), &file)
    }

    fn ensure_root(&self) -> Result<(), CredentialStoreError> {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(DIR_MODE);
        }
        builder.create(&self.root).map_err(|source| {
            CredentialStoreError::io("creating store directory", &self.root, source)
        })?;
        set_owner_only(&self.root, DIR_MODE)
    }
}

fn read_json<T: DeserializeOwned>(
    path: &Path,
    label: &str,
) -> Result<ReadOutcome<T>, CredentialStoreError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(source) if source.kind() == ErrorKind::NotFound => return Ok(ReadOutcome::Missing),
        Err(source) => return Err(CredentialStoreError::io("reading store file", path, source)),
    };
    set_owner_only(path, FILE_MODE)?;

    let value = match serde_json::from_str::<serde_json::Value>(&raw) {
        Ok(value) => value,
        Err(_) => {
            let backup = quarantine(path)?;
            return Ok(ReadOutcome::Quarantined(format!(
                "{label} file is corrupted and has been backed up to {}.",
                backup.display()
            )));
        }
    };

    match serde_json::from_value::<T>(value) {
        Ok(parsed) => Ok(ReadOutcome::Parsed(parsed)),
        Err(_) => {
            let backup = quarantine(path)?;
            Ok(ReadOutcome::Quarantined(format!(
                "{label} file has invalid schema and has been backed up to {}.",
                backup.display()
            )))
        }
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), CredentialStoreError> {
    let mut text = serde_json::to_string_pretty(value)
        .map_err(|source| CredentialStoreError::json_serialize(path, source))?;
    text.push('\n');
    fs::write(path, text)
        .map_err(|source| CredentialStoreError::io("writing store file", path, source))?;
    set_owner_only(path, FILE_MODE)
}

fn quarantine(path: &Path) -> Result<PathBuf, CredentialStoreError> {
    let backup = quarantine_path(path, now_epoch_ms());
    fs::rename(path, &backup)
        .map_err(|source| CredentialStoreError::io("quarantining store file", path, source))?;
    warn!(
        path = %path.display(),
        backup = %backup.display(),
        "quarantined unreadable store file"
    );
    Ok(backup)
}

fn remove_if_present(path: &Path) -> Result<(), CredentialStoreError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(source) if source.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(CredentialStoreError::io("removing store file", path, source)),
    }
}

#[cfg(unix)]
fn set_owner_only(path: &Path, mode: u32) -> Result<(), CredentialStoreError> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .map_err(|source| CredentialStoreError::io("restricting permissions", path, source))
}

#[cfg(not(unix))]
fn set_owner_only(_path: &Path, _mode: u32) -> Result<(), CredentialStoreError> {
    Ok(())
}

fn now_epoch_ms() -> u64 {
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    u64::try_from(millis).unwrap_or_default()
}
