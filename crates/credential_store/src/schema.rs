use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Number;

/// Current on-disk session shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSessionFileV2 {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Epoch milliseconds. Any JSON number is accepted on read.
    pub saved_at: Number,
}

/// Legacy single-token shape. Read, never written.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokenFileV1 {
    pub token: String,
    pub saved_at: Number,
}

/// Every session shape the store can read, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum StoredAuthFile {
    V2(AuthSessionFileV2),
    V1(AuthTokenFileV1),
}

impl StoredAuthFile {
    /// Normalize to a session. Blank access credentials yield `None`; a blank
    /// refresh credential is dropped.
    #[must_use]
    pub fn into_session(self) -> Option<AuthSession> {
        let (access, refresh, saved_at) = match self {
            Self::V2(file) => (file.access_token, file.refresh_token, file.saved_at),
            Self::V1(file) => (file.token, None, file.saved_at),
        };

        if access.trim().is_empty() {
            return None;
        }

        Some(AuthSession {
            access_credential: access,
            refresh_credential: refresh.filter(|value| !value.trim().is_empty()),
            saved_at_ms: epoch_millis(&saved_at),
        })
    }
}

/// Whole milliseconds from a stored timestamp. Negative or non-finite values
/// read as unknown.
fn epoch_millis(value: &Number) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|millis| millis.is_finite() && *millis >= 0.0)
            .map(|millis| millis.trunc() as u64)
    })
}

/// A signed-in session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub access_credential: String,
    pub refresh_credential: Option<String>,
    /// Set when the session was read from disk.
    pub saved_at_ms: Option<u64>,
}

impl AuthSession {
    #[must_use]
    pub fn new(access_credential: impl Into<String>, refresh_credential: Option<String>) -> Self {
        Self {
            access_credential: access_credential.into(),
            refresh_credential,
            saved_at_ms: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThemeName {
    #[default]
    Dark,
    LightHc,
}

impl ThemeName {
    pub const ALL: [ThemeName; 2] = [ThemeName::Dark, ThemeName::LightHc];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dark => "dark",
            Self::LightHc => "light-hc",
        }
    }
}

impl fmt::Display for ThemeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThemeName {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Self::ALL
            .into_iter()
            .find(|name| name.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| {
                let names: Vec<_> = Self::ALL.iter().map(|name| name.as_str()).collect();
                format!("unknown theme '{trimmed}'; expected one of: {}", names.join(", "))
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeFile {
    pub theme: ThemeName,
    pub saved_at: u64,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn parse(value: serde_json::Value) -> Option<StoredAuthFile> {
        serde_json::from_value(value).ok()
    }

    #[test]
    fn current_shape_wins_over_legacy() {
        let parsed = parse(json!({"accessToken": "a", "refreshToken": "r", "savedAt": 1}))
            .expect("current shape");
        assert!(matches!(parsed, StoredAuthFile::V2(_)));
    }

    #[test]
    fn legacy_shape_normalizes_without_refresh() {
        let session = parse(json!({"token": "legacy", "savedAt": 5}))
            .and_then(StoredAuthFile::into_session)
            .expect("legacy session");
        assert_eq!(session.access_credential, "legacy");
        assert_eq!(session.refresh_credential, None);
        assert_eq!(session.saved_at_ms, Some(5));
    }

    #[test]
    fn fractional_and_negative_timestamps_are_accepted() {
        let fractional = parse(json!({"accessToken": "a", "savedAt": 1_700_000_000_000.5}))
            .and_then(StoredAuthFile::into_session)
            .expect("fractional timestamp");
        assert_eq!(fractional.saved_at_ms, Some(1_700_000_000_000));

        let negative = parse(json!({"token": "legacy", "savedAt": -3}))
            .and_then(StoredAuthFile::into_session)
            .expect("negative timestamp");
        assert_eq!(negative.access_credential, "legacy");
        assert_eq!(negative.saved_at_ms, None);
    }

    #[test]
    fn schema_mismatches_are_rejected() {
        assert!(parse(json!({"accessToken": "a"})).is_none());
        assert!(parse(json!({"accessToken": "a", "savedAt": "1"})).is_none());
        assert!(parse(json!({"accessToken": 7, "savedAt": 1})).is_none());
        assert!(parse(json!({"accessToken": "a", "refreshToken": 3, "savedAt": 1})).is_none());
        assert!(parse(json!(["token"])).is_none());
    }

    #[test]
    fn blank_refresh_credential_reads_as_absent() {
        let session = parse(json!({"accessToken": "a", "refreshToken": "  ", "savedAt": 1}))
            .and_then(StoredAuthFile::into_session)
            .expect("session");
        assert_eq!(session.refresh_credential, None);
    }

    #[test]
    fn theme_names_parse_case_insensitively() {
        assert_eq!("LIGHT-HC".parse::<ThemeName>(), Ok(ThemeName::LightHc));
        assert!("solarized"
            .parse::<ThemeName>()
            .unwrap_err()
            .contains("dark, light-hc"));
    }
}
