//! Local persistence for the CLI: the signed-in session and the theme
//! preference, stored as small JSON files under the CLI home directory.
//!
//! Reads never fail on bad file contents. A file that does not parse, or that
//! matches no known schema, is moved aside and the read reports nothing plus
//! a warning. Only genuine filesystem failures are errors.

mod error;
mod paths;
mod schema;
mod store;

pub use error::CredentialStoreError;
pub use paths::{
    default_store_root, quarantine_path, AUTH_FILE_NAME, DEFAULT_STORE_DIR, STORE_HOME_ENV,
    THEME_FILE_NAME,
};
pub use schema::{
    AuthSession, AuthSessionFileV2, AuthTokenFileV1, StoredAuthFile, ThemeFile, ThemeName,
};
pub use store::{CredentialStore, Loaded};
