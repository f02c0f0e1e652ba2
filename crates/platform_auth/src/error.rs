use platform_api::PlatformApiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Not logged in. Run login first.")]
    NotAuthenticated,

    #[error(transparent)]
    Transport(#[from] PlatformApiError),
}

impl AuthError {
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Transport(PlatformApiError::Cancelled))
    }
}
