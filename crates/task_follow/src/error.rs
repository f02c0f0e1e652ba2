use platform_auth::AuthError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FollowError {
    #[error(transparent)]
    Auth(#[from] AuthError),
}
