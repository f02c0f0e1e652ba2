//! Credential lifecycle for the platform API: interactive login, session
//! restore, refresh, and the retry-once-on-401 policy every authenticated
//! request goes through.

mod error;
pub mod jwt;
pub mod login;
mod orchestrator;

pub use error::AuthError;
pub use jwt::read_jwt_expiry_ms;
pub use login::{LoginFlow, LoginInput, LoginStep};
pub use orchestrator::{
    AuthEvent, AuthEventSink, AuthOrchestrator, AuthState, ClearReason, LoginOutcome,
    RestoreOutcome, DEFAULT_REFRESH_REASON,
};
