//! Two-step interactive login prompt.

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoginStep {
    #[default]
    Idle,
    AwaitingUsername,
    AwaitingPassword,
}

/// What one line of input did to the flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginInput {
    /// No login in progress.
    NotActive,
    /// Input refused; the step did not advance.
    Rejected(&'static str),
    /// Username captured; a password is expected next.
    UsernameAccepted,
    /// Both fields captured. The flow is back to idle.
    Submit { username: String, password: String },
    /// The flow lost its username and reset to idle.
    Reset(&'static str),
}

#[derive(Debug, Clone, Default)]
pub struct LoginFlow {
    step: LoginStep,
    username: Option<String>,
}

impl LoginFlow {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self) {
        self.step = LoginStep::AwaitingUsername;
        self.username = None;
    }

    pub fn cancel(&mut self) {
        self.step = LoginStep::Idle;
        self.username = None;
    }

    #[must_use]
    pub fn step(&self) -> LoginStep {
        self.step
    }

    #[must_use]
    pub fn is_awaiting_input(&self) -> bool {
        self.step != LoginStep::Idle
    }

    #[must_use]
    pub fn is_password_input(&self) -> bool {
        self.step == LoginStep::AwaitingPassword
    }

    /// Prompt label for the current step.
    #[must_use]
    pub fn hint(&self) -> Option<&'static str> {
        match self.step {
            LoginStep::Idle => None,
            LoginStep::AwaitingUsername => Some("login> enter username"),
            LoginStep::AwaitingPassword => Some("login> enter password (masked)"),
        }
    }

    pub fn consume(&mut self, raw: &str) -> LoginInput {
        let value = raw.trim();
        match self.step {
            LoginStep::Idle => LoginInput::NotActive,
            LoginStep::AwaitingUsername => {
                if value.is_empty() {
                    return LoginInput::Rejected("Username cannot be empty.");
                }
                if value.starts_with('/') {
                    return LoginInput::Rejected("Username cannot start with '/'.");
                }
                self.username = Some(value.to_string());
                self.step = LoginStep::AwaitingPassword;
                LoginInput::UsernameAccepted
            }
            LoginStep::AwaitingPassword => {
                if value.is_empty() {
                    return LoginInput::Rejected("Password cannot be empty.");
                }
                if value.starts_with('/') {
                    return LoginInput::Rejected("Password cannot start with '/'.");
                }
                let username = self.username.take();
                self.step = LoginStep::Idle;
                match username {
                    Some(username) => LoginInput::Submit {
                        username,
                        password: value.to_string(),
                    },
                    None => LoginInput::Reset("Login state mismatch. Run login again."),
                }
            }
        }
    }

    #[cfg(test)]
    fn force_step(&mut self, step: LoginStep) {
        self.step = step;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_walks_both_steps_and_returns_to_idle() {
        let mut flow = LoginFlow::new();
        assert_eq!(flow.hint(), None);

        flow.start();
        assert_eq!(flow.hint(), Some("login> enter username"));
        assert!(!flow.is_password_input());

        assert_eq!(flow.consume("  alice "), LoginInput::UsernameAccepted);
        assert!(flow.is_password_input());
        assert_eq!(flow.hint(), Some("login> enter password (masked)"));

        assert_eq!(
            flow.consume("s3cret"),
            LoginInput::Submit {
                username: "alice".to_string(),
                password: "s3cret".to_string()
            }
        );
        assert_eq!(flow.step(), LoginStep::Idle);
    }

    #[test]
    fn blank_and_slash_input_do_not_advance() {
        let mut flow = LoginFlow::new();
        flow.start();

        assert!(matches!(flow.consume("   "), LoginInput::Rejected(_)));
        assert!(matches!(flow.consume("/exit"), LoginInput::Rejected(_)));
        assert_eq!(flow.step(), LoginStep::AwaitingUsername);

        flow.consume("bob");
        assert!(matches!(flow.consume(""), LoginInput::Rejected(_)));
        assert!(matches!(flow.consume("/pw"), LoginInput::Rejected(_)));
        assert_eq!(flow.step(), LoginStep::AwaitingPassword);
    }

    #[test]
    fn password_without_username_resets() {
        let mut flow = LoginFlow::new();
        flow.force_step(LoginStep::AwaitingPassword);

        assert!(matches!(flow.consume("pw"), LoginInput::Reset(_)));
        assert_eq!(flow.step(), LoginStep::Idle);
    }

    #[test]
    fn idle_flow_ignores_input() {
        let mut flow = LoginFlow::new();
        assert_eq!(flow.consume("alice"), LoginInput::NotActive);
    }

    #[test]
    fn restart_discards_captured_username() {
        let mut flow = LoginFlow::new();
        flow.start();
        flow.consume("alice");
        flow.start();
        assert_eq!(flow.step(), LoginStep::AwaitingUsername);
        flow.cancel();
        assert!(!flow.is_awaiting_input());
    }
}
