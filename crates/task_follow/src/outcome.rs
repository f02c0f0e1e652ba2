/// How a follow session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowOutcome {
    /// The stream delivered a terminal event.
    TerminalEvent { event: String },
    /// A probe after a disconnect found the task finished.
    TerminalStatus { status: String },
    /// Credentials could not be renewed.
    NeedsReauthentication,
    NonRetriableStatus { status: u16 },
    OwnershipMismatch { expected: u64, actual: u64 },
    Cancelled,
}

impl FollowOutcome {
    /// One line for the user.
    #[must_use]
    pub fn explanation(&self) -> String {
        match self {
            Self::TerminalEvent { event } => {
                format!("SSE reached terminal event '{event}'. Follow ended.")
            }
            Self::TerminalStatus { status } => {
                format!("Task already terminal ({status}). Follow ended.")
            }
            Self::NeedsReauthentication => {
                "Authorization expired. Please run login, then follow again.".to_string()
            }
            Self::NonRetriableStatus { status } => {
                format!("SSE follow stopped due to non-retriable status {status}.")
            }
            Self::OwnershipMismatch { expected, actual } => format!(
                "Task belongs to session {actual}, not the active session {expected}. Follow stopped."
            ),
            Self::Cancelled => "Observer mode stopped.".to_string(),
        }
    }

    /// Whether the follow ended without a problem worth reporting as an error.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Self::TerminalEvent { .. } | Self::TerminalStatus { .. } | Self::Cancelled
        )
    }
}
