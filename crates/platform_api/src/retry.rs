use std::time::Duration;

/// 4xx statuses that still warrant another attempt.
pub const RETRIABLE_HTTP_STATUSES: [u16; 3] = [408, 425, 429];
/// Delay before the first reconnect of a follow session.
pub const BASE_DELAY_MS: u64 = 1000;
/// Upper bound for reconnect delays.
pub const MAX_DELAY_MS: u64 = 8000;

/// Status retry policy: any 5xx, plus timeout/too-early/rate-limit.
pub fn is_retriable_http_status(status: u16) -> bool {
    status >= 500 || RETRIABLE_HTTP_STATUSES.contains(&status)
}

/// Exponential reconnect delay owned by one follow session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    initial: Duration,
    current: Duration,
    cap: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(BASE_DELAY_MS),
            Duration::from_millis(MAX_DELAY_MS),
        )
    }
}

impl Backoff {
    pub fn new(initial: Duration, cap: Duration) -> Self {
        let initial = initial.min(cap);
        Self {
            initial,
            current: initial,
            cap,
        }
    }

    /// Delay to wait before the next attempt.
    pub fn current(&self) -> Duration {
        self.current
    }

    pub fn cap(&self) -> Duration {
        self.cap
    }

    /// Return the current delay and double it for the next call, up to the cap.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.cap);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}
