//! User-facing command output.
//!
//! Everything a command reports goes through [`Output`]: plain lines to
//! stdout, errors to stderr. Tests swap in a capturing sink and assert on the
//! recorded lines.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use platform_api::NormalizedResponse;
use platform_auth::{AuthEvent, AuthEventSink, ClearReason};
use serde_json::{json, Value};
use task_follow::FollowUpdate;

const REDACTED_KEYS: [&str; 2] = ["access_token", "refresh_token"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    pub level: OutputLevel,
    pub text: String,
}

#[derive(Debug, Default)]
struct OutputInner {
    captured: Option<Mutex<Vec<OutputLine>>>,
    had_error: AtomicBool,
}

/// Cloneable handle to the output sink.
#[derive(Debug, Clone, Default)]
pub struct Output {
    inner: Arc<OutputInner>,
}

impl Output {
    /// Writes to stdout and stderr.
    pub fn stdio() -> Self {
        Self::default()
    }

    /// Records lines in memory instead of printing them.
    pub fn capturing() -> Self {
        Self {
            inner: Arc::new(OutputInner {
                captured: Some(Mutex::new(Vec::new())),
                had_error: AtomicBool::new(false),
            }),
        }
    }

    pub fn info(&self, text: impl Into<String>) {
        self.write(OutputLevel::Info, text.into());
    }

    pub fn success(&self, text: impl Into<String>) {
        self.write(OutputLevel::Success, text.into());
    }

    pub fn error(&self, text: impl Into<String>) {
        self.write(OutputLevel::Error, text.into());
    }

    pub fn json(&self, level: OutputLevel, value: &Value) {
        let pretty = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
        self.write(level, pretty);
    }

    /// Request line, status line and body of one exchange. Credentials in the
    /// body are masked.
    pub fn response(&self, response: &NormalizedResponse) {
        let level = if response.ok {
            OutputLevel::Success
        } else {
            OutputLevel::Error
        };
        self.info(format!("> {} {}", response.method, response.path));
        self.write(level, format!("< STATUS {}", response.status));
        let body_level = if response.ok {
            OutputLevel::Info
        } else {
            OutputLevel::Error
        };
        self.json(body_level, &redact(&response.body));
    }

    /// Prompt text without a trailing newline. Not recorded when capturing.
    pub fn prompt(&self, text: &str) {
        if self.inner.captured.is_some() {
            return;
        }
        let mut stdout = std::io::stdout().lock();
        let _ = write!(stdout, "{text}");
        let _ = stdout.flush();
    }

    /// Whether any error line was written since the last reset.
    pub fn had_error(&self) -> bool {
        self.inner.had_error.load(Ordering::Acquire)
    }

    pub fn reset_error(&self) {
        self.inner.had_error.store(false, Ordering::Release);
    }

    /// Captured lines. Empty for a stdio sink.
    pub fn lines(&self) -> Vec<OutputLine> {
        self.inner
            .captured
            .as_ref()
            .map(|lines| lock_unpoisoned(lines).clone())
            .unwrap_or_default()
    }

    pub fn texts(&self) -> Vec<String> {
        self.lines().into_iter().map(|line| line.text).collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|line| line.text.contains(needle))
    }

    /// Sink rendering auth lifecycle events.
    pub fn auth_sink(&self) -> AuthEventSink {
        let output = self.clone();
        Arc::new(move |event: &AuthEvent| output.auth_event(event))
    }

    pub fn auth_event(&self, event: &AuthEvent) {
        match event {
            AuthEvent::Response(response) => self.response(response),
            AuthEvent::RefreshStarted { reason } => self.info(reason.clone()),
            AuthEvent::RefreshUnavailable => {
                self.error(ClearReason::MissingRefreshCredential.message());
            }
            AuthEvent::Refreshed => self.success("Token refreshed."),
            AuthEvent::Retrying => self.info("Retrying previous request with refreshed token..."),
            AuthEvent::SessionCleared(ClearReason::Logout) => {
                self.success("Logged out. Local token removed.");
            }
            AuthEvent::SessionCleared(reason) => self.error(reason.message()),
            AuthEvent::LoggedIn { username } => {
                self.success(format!("Login succeeded for '{username}'."));
            }
        }
    }

    pub fn follow_update(&self, update: &FollowUpdate) {
        match update {
            FollowUpdate::Opened(response) => self.success(format!(
                "SSE connected: {} {} -> {}",
                response.method, response.path, response.status
            )),
            FollowUpdate::Event(event) => {
                self.info(json!({ "event": event.event, "data": event.data }).to_string());
            }
            FollowUpdate::Rejected(response) => self.response(response),
            FollowUpdate::Refreshing => {}
            FollowUpdate::Disconnected { reason } => {
                self.error(format!("SSE connection error: {reason}"));
            }
            FollowUpdate::Reconnecting { delay } => self.info(format!(
                "SSE disconnected. Reconnecting in {}s...",
                format_seconds(*delay)
            )),
        }
    }

    fn write(&self, level: OutputLevel, text: String) {
        if level == OutputLevel::Error {
            self.inner.had_error.store(true, Ordering::Release);
        }
        match &self.inner.captured {
            Some(lines) => lock_unpoisoned(lines).push(OutputLine { level, text }),
            None if level == OutputLevel::Error => eprintln!("{text}"),
            None => println!("{text}"),
        }
    }
}

fn format_seconds(delay: Duration) -> String {
    let millis = delay.as_millis();
    if millis % 1000 == 0 {
        (millis / 1000).to_string()
    } else {
        format!("{}", delay.as_secs_f64())
    }
}

fn redact(body: &Value) -> Value {
    match body {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| {
                    let value = if REDACTED_KEYS.contains(&key.as_str()) && value.is_string() {
                        Value::String("***".to_string())
                    } else {
                        redact(value)
                    };
                    (key.clone(), value)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact).collect()),
        other => other.clone(),
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
