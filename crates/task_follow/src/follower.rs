use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use platform_api::events::{read_session_id, read_task_status, TERMINAL_TASK_EVENTS};
use platform_api::retry::{BASE_DELAY_MS, MAX_DELAY_MS};
use platform_api::{
    await_or_cancel, endpoints, is_retriable_http_status, is_terminal_task_status, Backoff,
    NormalizedResponse, ParsedStreamEvent, PlatformApiError, SseStreamParser,
};
use platform_auth::{AuthError, AuthOrchestrator, ClearReason};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::FollowError;
use crate::outcome::FollowOutcome;

pub const STREAM_REFRESH_REASON: &str = "SSE unauthorized. Trying auth refresh...";

#[derive(Debug, Clone)]
pub struct FollowConfig {
    /// Event names that end the follow, compared case-insensitively.
    pub terminal_events: Vec<String>,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for FollowConfig {
    fn default() -> Self {
        Self {
            terminal_events: TERMINAL_TASK_EVENTS.iter().map(ToString::to_string).collect(),
            initial_delay: Duration::from_millis(BASE_DELAY_MS),
            max_delay: Duration::from_millis(MAX_DELAY_MS),
        }
    }
}

impl FollowConfig {
    fn is_terminal(&self, event: &str) -> bool {
        let event = event.trim();
        self.terminal_events
            .iter()
            .any(|terminal| terminal.eq_ignore_ascii_case(event))
    }
}

/// One observation of one task.
#[derive(Debug, Clone)]
pub struct FollowSession {
    pub task_id: u64,
    /// Session the task must belong to, when known.
    pub expected_session_id: Option<u64>,
    pub cancel: CancellationToken,
    pub(crate) generation: u64,
}

impl FollowSession {
    #[must_use]
    pub fn new(task_id: u64, expected_session_id: Option<u64>) -> Self {
        Self {
            task_id,
            expected_session_id,
            cancel: CancellationToken::new(),
            generation: 0,
        }
    }
}

/// Progress surfaced while following.
#[derive(Debug, Clone, PartialEq)]
pub enum FollowUpdate {
    Opened(NormalizedResponse),
    Event(ParsedStreamEvent),
    /// The stream open was answered with a non-2xx status.
    Rejected(NormalizedResponse),
    Refreshing,
    Disconnected { reason: String },
    Reconnecting { delay: Duration },
}

enum StreamEnd {
    Terminal(String),
    Rejected(NormalizedResponse),
    Disconnected(String),
    Finished(FollowOutcome),
}

enum ProbeResult {
    Continue,
    Finished(FollowOutcome),
}

/// Drives one follow session to completion.
#[derive(Debug, Clone)]
pub struct ReconnectingFollower {
    auth: Arc<AuthOrchestrator>,
    config: FollowConfig,
}

impl ReconnectingFollower {
    pub fn new(auth: Arc<AuthOrchestrator>) -> Self {
        Self::with_config(auth, FollowConfig::default())
    }

    pub fn with_config(auth: Arc<AuthOrchestrator>, config: FollowConfig) -> Self {
        Self { auth, config }
    }

    pub fn config(&self) -> &FollowConfig {
        &self.config
    }

    /// Follow `session.task_id` until a terminal outcome.
    ///
    /// Fails only when no credential is held at the start.
    pub async fn follow(
        &self,
        session: &FollowSession,
        mut on_update: impl FnMut(FollowUpdate),
    ) -> Result<FollowOutcome, FollowError> {
        self.auth.ensure_authenticated()?;
        let mut backoff = Backoff::new(self.config.initial_delay, self.config.max_delay);
        // Set when the last reconnect followed a successful refresh.
        let mut refreshed_after_rejection = false;

        loop {
            if session.cancel.is_cancelled() {
                return Ok(FollowOutcome::Cancelled);
            }
            let Ok(credential) = self.auth.ensure_authenticated() else {
                return Ok(FollowOutcome::NeedsReauthentication);
            };

            let end = self.stream_once(session, &credential, &mut on_update).await;
            let retry_after_refresh = std::mem::take(&mut refreshed_after_rejection);
            match end {
                StreamEnd::Finished(outcome) => return Ok(outcome),
                StreamEnd::Terminal(event) => {
                    info!(task_id = session.task_id, %event, "follow reached terminal event");
                    return Ok(FollowOutcome::TerminalEvent { event });
                }
                StreamEnd::Rejected(response) => {
                    let status = response.status;
                    on_update(FollowUpdate::Rejected(response));
                    if status == 401 && retry_after_refresh {
                        warn!(
                            task_id = session.task_id,
                            "event stream rejected a refreshed credential"
                        );
                        self.auth.clear_session(ClearReason::UnauthorizedAfterRetry);
                        return Ok(FollowOutcome::NeedsReauthentication);
                    } else if status == 401 {
                        on_update(FollowUpdate::Refreshing);
                        let refreshed = await_or_cancel(
                            self.auth.refresh(STREAM_REFRESH_REASON, true),
                            &session.cancel,
                        )
                        .await;
                        match refreshed {
                            Err(_) => return Ok(FollowOutcome::Cancelled),
                            Ok(Ok(Some(_))) => {
                                backoff.reset();
                                refreshed_after_rejection = true;
                                continue;
                            }
                            Ok(Ok(None)) => return Ok(FollowOutcome::NeedsReauthentication),
                            Ok(Err(error)) => on_update(FollowUpdate::Disconnected {
                                reason: error.to_string(),
                            }),
                        }
                    } else if !is_retriable_http_status(status) {
                        return Ok(FollowOutcome::NonRetriableStatus { status });
                    }
                }
                StreamEnd::Disconnected(reason) => {
                    debug!(task_id = session.task_id, %reason, "event stream disconnected");
                    on_update(FollowUpdate::Disconnected { reason });
                }
            }

            if let ProbeResult::Finished(outcome) = self.probe(session, &mut on_update).await {
                return Ok(outcome);
            }

            let delay = backoff.next_delay();
            info!(task_id = session.task_id, delay_ms = delay.as_millis() as u64, "reconnecting");
            on_update(FollowUpdate::Reconnecting { delay });
            tokio::select! {
                biased;
                _ = session.cancel.cancelled() => return Ok(FollowOutcome::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn stream_once(
        &self,
        session: &FollowSession,
        credential: &str,
        on_update: &mut impl FnMut(FollowUpdate),
    ) -> StreamEnd {
        let cancel = &session.cancel;
        let opened = await_or_cancel(
            self.auth
                .transport()
                .open_task_events(credential, session.task_id, cancel),
            cancel,
        )
        .await;

        let mut connection = match opened {
            Err(_) | Ok(Err(PlatformApiError::Cancelled)) => {
                return StreamEnd::Finished(FollowOutcome::Cancelled)
            }
            Ok(Err(PlatformApiError::StreamStatus(response))) => {
                return StreamEnd::Rejected(*response)
            }
            Ok(Err(error)) => return StreamEnd::Disconnected(error.to_string()),
            Ok(Ok(connection)) => connection,
        };
        on_update(FollowUpdate::Opened(connection.response.clone()));

        let mut parser = SseStreamParser::default();
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return StreamEnd::Finished(FollowOutcome::Cancelled),
                next = connection.chunks.next() => next,
            };

            let events = match next {
                Some(Ok(bytes)) => parser.feed(&bytes),
                Some(Err(error)) => return StreamEnd::Disconnected(error.to_string()),
                None => {
                    for event in parser.finish() {
                        if let Some(end) = self.handle_event(session, event, on_update) {
                            return end;
                        }
                    }
                    return StreamEnd::Disconnected(
                        "stream closed without a terminal event".to_string(),
                    );
                }
            };

            for event in events {
                if let Some(end) = self.handle_event(session, event, on_update) {
                    return end;
                }
            }
        }
    }

    fn handle_event(
        &self,
        session: &FollowSession,
        event: ParsedStreamEvent,
        on_update: &mut impl FnMut(FollowUpdate),
    ) -> Option<StreamEnd> {
        if let Some(mismatch) = verify_task_ownership(session.expected_session_id, &event.data) {
            return Some(StreamEnd::Finished(mismatch));
        }

        let terminal = self.config.is_terminal(&event.event);
        let name = event.event.clone();
        on_update(FollowUpdate::Event(event));
        terminal.then_some(StreamEnd::Terminal(name))
    }

    async fn probe(
        &self,
        session: &FollowSession,
        on_update: &mut impl FnMut(FollowUpdate),
    ) -> ProbeResult {
        let probed = await_or_cancel(
            self.auth
                .execute_authorized(endpoints::get_task(session.task_id)),
            &session.cancel,
        )
        .await;

        let response = match probed {
            Err(_) => return ProbeResult::Finished(FollowOutcome::Cancelled),
            Ok(Err(AuthError::NotAuthenticated)) => {
                return ProbeResult::Finished(FollowOutcome::NeedsReauthentication)
            }
            Ok(Err(error)) if error.is_cancelled() => {
                return ProbeResult::Finished(FollowOutcome::Cancelled)
            }
            Ok(Err(error)) => {
                on_update(FollowUpdate::Disconnected {
                    reason: format!("task probe failed: {error}"),
                });
                return ProbeResult::Continue;
            }
            Ok(Ok(response)) => response,
        };

        if response.is_unauthorized() {
            return ProbeResult::Finished(FollowOutcome::NeedsReauthentication);
        }

        if response.ok {
            if let Some(mismatch) =
                verify_task_ownership(session.expected_session_id, &response.body)
            {
                return ProbeResult::Finished(mismatch);
            }
            let status = read_task_status(&response.body);
            if is_terminal_task_status(status) {
                return ProbeResult::Finished(FollowOutcome::TerminalStatus {
                    status: status.unwrap_or_default().to_string(),
                });
            }
            return ProbeResult::Continue;
        }

        if !is_retriable_http_status(response.status) {
            return ProbeResult::Finished(FollowOutcome::NonRetriableStatus {
                status: response.status,
            });
        }
        ProbeResult::Continue
    }
}

/// `Some(OwnershipMismatch)` when `body` names a session other than
/// `expected`. Bodies without a session id pass.
#[must_use]
pub fn verify_task_ownership(expected: Option<u64>, body: &Value) -> Option<FollowOutcome> {
    let expected = expected?;
    let actual = read_session_id(body)?;
    (actual != expected).then_some(FollowOutcome::OwnershipMismatch { expected, actual })
}
