//! Deterministic in-memory implementation of the `platform_api` transport seam.
//!
//! Responses and event-stream openings are scripted up front and consumed in
//! order. Every call is recorded so tests can assert on credentials and
//! request counts. Nothing here touches the network.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use platform_api::{
    ApiRequest, EventStreamConnection, HttpMethod, NormalizedResponse, PlatformApiError,
    PlatformTransport,
};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// How one `open_task_events` call should behave.
#[derive(Debug)]
pub enum StreamScript {
    /// Answer with a non-2xx status.
    Reject(NormalizedResponse),
    /// Open with 200 and deliver these chunks, then end the stream.
    ///
    /// A trailing `Err` simulates a mid-stream transport drop.
    Connect(Vec<Result<Vec<u8>, PlatformApiError>>),
    /// Open with 200 and never deliver anything.
    Pending,
    /// Fail the connect itself.
    Fail(PlatformApiError),
}

impl StreamScript {
    /// Open and deliver complete SSE frames, one chunk per frame.
    pub fn frames(frames: &[(&str, Value)]) -> Self {
        Self::Connect(
            frames
                .iter()
                .map(|(event, data)| Ok(sse_frame(event, data)))
                .collect(),
        )
    }

    /// Open, deliver `frames`, then drop the connection.
    pub fn frames_then_drop(frames: &[(&str, Value)]) -> Self {
        let mut chunks: Vec<_> = frames
            .iter()
            .map(|(event, data)| Ok(sse_frame(event, data)))
            .collect();
        chunks.push(Err(PlatformApiError::Disconnected(
            "connection reset by mock".to_string(),
        )));
        Self::Connect(chunks)
    }
}

/// One call observed by [`MockTransport::execute`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: HttpMethod,
    pub path: String,
    pub credential: Option<String>,
    pub query: Vec<(String, Option<String>)>,
    pub body: Option<Value>,
}

/// One call observed by [`MockTransport::open_task_events`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedStreamOpen {
    pub task_id: u64,
    pub credential: String,
}

#[derive(Debug, Default)]
struct MockState {
    responses: HashMap<(HttpMethod, String), VecDeque<Result<NormalizedResponse, PlatformApiError>>>,
    streams: VecDeque<StreamScript>,
    requests: Vec<RecordedRequest>,
    stream_opens: Vec<RecordedStreamOpen>,
}

/// Scripted transport used by auth, follow and command tests.
#[derive(Debug, Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
}

impl MockTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `response` for the next `method path` request.
    pub fn push_response(&self, response: NormalizedResponse) {
        let key = (response.method, response.path.clone());
        lock_unpoisoned(&self.state)
            .responses
            .entry(key)
            .or_default()
            .push_back(Ok(response));
    }

    /// Queue a JSON response for the next `method path` request.
    pub fn push_json(&self, method: HttpMethod, path: &str, status: u16, body: Value) {
        self.push_response(json_response(method, path, status, body));
    }

    /// Queue a transport failure for the next `method path` request.
    pub fn push_error(&self, method: HttpMethod, path: &str, error: PlatformApiError) {
        lock_unpoisoned(&self.state)
            .responses
            .entry((method, path.to_string()))
            .or_default()
            .push_back(Err(error));
    }

    /// Queue the behavior of the next event-stream open.
    pub fn push_stream(&self, script: StreamScript) {
        lock_unpoisoned(&self.state).streams.push_back(script);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock_unpoisoned(&self.state).requests.clone()
    }

    /// Requests issued against `path`, in order.
    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        lock_unpoisoned(&self.state)
            .requests
            .iter()
            .filter(|request| request.path == path)
            .cloned()
            .collect()
    }

    pub fn request_count(&self, path: &str) -> usize {
        lock_unpoisoned(&self.state)
            .requests
            .iter()
            .filter(|request| request.path == path)
            .count()
    }

    pub fn stream_opens(&self) -> Vec<RecordedStreamOpen> {
        lock_unpoisoned(&self.state).stream_opens.clone()
    }

    /// Scripted responses and streams not yet consumed.
    pub fn pending_scripts(&self) -> usize {
        let state = lock_unpoisoned(&self.state);
        state.responses.values().map(VecDeque::len).sum::<usize>() + state.streams.len()
    }
}

#[async_trait]
impl PlatformTransport for MockTransport {
    async fn execute(&self, request: ApiRequest) -> Result<NormalizedResponse, PlatformApiError> {
        let mut state = lock_unpoisoned(&self.state);
        state.requests.push(RecordedRequest {
            method: request.method,
            path: request.path.clone(),
            credential: request.options.credential.clone(),
            query: request.options.query.clone(),
            body: request.options.body.clone(),
        });

        state
            .responses
            .get_mut(&(request.method, request.path.clone()))
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| {
                Err(PlatformApiError::Other(format!(
                    "no scripted response for {} {}",
                    request.method, request.path
                )))
            })
    }

    async fn open_task_events(
        &self,
        credential: &str,
        task_id: u64,
        cancel: &CancellationToken,
    ) -> Result<EventStreamConnection, PlatformApiError> {
        if cancel.is_cancelled() {
            return Err(PlatformApiError::Cancelled);
        }

        let script = {
            let mut state = lock_unpoisoned(&self.state);
            state.stream_opens.push(RecordedStreamOpen {
                task_id,
                credential: credential.to_string(),
            });
            state.streams.pop_front()
        };

        let path = format!("/tasks/{task_id}/events");
        let opened = || {
            NormalizedResponse::from_parts(
                HttpMethod::Get,
                path.clone(),
                200,
                "text/event-stream",
                Value::Null,
            )
        };

        match script {
            Some(StreamScript::Reject(response)) => {
                Err(PlatformApiError::StreamStatus(Box::new(response)))
            }
            Some(StreamScript::Connect(chunks)) => Ok(EventStreamConnection {
                response: opened(),
                chunks: stream::iter(chunks).boxed(),
            }),
            Some(StreamScript::Pending) => Ok(EventStreamConnection {
                response: opened(),
                chunks: stream::pending().boxed(),
            }),
            Some(StreamScript::Fail(error)) => Err(error),
            None => Err(PlatformApiError::Other(format!(
                "no scripted stream for task {task_id}"
            ))),
        }
    }
}

/// A JSON-bodied response as the real client would normalize it.
pub fn json_response(method: HttpMethod, path: &str, status: u16, body: Value) -> NormalizedResponse {
    NormalizedResponse::from_parts(method, path, status, "application/json", body)
}

/// Encode one SSE frame.
pub fn sse_frame(event: &str, data: &Value) -> Vec<u8> {
    format!("event: {event}\ndata: {data}\n\n").into_bytes()
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use platform_api::{endpoints, SseStreamParser};
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn scripted_responses_are_consumed_in_order_per_path() {
        let transport = MockTransport::new();
        transport.push_json(HttpMethod::Get, "/tasks/1", 401, json!({}));
        transport.push_json(HttpMethod::Get, "/tasks/1", 200, json!({"status": "RUNNING"}));

        let first = transport
            .execute(endpoints::get_task(1).with_credential("a"))
            .await
            .expect("first");
        let second = transport
            .execute(endpoints::get_task(1).with_credential("b"))
            .await
            .expect("second");

        assert_eq!(first.status, 401);
        assert!(second.ok);
        let credentials: Vec<_> = transport
            .requests_to("/tasks/1")
            .into_iter()
            .map(|request| request.credential)
            .collect();
        assert_eq!(credentials, vec![Some("a".to_string()), Some("b".to_string())]);
        assert_eq!(transport.pending_scripts(), 0);
    }

    #[tokio::test]
    async fn unscripted_request_is_an_error() {
        let transport = MockTransport::new();
        let error = transport
            .execute(endpoints::get_session(9))
            .await
            .expect_err("nothing scripted");
        assert!(error.to_string().contains("GET /sessions/9"));
    }

    #[tokio::test]
    async fn connect_script_delivers_frames_then_drop() {
        let transport = MockTransport::new();
        transport.push_stream(StreamScript::frames_then_drop(&[(
            "task.progress",
            json!({"step": 1}),
        )]));

        let mut connection = transport
            .open_task_events("tok", 4, &CancellationToken::new())
            .await
            .expect("open");
        assert_eq!(connection.response.path, "/tasks/4/events");

        let mut parser = SseStreamParser::default();
        let first = connection.chunks.next().await.expect("chunk").expect("ok");
        let events = parser.feed(&first);
        assert_eq!(events[0].event, "task.progress");

        let dropped = connection.chunks.next().await.expect("drop");
        assert!(matches!(dropped, Err(PlatformApiError::Disconnected(_))));
        assert!(connection.chunks.next().await.is_none());
        assert_eq!(
            transport.stream_opens(),
            vec![RecordedStreamOpen {
                task_id: 4,
                credential: "tok".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn reject_script_surfaces_stream_status() {
        let transport = MockTransport::new();
        transport.push_stream(StreamScript::Reject(json_response(
            HttpMethod::Get,
            "/tasks/2/events",
            401,
            json!({"message": "expired"}),
        )));

        let error = transport
            .open_task_events("old", 2, &CancellationToken::new())
            .await
            .expect_err("rejected");
        assert_eq!(error.stream_status(), Some(401));
    }
}
