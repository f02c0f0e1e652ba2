//! Transport-only client primitives for the task-execution platform API.
//!
//! This crate owns request building, response normalization and event-stream
//! decoding. It contains no credential lifecycle code: callers hand in the
//! bearer credential per request, and refresh/retry policy lives in
//! `platform_auth`.
//!
//! Every HTTP exchange produces a [`NormalizedResponse`], including 4xx/5xx
//! answers. Only transport failures surface as [`PlatformApiError`].

pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod events;
pub mod headers;
pub mod payload;
pub mod response;
pub mod retry;
pub mod sse;
pub mod transport;
pub mod url;

pub use client::{await_or_cancel, PlatformApiClient};
pub use config::PlatformApiConfig;
pub use endpoints::ApiRequest;
pub use error::PlatformApiError;
pub use events::{is_terminal_event, is_terminal_task_status, ParsedStreamEvent};
pub use response::{HttpMethod, NormalizedResponse, RequestOptions};
pub use retry::{is_retriable_http_status, Backoff};
pub use sse::{parse_event_buffer, ParsedChunk, SseStreamParser};
pub use transport::{ChunkStream, EventStreamConnection, PlatformTransport};
pub use url::{join_url, resolve_base_url};
