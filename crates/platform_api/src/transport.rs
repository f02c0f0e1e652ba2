use async_trait::async_trait;
use futures_util::stream::BoxStream;
use tokio_util::sync::CancellationToken;

use crate::endpoints::ApiRequest;
use crate::error::PlatformApiError;
use crate::response::NormalizedResponse;

/// Raw body chunks of an open event stream.
pub type ChunkStream = BoxStream<'static, Result<Vec<u8>, PlatformApiError>>;

/// An event stream that opened with a 2xx status.
pub struct EventStreamConnection {
    /// Opening response (status and content type, `null` body).
    pub response: NormalizedResponse,
    pub chunks: ChunkStream,
}

impl std::fmt::Debug for EventStreamConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStreamConnection")
            .field("response", &self.response)
            .finish_non_exhaustive()
    }
}

/// Seam between request policy (auth, follow) and the wire.
#[async_trait]
pub trait PlatformTransport: Send + Sync {
    /// Issue one request. HTTP failures are values; `Err` means the exchange
    /// itself failed.
    async fn execute(&self, request: ApiRequest) -> Result<NormalizedResponse, PlatformApiError>;

    /// Open `GET /tasks/{task_id}/events`.
    ///
    /// A non-2xx answer is `Err(PlatformApiError::StreamStatus)` carrying the
    /// normalized error response. Cancelling `cancel` aborts the connect.
    async fn open_task_events(
        &self,
        credential: &str,
        task_id: u64,
        cancel: &CancellationToken,
    ) -> Result<EventStreamConnection, PlatformApiError>;
}
