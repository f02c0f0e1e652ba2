use std::collections::BTreeMap;
use std::future::Future;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Response};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::PlatformApiConfig;
use crate::endpoints::{task_events_path, ApiRequest};
use crate::error::PlatformApiError;
use crate::headers::{build_event_stream_headers, build_headers};
use crate::response::{HttpMethod, NormalizedResponse};
use crate::transport::{EventStreamConnection, PlatformTransport};
use crate::url::join_url;

/// Request gateway over `reqwest`.
#[derive(Debug, Clone)]
pub struct PlatformApiClient {
    http: Client,
    stream_http: Client,
    config: PlatformApiConfig,
}

impl PlatformApiClient {
    pub fn new(config: PlatformApiConfig) -> Result<Self, PlatformApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(timeout) = config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        let http = builder.build()?;

        // Streams stay open for the life of a task; only the connect is bounded.
        let mut stream_builder = Client::builder();
        if let Some(timeout) = config.connect_timeout {
            stream_builder = stream_builder.connect_timeout(timeout);
        }
        let stream_http = stream_builder.build()?;

        Ok(Self {
            http,
            stream_http,
            config,
        })
    }

    pub fn config(&self) -> &PlatformApiConfig {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub fn build_request(
        &self,
        request: &ApiRequest,
    ) -> Result<reqwest::RequestBuilder, PlatformApiError> {
        let url = join_url(&self.config.base_url, &request.path, &request.options.query)?;
        let headers = header_map(build_headers(&self.config, &request.options))?;

        let mut builder = self
            .http
            .request(request.method.into(), url)
            .headers(headers);
        if let Some(body) = &request.options.body {
            builder = builder.body(serde_json::to_vec(body)?);
        }

        Ok(builder)
    }

    pub fn build_event_stream_request(
        &self,
        credential: &str,
        task_id: u64,
    ) -> Result<reqwest::RequestBuilder, PlatformApiError> {
        let url = join_url(&self.config.base_url, &task_events_path(task_id), &[])?;
        let headers = header_map(build_event_stream_headers(&self.config, credential))?;
        Ok(self.stream_http.get(url).headers(headers))
    }
}

#[async_trait]
impl PlatformTransport for PlatformApiClient {
    async fn execute(&self, request: ApiRequest) -> Result<NormalizedResponse, PlatformApiError> {
        let response = self.build_request(&request)?.send().await?;
        let normalized = normalize_response(request.method, &request.path, response).await?;
        debug!(
            method = %normalized.method,
            path = %normalized.path,
            status = normalized.status,
            "platform request finished"
        );
        Ok(normalized)
    }

    async fn open_task_events(
        &self,
        credential: &str,
        task_id: u64,
        cancel: &CancellationToken,
    ) -> Result<EventStreamConnection, PlatformApiError> {
        let path = task_events_path(task_id);
        let request = self.build_event_stream_request(credential, task_id)?;
        let response = await_or_cancel(request.send(), cancel).await??;

        if !response.status().is_success() {
            let normalized =
                await_or_cancel(normalize_response(HttpMethod::Get, &path, response), cancel)
                    .await??;
            debug!(task_id, status = normalized.status, "event stream rejected");
            return Err(PlatformApiError::StreamStatus(Box::new(normalized)));
        }

        let opened = NormalizedResponse::from_parts(
            HttpMethod::Get,
            path,
            response.status().as_u16(),
            content_type_of(&response),
            serde_json::Value::Null,
        );
        debug!(task_id, status = opened.status, "event stream opened");

        let chunks = response
            .bytes_stream()
            .map(|chunk| {
                chunk
                    .map(|bytes| bytes.to_vec())
                    .map_err(PlatformApiError::from)
            })
            .boxed();

        Ok(EventStreamConnection {
            response: opened,
            chunks,
        })
    }
}

async fn normalize_response(
    method: HttpMethod,
    path: &str,
    response: Response,
) -> Result<NormalizedResponse, PlatformApiError> {
    let status = response.status().as_u16();
    let content_type = content_type_of(&response);
    let raw = response.text().await?;
    Ok(NormalizedResponse::from_raw(
        method,
        path,
        status,
        content_type,
        &raw,
    ))
}

fn content_type_of(response: &Response) -> String {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn header_map(headers: BTreeMap<String, String>) -> Result<HeaderMap, PlatformApiError> {
    let mut out = HeaderMap::new();
    for (key, value) in headers {
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|_| PlatformApiError::InvalidHeader { name: key.clone() })?;
        let value = HeaderValue::from_str(&value)
            .map_err(|_| PlatformApiError::InvalidHeader { name: key.clone() })?;
        out.insert(name, value);
    }
    Ok(out)
}

/// Race `future` against cancellation of `cancel`.
pub async fn await_or_cancel<F>(
    future: F,
    cancel: &CancellationToken,
) -> Result<F::Output, PlatformApiError>
where
    F: Future,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(PlatformApiError::Cancelled),
        output = future => Ok(output),
    }
}
