//! Catalogue of platform REST endpoints.
//!
//! Each function describes one request without sending it; callers attach a
//! credential with [`ApiRequest::with_credential`] and hand the request to a
//! [`crate::PlatformTransport`].

use serde::Serialize;
use serde_json::Value;

use crate::error::PlatformApiError;
use crate::payload::{
    CreateMcpRequest, CreateSessionRequest, CreateTaskRequest, LoginRequest, PageQuery,
    RefreshTokenRequest, StartMcpAuthRequest, UpdateMcpRequest,
};
use crate::response::{HttpMethod, RequestOptions};

/// Fully described request, minus transport concerns.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub path: String,
    pub options: RequestOptions,
}

impl ApiRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            options: RequestOptions::default(),
        }
    }

    #[must_use]
    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.options.credential = Some(credential.into());
        self
    }

    #[must_use]
    pub fn with_query<V: ToString>(mut self, key: impl Into<String>, value: Option<V>) -> Self {
        self.options = self.options.with_query(key, value);
        self
    }

    #[must_use]
    pub fn with_json_body(mut self, body: Value) -> Self {
        self.options.body = Some(body);
        self
    }

    fn with_body<T: Serialize>(self, body: &T) -> Result<Self, PlatformApiError> {
        Ok(self.with_json_body(serde_json::to_value(body)?))
    }

    fn with_page(self, page: &PageQuery) -> Self {
        self.with_query("status", page.status.as_deref())
            .with_query("page", page.page)
            .with_query("size", page.size)
    }
}

pub fn login(payload: &LoginRequest) -> Result<ApiRequest, PlatformApiError> {
    ApiRequest::new(HttpMethod::Post, "/auth/login").with_body(payload)
}

pub fn refresh_token(refresh_token: &str) -> Result<ApiRequest, PlatformApiError> {
    ApiRequest::new(HttpMethod::Post, "/auth/refresh").with_body(&RefreshTokenRequest {
        refresh_token: refresh_token.to_string(),
    })
}

pub fn list_mcp(server_code: Option<&str>, status: Option<&str>) -> ApiRequest {
    ApiRequest::new(HttpMethod::Get, "/mcp/servers")
        .with_query("server_code", server_code)
        .with_query("status", status)
}

pub fn create_mcp(payload: &CreateMcpRequest) -> Result<ApiRequest, PlatformApiError> {
    ApiRequest::new(HttpMethod::Post, "/mcp/servers").with_body(payload)
}

/// `POST /mcp/servers` with a caller-validated raw JSON object.
pub fn create_mcp_raw(payload: Value) -> ApiRequest {
    ApiRequest::new(HttpMethod::Post, "/mcp/servers").with_json_body(payload)
}

pub fn get_mcp(id: u64) -> ApiRequest {
    ApiRequest::new(HttpMethod::Get, format!("/mcp/servers/{id}"))
}

pub fn update_mcp(id: u64, payload: &UpdateMcpRequest) -> Result<ApiRequest, PlatformApiError> {
    ApiRequest::new(HttpMethod::Put, format!("/mcp/servers/{id}")).with_body(payload)
}

pub fn delete_mcp(id: u64) -> ApiRequest {
    ApiRequest::new(HttpMethod::Delete, format!("/mcp/servers/{id}"))
}

pub fn sync_mcp(id: u64) -> ApiRequest {
    ApiRequest::new(HttpMethod::Post, format!("/mcp/servers/{id}/sync"))
}

pub fn list_capabilities(id: u64) -> ApiRequest {
    ApiRequest::new(HttpMethod::Get, format!("/mcp/servers/{id}/capabilities"))
}

pub fn start_mcp_auth(
    id: u64,
    payload: &StartMcpAuthRequest,
) -> Result<ApiRequest, PlatformApiError> {
    ApiRequest::new(HttpMethod::Post, format!("/mcp/servers/{id}/auth")).with_body(payload)
}

/// `start_mcp_auth` with a caller-built JSON object.
pub fn start_mcp_auth_raw(id: u64, payload: Value) -> ApiRequest {
    ApiRequest::new(HttpMethod::Post, format!("/mcp/servers/{id}/auth")).with_json_body(payload)
}

pub fn get_mcp_auth_status(id: u64) -> ApiRequest {
    ApiRequest::new(HttpMethod::Get, format!("/mcp/servers/{id}/auth"))
}

pub fn delete_mcp_auth(id: u64, connection_id: Option<u64>) -> ApiRequest {
    ApiRequest::new(HttpMethod::Delete, format!("/mcp/servers/{id}/auth"))
        .with_query("connectionId", connection_id)
}

pub fn create_session(title: Option<&str>) -> Result<ApiRequest, PlatformApiError> {
    ApiRequest::new(HttpMethod::Post, "/sessions").with_body(&CreateSessionRequest {
        title: title
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(ToOwned::to_owned),
    })
}

pub fn list_sessions(page: &PageQuery) -> ApiRequest {
    ApiRequest::new(HttpMethod::Get, "/sessions").with_page(page)
}

pub fn get_session(session_id: u64) -> ApiRequest {
    ApiRequest::new(HttpMethod::Get, format!("/sessions/{session_id}"))
}

pub fn create_task(payload: &CreateTaskRequest) -> Result<ApiRequest, PlatformApiError> {
    ApiRequest::new(HttpMethod::Post, "/tasks").with_body(payload)
}

pub fn list_tasks(page: &PageQuery) -> ApiRequest {
    ApiRequest::new(HttpMethod::Get, "/tasks").with_page(page)
}

pub fn get_task(task_id: u64) -> ApiRequest {
    ApiRequest::new(HttpMethod::Get, format!("/tasks/{task_id}"))
}

pub fn get_task_artifacts(task_id: u64) -> ApiRequest {
    ApiRequest::new(HttpMethod::Get, format!("/tasks/{task_id}/artifacts"))
}

pub fn cancel_task(task_id: u64) -> ApiRequest {
    ApiRequest::new(HttpMethod::Post, format!("/tasks/{task_id}/cancel"))
}

/// Path of the task event stream.
pub fn task_events_path(task_id: u64) -> String {
    format!("/tasks/{task_id}/events")
}
