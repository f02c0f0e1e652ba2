use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// HTTP methods used by the platform API surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Per-request inputs besides method and path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    /// Bearer credential injected as `authorization`.
    pub credential: Option<String>,
    /// Query parameters in insertion order; `None` values are skipped.
    pub query: Vec<(String, Option<String>)>,
    /// JSON body; presence also sets `content-type`.
    pub body: Option<Value>,
    /// Extra headers merged after the defaults.
    pub headers: BTreeMap<String, String>,
}

impl RequestOptions {
    #[must_use]
    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }

    #[must_use]
    pub fn with_query<V: ToString>(mut self, key: impl Into<String>, value: Option<V>) -> Self {
        self.query
            .push((key.into(), value.map(|value| value.to_string())));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }
}

/// One HTTP exchange, normalized. Produced for every completed request,
/// whatever its status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedResponse {
    pub method: HttpMethod,
    pub path: String,
    pub status: u16,
    pub ok: bool,
    pub content_type: String,
    pub body: Value,
}

impl NormalizedResponse {
    /// Build a response from raw parts. `ok` is always derived from `status`.
    pub fn from_parts(
        method: HttpMethod,
        path: impl Into<String>,
        status: u16,
        content_type: impl Into<String>,
        body: Value,
    ) -> Self {
        Self {
            method,
            path: path.into(),
            status,
            ok: is_success_status(status),
            content_type: content_type.into(),
            body,
        }
    }

    /// Build a response from raw body text, classifying it by content type.
    pub fn from_raw(
        method: HttpMethod,
        path: impl Into<String>,
        status: u16,
        content_type: impl Into<String>,
        raw: &str,
    ) -> Self {
        let content_type = content_type.into();
        let body = classify_body(&content_type, raw);
        Self::from_parts(method, path, status, content_type, body)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    /// String field from an object body.
    pub fn body_str(&self, key: &str) -> Option<&str> {
        self.body.get(key).and_then(Value::as_str)
    }
}

pub fn is_success_status(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Classify a response body by its declared content type.
///
/// Never fails: an empty body is `null`, JSON content types are parsed when
/// possible, anything else is wrapped verbatim.
pub fn classify_body(content_type: &str, raw: &str) -> Value {
    if raw.trim().is_empty() {
        return Value::Null;
    }

    if is_json_content_type(content_type) {
        if let Ok(value) = serde_json::from_str::<Value>(raw) {
            return value;
        }
    }

    raw_text_fallback(raw, content_type)
}

/// Wrapper body carrying unparsed text and its content type.
pub fn raw_text_fallback(raw: &str, content_type: &str) -> Value {
    json!({
        "raw_text": raw,
        "content_type": content_type,
    })
}

fn is_json_content_type(content_type: &str) -> bool {
    content_type
        .to_ascii_lowercase()
        .contains("application/json")
}
