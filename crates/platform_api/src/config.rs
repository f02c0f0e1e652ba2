use std::collections::BTreeMap;
use std::time::Duration;

use crate::url::resolve_base_url;

/// Transport configuration for platform API requests.
#[derive(Debug, Clone)]
pub struct PlatformApiConfig {
    /// Versioned base URL every request path is joined onto.
    pub base_url: String,
    /// Optional `User-Agent` override.
    pub user_agent: Option<String>,
    /// Additional headers merged into every request.
    pub extra_headers: BTreeMap<String, String>,
    /// Optional whole-request timeout. Event streams ignore it.
    pub timeout: Option<Duration>,
    /// Optional TCP connect timeout, applied to event streams too.
    pub connect_timeout: Option<Duration>,
}

impl Default for PlatformApiConfig {
    fn default() -> Self {
        Self {
            base_url: resolve_base_url(None),
            user_agent: None,
            extra_headers: BTreeMap::new(),
            timeout: None,
            connect_timeout: None,
        }
    }
}

impl PlatformApiConfig {
    /// Config resolved from an explicit base URL, falling back to
    /// `ABC_API_BASE_URL` and then the built-in default.
    pub fn new(base_url: Option<&str>) -> Self {
        Self {
            base_url: resolve_base_url(base_url),
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn insert_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(key.into(), value.into());
        self
    }

    pub fn with_headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        self.extra_headers.extend(headers);
        self
    }
}
