use url::Url;

use crate::error::PlatformApiError;

/// Default versioned base URL for platform requests.
pub const DEFAULT_BASE_URL: &str = "https://arch.stg.alphabitcore.io/api/v1";

/// Environment override consulted when no explicit base URL is configured.
pub const BASE_URL_ENV: &str = "ABC_API_BASE_URL";

/// Resolve the base URL: explicit value, then `ABC_API_BASE_URL`, then the
/// built-in default. Blank values are skipped at every step.
pub fn resolve_base_url(explicit: Option<&str>) -> String {
    if let Some(value) = explicit.map(str::trim).filter(|value| !value.is_empty()) {
        return value.to_string();
    }

    std::env::var(BASE_URL_ENV)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
}

/// Join a base URL and request path, then attach query parameters.
///
/// Rules:
/// 1) a single trailing `/` on the base is dropped
/// 2) the path always starts with `/`
/// 3) query entries whose value is `None` are skipped
pub fn join_url(
    base_url: &str,
    path: &str,
    query: &[(String, Option<String>)],
) -> Result<Url, PlatformApiError> {
    let base = base_url.trim();
    let base = base.strip_suffix('/').unwrap_or(base);
    let joined = if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    };

    let mut url =
        Url::parse(&joined).map_err(|error| PlatformApiError::InvalidUrl(format!("{joined}: {error}")))?;

    let present = query
        .iter()
        .filter_map(|(key, value)| value.as_deref().map(|value| (key.as_str(), value)))
        .collect::<Vec<_>>();
    if !present.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in present {
            pairs.append_pair(key, value);
        }
    }

    Ok(url)
}
