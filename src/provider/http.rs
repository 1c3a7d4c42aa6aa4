//! Shared HTTP client and response classification.

use std::sync::OnceLock;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, RETRY_AFTER};

use crate::error::AniError;

static SHARED_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

/// Get (or create) the shared reqwest client.
///
/// Per-call deadlines are applied by the backend clients, not here.
pub fn shared_client() -> &'static reqwest::Client {
    SHARED_CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .pool_max_idle_per_host(4)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new())
    })
}

/// Headers for an `xi-api-key` authenticated endpoint returning audio.
pub fn xi_api_key_headers(api_key: &str, accept: &'static str) -> Result<HeaderMap, AniError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static(accept));
    let key = HeaderValue::from_str(api_key)
        .map_err(|_| AniError::Configuration("API key contains invalid characters".into()))?;
    headers.insert("xi-api-key", key);
    Ok(headers)
}

/// Send a request, stripping the URL from transport errors so query-string
/// credentials never reach logs.
pub async fn send(request: reqwest::RequestBuilder) -> Result<reqwest::Response, AniError> {
    request
        .send()
        .await
        .map_err(|e| AniError::Network(e.without_url()))
}

/// Turn a non-success response into an error.
pub async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, AniError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let header_hint = retry_after_header(response.headers());
    let body = response.text().await.unwrap_or_default();
    Err(match status_to_error(status.as_u16(), &body) {
        AniError::RateLimited { retry_after_ms } => AniError::RateLimited {
            retry_after_ms: header_hint.or(retry_after_ms),
        },
        other => other,
    })
}

/// `Retry-After` in delta-seconds. HTTP-date values are ignored.
pub fn retry_after_header(headers: &HeaderMap) -> Option<u64> {
    let secs: f64 = headers.get(RETRY_AFTER)?.to_str().ok()?.trim().parse().ok()?;
    (secs.is_finite() && secs >= 0.0).then(|| (secs * 1000.0) as u64)
}

/// Map an HTTP status code and body to an error.
pub fn status_to_error(status: u16, body: &str) -> AniError {
    match status {
        401 | 403 => AniError::Authentication(error_message(body).unwrap_or_else(|| body.into())),
        429 => AniError::RateLimited {
            retry_after_ms: extract_retry_after(body),
        },
        _ => AniError::api(status, error_message(body).unwrap_or_else(|| body.into())),
    }
}

/// `error.message` (Gemini) or `detail.message` (ElevenLabs) from a JSON body.
pub fn error_message(body: &str) -> Option<String> {
    let parsed: serde_json::Value = serde_json::from_str(body).ok()?;
    ["error", "detail"]
        .iter()
        .filter_map(|field| parsed.get(field))
        .find_map(|err| err.get("message").and_then(|m| m.as_str()))
        .map(ToString::to_string)
}

/// Gemini's `RetryInfo` detail: `{"error":{"details":[{"retryDelay":"30s"}]}}`.
fn extract_retry_after(body: &str) -> Option<u64> {
    let parsed: serde_json::Value = serde_json::from_str(body).ok()?;
    parsed
        .get("error")?
        .get("details")?
        .as_array()?
        .iter()
        .filter_map(|detail| detail.get("retryDelay").and_then(|d| d.as_str()))
        .find_map(parse_duration_secs)
}

fn parse_duration_secs(value: &str) -> Option<u64> {
    let secs: f64 = value.trim().strip_suffix('s')?.parse().ok()?;
    (secs.is_finite() && secs >= 0.0).then(|| (secs * 1000.0) as u64)
}

pub fn trim_trailing_slash(url: &str) -> &str {
    url.trim_end_matches('/')
}
