//! HTTP utilities for remote API calls

use crate::error::{DiscoveryError, Result};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use std::time::Duration;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Maximum length of a remote error message kept in [`DiscoveryError::Api`]
const MAX_ERROR_MESSAGE_LENGTH: usize = 120;

pub const USER_AGENT: &str = concat!("stackscout/", env!("CARGO_PKG_VERSION"));

/// Sanitize response body for logging
/// Truncates long responses and drops control characters
fn sanitize_for_log(body: &str) -> String {
    let total = body.chars().count();
    let truncated = if total > MAX_LOG_BODY_LENGTH {
        let head: String = body.chars().take(MAX_LOG_BODY_LENGTH).collect();
        format!("{}... [truncated, {} bytes total]", head, body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Pull a short, printable error message out of an error body.
///
/// AWS JSON services answer `{"__type": "ns#Code", "message": "..."}`,
/// Octopus answers `{"ErrorMessage": "..."}`.
fn error_message(status: StatusCode, body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();

    let code = parsed
        .as_ref()
        .and_then(|v| v.get("__type"))
        .and_then(|v| v.as_str())
        .map(|t| t.rsplit('#').next().unwrap_or(t).to_string());

    let detail = parsed.as_ref().and_then(|v| {
        ["message", "Message", "ErrorMessage"]
            .iter()
            .find_map(|key| v.get(*key).and_then(|m| m.as_str()))
            .map(|s| s.to_string())
    });

    code_and_detail(status, code, detail)
}

/// `Code: detail`, whichever parts are known, else the status reason
pub(crate) fn code_and_detail(
    status: StatusCode,
    code: Option<String>,
    detail: Option<String>,
) -> String {
    match (code, detail) {
        (Some(code), Some(detail)) => format!("{}: {}", code, detail),
        (Some(code), None) => code,
        (None, Some(detail)) => detail,
        (None, None) => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
    }
}

/// HTTP client wrapper shared by the provider clients
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| DiscoveryError::config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        self.client.get(url)
    }

    pub fn post(&self, url: &str) -> RequestBuilder {
        self.client.post(url)
    }

    /// Send a request and return the status and body, failing only on transport errors
    pub async fn send_text(
        &self,
        operation: &str,
        request: RequestBuilder,
    ) -> Result<(StatusCode, String)> {
        let response = request
            .send()
            .await
            .map_err(|source| DiscoveryError::Transport {
                operation: operation.to_string(),
                source,
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| DiscoveryError::Transport {
                operation: operation.to_string(),
                source,
            })?;

        if !status.is_success() {
            // Security: Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!("{} API error: {} - {}", operation, status, sanitize_for_log(&body));
        }

        Ok((status, body))
    }

    /// Send a request and parse the JSON response
    pub async fn send_json(&self, operation: &str, request: RequestBuilder) -> Result<Value> {
        let (status, body) = self.send_text(operation, request).await?;

        if !status.is_success() {
            return Err(api_error(operation, status, error_message(status, &body)));
        }

        // Handle empty response
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body)
            .map_err(|e| DiscoveryError::malformed(operation, format!("invalid JSON: {}", e)))
    }
}

/// [`DiscoveryError::Api`] with a printable, bounded message
pub fn api_error(operation: &str, status: StatusCode, message: String) -> DiscoveryError {
    DiscoveryError::Api {
        operation: operation.to_string(),
        status: status.as_u16(),
        message: printable(&message),
    }
}

fn printable(message: &str) -> String {
    message
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .take(MAX_ERROR_MESSAGE_LENGTH)
        .collect()
}

/// A short hint for common failure statuses, for display next to an error
pub fn status_hint(error: &DiscoveryError) -> Option<&'static str> {
    let DiscoveryError::Api { status, .. } = error else {
        return None;
    };

    match status {
        400 => Some("Invalid request. Check the endpoint and region."),
        401 => Some("Authentication failed. Check the credentials in front of this endpoint."),
        403 => Some("Permission denied. The identity lacks list permissions for this service."),
        404 => Some("Not found. The service may not exist in this region or server."),
        429 => Some("Rate limit exceeded. Try again later."),
        500..=599 => Some("Service temporarily unavailable. Try again."),
        _ => None,
    }
}
