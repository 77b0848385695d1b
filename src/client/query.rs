//! AWS query client
//!
//! Speaks the AWS query wire shape used by CloudFormation: a form-encoded
//! POST carrying `Action` and `Version`, answered with XML. The
//! `{Action}Result` element is handed back as JSON so listings read the same
//! as JSON services. Requests are not signed here (see [`super::aws`]).

use super::aws::default_endpoint;
use super::http::{api_error, code_and_detail, HttpClient};
use super::xml;
use super::ServiceClient;
use crate::error::{DiscoveryError, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde_json::Value;
use url::Url;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";

/// Client for one AWS query service in one region
#[derive(Clone)]
pub struct AwsQueryClient {
    http: HttpClient,
    endpoint: Url,
    api_version: String,
}

impl AwsQueryClient {
    pub fn new(
        http: HttpClient,
        endpoint_prefix: &str,
        api_version: &str,
        region: &str,
        endpoint: Option<&str>,
    ) -> Result<Self> {
        let raw = match endpoint {
            Some(endpoint) => endpoint.to_string(),
            None => default_endpoint(endpoint_prefix, region),
        };
        let endpoint = Url::parse(&raw)
            .map_err(|e| DiscoveryError::config(format!("invalid AWS endpoint {:?}: {}", raw, e)))?;

        Ok(Self {
            http,
            endpoint,
            api_version: api_version.to_string(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Form body for one call; string lists use `Name.member.N`
    pub fn form_body(&self, operation: &str, params: &Value) -> String {
        let mut parts = vec![
            format!("Action={}", urlencoding::encode(operation)),
            format!("Version={}", urlencoding::encode(&self.api_version)),
        ];

        let Value::Object(map) = params else {
            return parts.join("&");
        };

        for (key, value) in map {
            match value {
                Value::String(s) => parts.push(format!("{}={}", key, urlencoding::encode(s))),
                Value::Number(n) => parts.push(format!("{}={}", key, n)),
                Value::Bool(b) => parts.push(format!("{}={}", key, b)),
                Value::Array(items) => {
                    for (idx, item) in items.iter().enumerate() {
                        if let Value::String(s) = item {
                            parts.push(format!(
                                "{}.member.{}={}",
                                key,
                                idx + 1,
                                urlencoding::encode(s)
                            ));
                        }
                    }
                }
                _ => {}
            }
        }

        parts.join("&")
    }
}

/// `Code: Message` from an `<ErrorResponse>` body
fn error_message(status: StatusCode, body: &str) -> String {
    let error = xml::parse(body)
        .ok()
        .and_then(|(_, value)| value.get("Error").cloned());

    let text = |key: &str| {
        error
            .as_ref()
            .and_then(|e| e.get(key))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    };

    code_and_detail(status, text("Code"), text("Message"))
}

#[async_trait]
impl ServiceClient for AwsQueryClient {
    fn provider(&self) -> &str {
        "aws"
    }

    async fn invoke(&self, operation: &str, params: &Value) -> Result<Value> {
        tracing::debug!("POST {} (Action={})", self.endpoint, operation);

        let request = self
            .http
            .post(self.endpoint.as_str())
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(self.form_body(operation, params));

        let (status, body) = self.http.send_text(operation, request).await?;

        if !status.is_success() {
            return Err(api_error(operation, status, error_message(status, &body)));
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        let (root, value) = xml::parse(&body)
            .map_err(|e| DiscoveryError::malformed(operation, format!("invalid XML: {}", e)))?;

        if root != format!("{}Response", operation) {
            return Err(DiscoveryError::malformed(
                operation,
                format!("unexpected root element {}", root),
            ));
        }

        Ok(value
            .get(format!("{}Result", operation))
            .cloned()
            .unwrap_or(Value::Null))
    }
}
