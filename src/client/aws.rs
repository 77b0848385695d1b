//! AWS JSON client
//!
//! Speaks the AWS JSON 1.1 wire shape: every operation is a POST of the
//! request parameters to the service endpoint, dispatched by the
//! `X-Amz-Target` header. Requests are not signed here; the endpoint must
//! accept them as sent (an emulator, or a signing proxy in front of AWS).

use super::http::HttpClient;
use super::ServiceClient;
use crate::error::{DiscoveryError, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use url::Url;

const AMZ_JSON_CONTENT_TYPE: &str = "application/x-amz-json-1.1";

/// Client for one AWS JSON service in one region
#[derive(Clone)]
pub struct AwsJsonClient {
    http: HttpClient,
    endpoint: Url,
    target_prefix: String,
}

impl AwsJsonClient {
    /// Create a client for `endpoint_prefix` in `region`, or for an explicit endpoint
    pub fn new(
        http: HttpClient,
        endpoint_prefix: &str,
        target_prefix: &str,
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
            target_prefix: target_prefix.to_string(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// `X-Amz-Target` value for an operation
    pub fn target(&self, operation: &str) -> String {
        format!("{}.{}", self.target_prefix, operation)
    }
}

/// Regional endpoint, e.g. `https://waf-regional.eu-west-1.amazonaws.com/`
pub fn default_endpoint(endpoint_prefix: &str, region: &str) -> String {
    format!("https://{}.{}.amazonaws.com/", endpoint_prefix, region)
}

#[async_trait]
impl ServiceClient for AwsJsonClient {
    fn provider(&self) -> &str {
        "aws"
    }

    async fn invoke(&self, operation: &str, params: &Value) -> Result<Value> {
        let target = self.target(operation);
        tracing::debug!("POST {} ({})", self.endpoint, target);

        let body = if params.is_null() {
            b"{}".to_vec()
        } else {
            serde_json::to_vec(params).map_err(|e| {
                DiscoveryError::malformed(operation, format!("unencodable params: {}", e))
            })?
        };

        let request = self
            .http
            .post(self.endpoint.as_str())
            .header("X-Amz-Target", target)
            .header(CONTENT_TYPE, AMZ_JSON_CONTENT_TYPE)
            .body(body);

        self.http.send_json(operation, request).await
    }
}
