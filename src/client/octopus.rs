//! Octopus Deploy client
//!
//! Operations are REST paths under `/api` (e.g. `environments/all`), scoped
//! to a space when one is configured.

use super::http::HttpClient;
use super::ServiceClient;
use crate::error::{DiscoveryError, Result};
use async_trait::async_trait;
use serde_json::Value;
use url::Url;

const API_KEY_HEADER: &str = "X-Octopus-ApiKey";

/// Client for one Octopus Deploy server
#[derive(Clone)]
pub struct OctopusClient {
    http: HttpClient,
    server: Url,
    api_key: Option<String>,
    space: Option<String>,
}

impl OctopusClient {
    pub fn new(
        http: HttpClient,
        server: &str,
        api_key: Option<String>,
        space: Option<String>,
    ) -> Result<Self> {
        let server = Url::parse(server).map_err(|e| {
            DiscoveryError::config(format!("invalid Octopus server URL {:?}: {}", server, e))
        })?;
        if server.cannot_be_a_base() {
            return Err(DiscoveryError::config(format!(
                "Octopus server URL {} cannot be used as a base",
                server
            )));
        }

        Ok(Self {
            http,
            server,
            api_key,
            space: space.filter(|s| !s.is_empty()),
        })
    }

    /// Full URL of an operation path, including query parameters
    pub fn operation_url(&self, operation: &str, params: &Value) -> String {
        let base = self.server.as_str().trim_end_matches('/');
        let path = operation.trim_start_matches('/');
        let url = match &self.space {
            Some(space) => format!("{}/api/{}/{}", base, space, path),
            None => format!("{}/api/{}", base, path),
        };
        add_query_params(&url, params)
    }
}

#[async_trait]
impl ServiceClient for OctopusClient {
    fn provider(&self) -> &str {
        "octopusdeploy"
    }

    async fn invoke(&self, operation: &str, params: &Value) -> Result<Value> {
        let url = self.operation_url(operation, params);
        tracing::debug!("GET {}", url);

        let mut request = self.http.get(&url);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        self.http.send_json(operation, request).await
    }
}

fn add_query_params(url: &str, params: &Value) -> String {
    let Value::Object(map) = params else {
        return url.to_string();
    };

    let mut query_parts: Vec<String> = Vec::new();

    for (key, value) in map {
        match value {
            Value::String(s) => {
                query_parts.push(format!("{}={}", key, urlencoding::encode(s)));
            }
            Value::Number(n) => {
                query_parts.push(format!("{}={}", key, n));
            }
            Value::Bool(b) => {
                query_parts.push(format!("{}={}", key, b));
            }
            Value::Array(arr) => {
                for item in arr {
                    if let Value::String(s) = item {
                        query_parts.push(format!("{}={}", key, urlencoding::encode(s)));
                    }
                }
            }
            _ => {}
        }
    }

    if query_parts.is_empty() {
        url.to_string()
    } else if url.contains('?') {
        format!("{}&{}", url, query_parts.join("&"))
    } else {
        format!("{}?{}", url, query_parts.join("&"))
    }
}
