//! Recorded responses
//!
//! A fixture file maps `provider/service` to operations, and each operation
//! to an ordered list of exchanges. An exchange is served at most once, to
//! the first call whose parameters contain all of the exchange's `params`.
//!
//! ```yaml
//! aws/cloudformation:
//!   ListStacks:
//!     - response: { StackSummaries: [...], NextToken: t1 }
//!     - params: { NextToken: t1 }
//!       response: { StackSummaries: [...] }
//!   ListStackSets:
//!     - error: { status: 403, message: AccessDenied }
//! ```

use super::ServiceClient;
use crate::error::{DiscoveryError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Mutex;

/// A recorded failure
#[derive(Debug, Clone, Deserialize)]
pub struct RecordedError {
    #[serde(default = "default_error_status")]
    pub status: u16,
    pub message: String,
}

fn default_error_status() -> u16 {
    500
}

/// One recorded request/response pair
#[derive(Debug, Clone, Deserialize)]
pub struct Exchange {
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(default)]
    pub response: Value,
    #[serde(default)]
    pub error: Option<RecordedError>,
}

impl Exchange {
    fn matches(&self, params: &Value) -> bool {
        self.params
            .iter()
            .all(|(key, expected)| params.get(key) == Some(expected))
    }
}

type Operations = BTreeMap<String, Vec<Exchange>>;

/// All recorded exchanges, keyed by `provider/service`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct FixtureSet {
    generators: BTreeMap<String, Operations>,
}

impl FixtureSet {
    /// Load a fixture file; `.yaml`/`.yml` files are read as YAML, anything else as JSON
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DiscoveryError::config(format!("cannot read fixture file {}: {}", path.display(), e))
        })?;

        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );

        let parsed = if is_yaml {
            serde_yaml::from_str(&content).map_err(|e| e.to_string())
        } else {
            serde_json::from_str(&content).map_err(|e| e.to_string())
        };

        parsed.map_err(|e| {
            DiscoveryError::config(format!("invalid fixture file {}: {}", path.display(), e))
        })
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.generators.keys().map(|k| k.as_str())
    }

    /// A client serving the exchanges recorded for one generator
    pub fn client_for(&self, provider: &str, service: &str) -> FixtureClient {
        let key = format!("{}/{}", provider, service);
        let mut client = FixtureClient::new(provider);
        if let Some(operations) = self.generators.get(&key) {
            client.operations = operations.clone();
        } else {
            tracing::warn!("fixture has no entries for {}", key);
        }
        client
    }
}

/// A call received by a [`FixtureClient`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub operation: String,
    pub params: Value,
}

/// [`ServiceClient`] answering from recorded exchanges
pub struct FixtureClient {
    provider: String,
    operations: Operations,
    consumed: Mutex<HashSet<(String, usize)>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FixtureClient {
    pub fn new(provider: &str) -> Self {
        Self {
            provider: provider.to_string(),
            operations: BTreeMap::new(),
            consumed: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn push(mut self, operation: &str, exchange: Exchange) -> Self {
        self.operations
            .entry(operation.to_string())
            .or_default()
            .push(exchange);
        self
    }

    /// Answer the next unmatched call to `operation`
    pub fn respond(self, operation: &str, response: Value) -> Self {
        self.push(
            operation,
            Exchange {
                params: Map::new(),
                response,
                error: None,
            },
        )
    }

    /// Answer a call to `operation` whose params contain `params`
    pub fn respond_to(self, operation: &str, params: Value, response: Value) -> Self {
        let params = match params {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        self.push(
            operation,
            Exchange {
                params,
                response,
                error: None,
            },
        )
    }

    /// Fail the next unmatched call to `operation`
    pub fn fail(self, operation: &str, status: u16, message: &str) -> Self {
        self.push(
            operation,
            Exchange {
                params: Map::new(),
                response: Value::Null,
                error: Some(RecordedError {
                    status,
                    message: message.to_string(),
                }),
            },
        )
    }

    /// Every call received so far, in order
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }
}

#[async_trait]
impl ServiceClient for FixtureClient {
    fn provider(&self) -> &str {
        &self.provider
    }

    async fn invoke(&self, operation: &str, params: &Value) -> Result<Value> {
        tracing::debug!("fixture {} {}", operation, params);
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(RecordedCall {
                operation: operation.to_string(),
                params: params.clone(),
            });

        let exchange = {
            let mut consumed = self.consumed.lock().unwrap_or_else(|e| e.into_inner());
            self.operations.get(operation).and_then(|exchanges| {
                exchanges.iter().enumerate().find_map(|(idx, exchange)| {
                    let slot = (operation.to_string(), idx);
                    if consumed.contains(&slot) || !exchange.matches(params) {
                        return None;
                    }
                    consumed.insert(slot);
                    Some(exchange)
                })
            })
        };

        let Some(exchange) = exchange else {
            return Err(DiscoveryError::Api {
                operation: operation.to_string(),
                status: 404,
                message: "no recorded response".to_string(),
            });
        };

        match &exchange.error {
            Some(error) => Err(DiscoveryError::Api {
                operation: operation.to_string(),
                status: error.status,
                message: error.message.clone(),
            }),
            None => Ok(exchange.response.clone()),
        }
    }
}
