//! Remote API clients
//!
//! The discovery core only needs one thing from a provider: "invoke this
//! list operation with these parameters and give me the JSON back". Each
//! provider implements [`ServiceClient`] for its wire protocol.
//!
//! # Module Structure
//!
//! - [`http`] - reqwest wrapper shared by the provider clients
//! - [`aws`] - AWS JSON 1.1 services (`X-Amz-Target` dispatch)
//! - [`query`] - AWS query services (form request, XML response)
//! - [`xml`] - XML to JSON for query responses
//! - [`octopus`] - Octopus Deploy REST API
//! - [`fixture`] - recorded responses for offline runs and tests

pub mod aws;
pub mod fixture;
pub mod http;
pub mod octopus;
pub mod query;
pub mod xml;

use crate::error::{DiscoveryError, Result};
use crate::resource::{AwsProtocol, GeneratorDef};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub use aws::AwsJsonClient;
pub use fixture::{FixtureClient, FixtureSet};
pub use http::HttpClient;
pub use octopus::OctopusClient;
pub use query::AwsQueryClient;

/// A ready, already-authenticated client for one provider service
#[async_trait]
pub trait ServiceClient: Send + Sync {
    /// Provider name stamped onto every descriptor this client yields
    fn provider(&self) -> &str;

    /// Invoke one remote operation and return the decoded response
    async fn invoke(&self, operation: &str, params: &Value) -> Result<Value>;
}

/// Everything needed to build a client for any registered generator
#[derive(Clone)]
pub struct ClientSettings {
    pub aws_region: String,
    /// Overrides the default AWS endpoint for every AWS service
    pub aws_endpoint: Option<String>,
    pub octopus_server: Option<String>,
    pub octopus_api_key: Option<String>,
    pub octopus_space: Option<String>,
    pub timeout: Duration,
    /// When set, every client serves recorded responses instead
    pub fixtures: Option<Arc<FixtureSet>>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            aws_region: "us-east-1".to_string(),
            aws_endpoint: None,
            octopus_server: None,
            octopus_api_key: None,
            octopus_space: None,
            timeout: Duration::from_secs(30),
            fixtures: None,
        }
    }
}

/// Build the client a generator needs
///
/// Fails with [`DiscoveryError::Config`] before any remote call when the
/// settings cannot produce a usable client.
pub fn connect(def: &GeneratorDef, settings: &ClientSettings) -> Result<Arc<dyn ServiceClient>> {
    if let Some(fixtures) = &settings.fixtures {
        tracing::debug!("{}: serving recorded responses", def.key());
        return Ok(Arc::new(fixtures.client_for(&def.provider, &def.service)));
    }

    let http = HttpClient::new(settings.timeout)?;

    match def.provider.as_str() {
        "aws" => match def.protocol {
            AwsProtocol::Json => {
                let Some(target_prefix) = def.target_prefix.as_deref() else {
                    return Err(DiscoveryError::config(format!(
                        "{} has no target_prefix",
                        def.key()
                    )));
                };
                let client = AwsJsonClient::new(
                    http,
                    def.endpoint_prefix(),
                    target_prefix,
                    &settings.aws_region,
                    settings.aws_endpoint.as_deref(),
                )?;
                Ok(Arc::new(client))
            }
            AwsProtocol::Query => {
                let Some(api_version) = def.api_version.as_deref() else {
                    return Err(DiscoveryError::config(format!(
                        "{} has no api_version",
                        def.key()
                    )));
                };
                let client = AwsQueryClient::new(
                    http,
                    def.endpoint_prefix(),
                    api_version,
                    &settings.aws_region,
                    settings.aws_endpoint.as_deref(),
                )?;
                Ok(Arc::new(client))
            }
        },
        "octopusdeploy" => {
            let Some(server) = settings.octopus_server.as_deref() else {
                return Err(DiscoveryError::config(
                    "no Octopus server configured. Set OCTOPUS_URL or use --octopus-server",
                ));
            };
            let client = OctopusClient::new(
                http,
                server,
                settings.octopus_api_key.clone(),
                settings.octopus_space.clone(),
            )?;
            Ok(Arc::new(client))
        }
        other => Err(DiscoveryError::config(format!(
            "no client available for provider {}",
            other
        ))),
    }
}
