//! Generator Registry - Load generator definitions from JSON
//!
//! Every provider ships one JSON file describing its generators and the
//! enumeration steps they run. The files are embedded in the binary and
//! parsed once.

use crate::error::{DiscoveryError, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;

/// Embedded provider JSON files (compiled into the binary)
const PROVIDER_FILES: &[&str] = &[
    include_str!("../resources/aws.json"),
    include_str!("../resources/octopusdeploy.json"),
];

/// Continuation token plumbing for a paginated listing
#[derive(Debug, Clone, Deserialize)]
pub struct PaginationDef {
    /// Request parameter carrying the token of the page to fetch
    pub request_param: String,
    /// Response field holding the token of the following page
    pub response_field: String,
}

/// One remote list call
#[derive(Debug, Clone, Deserialize)]
pub struct ListingDef {
    pub operation: String,
    #[serde(default)]
    pub params: Value,
    /// Dot-separated path to the item array; empty means the response is the array
    #[serde(default)]
    pub response_path: String,
    #[serde(default)]
    pub pagination: Option<PaginationDef>,
}

/// Items whose `field` equals one of `values` are left out of the inventory
#[derive(Debug, Clone, Deserialize)]
pub struct SkipDef {
    pub field: String,
    pub values: Vec<String>,
}

impl SkipDef {
    pub fn matches(&self, item: &Value) -> bool {
        let Some(value) = super::step::field_str(item, &self.field) else {
            return false;
        };
        self.values.iter().any(|v| *v == value)
    }
}

/// Where the parents of a child listing come from
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParentSource {
    /// Raw objects accepted by an earlier step of the same generator
    Step(String),
    /// A dedicated parent listing
    Listing(ListingDef),
}

/// Fan-out of a child listing over parent objects
#[derive(Debug, Clone, Deserialize)]
pub struct ParentDef {
    pub source: ParentSource,
    /// Child request parameter -> parent field path
    pub params: BTreeMap<String, String>,
}

/// One enumeration step: lists exactly one resource kind
#[derive(Debug, Clone, Deserialize)]
pub struct StepDef {
    pub kind: String,
    pub list: ListingDef,
    #[serde(default)]
    pub parent: Option<ParentDef>,
    /// One field: native id; several: composite id in this order
    pub id_fields: Vec<String>,
    #[serde(default)]
    pub name_field: Option<String>,
    #[serde(default)]
    pub skip: Option<SkipDef>,
    /// Overrides the generator-level default
    #[serde(default)]
    pub allow_empty_values: Option<Vec<String>>,
}

/// A resource kind the remote API offers no way to enumerate
#[derive(Debug, Clone, Deserialize)]
pub struct UnsupportedKind {
    pub kind: String,
    pub reason: String,
}

/// AWS wire protocol of a service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AwsProtocol {
    /// JSON 1.1 body, dispatched by `X-Amz-Target`
    #[default]
    Json,
    /// Form-encoded `Action`/`Version` request, XML response
    Query,
}

/// Generator definition from JSON
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorDef {
    pub display_name: String,
    /// Filled in from the enclosing provider file and map key
    #[serde(skip)]
    pub provider: String,
    #[serde(skip)]
    pub service: String,
    #[serde(default)]
    pub protocol: AwsProtocol,
    /// `X-Amz-Target` prefix for AWS JSON services
    #[serde(default)]
    pub target_prefix: Option<String>,
    /// `Version` parameter for AWS query services
    #[serde(default)]
    pub api_version: Option<String>,
    /// Endpoint host prefix when it differs from the service name
    #[serde(default)]
    pub endpoint_prefix: Option<String>,
    #[serde(default)]
    pub allow_empty_values: Vec<String>,
    pub steps: Vec<StepDef>,
    #[serde(default)]
    pub unsupported: Vec<UnsupportedKind>,
}

impl GeneratorDef {
    /// Registry key, e.g. `aws/cloudformation`
    pub fn key(&self) -> String {
        format!("{}/{}", self.provider, self.service)
    }

    /// Host prefix used to build the default endpoint
    pub fn endpoint_prefix(&self) -> &str {
        self.endpoint_prefix.as_deref().unwrap_or(&self.service)
    }

    /// Effective allow-empty prefixes for a step
    pub fn allow_empty_for<'a>(&'a self, step: &'a StepDef) -> &'a [String] {
        step.allow_empty_values
            .as_deref()
            .unwrap_or(&self.allow_empty_values)
    }

    /// Check the definition for mistakes a run would only hit halfway
    pub fn validate(&self) -> Result<()> {
        if self.protocol == AwsProtocol::Query && self.api_version.is_none() {
            return Err(DiscoveryError::Definition {
                kind: self.key(),
                reason: "query protocol needs an api_version".to_string(),
            });
        }

        let mut seen: HashSet<&str> = HashSet::new();

        for step in &self.steps {
            let invalid = |reason: &str| DiscoveryError::Definition {
                kind: step.kind.clone(),
                reason: reason.to_string(),
            };

            if step.id_fields.is_empty() {
                return Err(invalid("id_fields must not be empty"));
            }
            if step.list.operation.is_empty() {
                return Err(invalid("list.operation must not be empty"));
            }
            if !step.list.params.is_null() && !step.list.params.is_object() {
                return Err(invalid("list.params must be an object"));
            }
            if let Some(parent) = &step.parent {
                if parent.params.is_empty() {
                    return Err(invalid("parent.params must bind at least one field"));
                }
                if let ParentSource::Step(kind) = &parent.source {
                    if !seen.contains(kind.as_str()) {
                        return Err(invalid(&format!(
                            "parent step {} must run earlier in the same generator",
                            kind
                        )));
                    }
                }
            }
            if !seen.insert(step.kind.as_str()) {
                return Err(invalid("kind is listed by more than one step"));
            }
        }

        Ok(())
    }
}

/// Root structure of resources/*.json
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub provider: String,
    #[serde(default)]
    pub generators: BTreeMap<String, GeneratorDef>,
}

impl ProviderConfig {
    /// Parse one provider file and stamp provider/service onto its generators
    pub fn from_json(content: &str) -> Result<Self> {
        let mut config: ProviderConfig = serde_json::from_str(content).map_err(|e| {
            DiscoveryError::Definition {
                kind: "<provider file>".to_string(),
                reason: e.to_string(),
            }
        })?;

        for (service, def) in config.generators.iter_mut() {
            def.provider = config.provider.clone();
            def.service = service.clone();
            def.validate()?;
        }

        Ok(config)
    }
}

/// All embedded generators, keyed by provider
#[derive(Debug, Clone, Default)]
pub struct Registry {
    pub providers: BTreeMap<String, ProviderConfig>,
}

/// Global registry loaded from JSON
static REGISTRY: OnceLock<Registry> = OnceLock::new();

/// Get the generator registry (loads from embedded JSON on first access)
pub fn get_registry() -> &'static Registry {
    REGISTRY.get_or_init(|| {
        let mut registry = Registry::default();

        for content in PROVIDER_FILES {
            let partial = ProviderConfig::from_json(content)
                .unwrap_or_else(|e| panic!("Failed to load embedded generator JSON: {}", e));
            registry.providers.insert(partial.provider.clone(), partial);
        }

        registry
    })
}

/// Get a generator definition by provider and service
pub fn get_generator_def(provider: &str, service: &str) -> Option<&'static GeneratorDef> {
    get_registry().providers.get(provider)?.generators.get(service)
}

/// Get all generator keys as `provider/service`
pub fn get_all_generator_keys() -> Vec<String> {
    get_registry()
        .providers
        .values()
        .flat_map(|p| p.generators.values().map(|g| g.key()))
        .collect()
}

/// Split a `provider/service` key
pub fn parse_generator_key(key: &str) -> Result<(&str, &str)> {
    match key.split_once('/') {
        Some((provider, service)) if !provider.is_empty() && !service.is_empty() => {
            Ok((provider, service))
        }
        _ => Err(DiscoveryError::config(format!(
            "expected provider/service, got {:?}",
            key
        ))),
    }
}
