//! Resource Descriptor
//!
//! The normalized unit of inventory handed to the downstream generator.

use serde::{Deserialize, Serialize};

/// One discovered remote object, normalized
///
/// Fields are private: a descriptor is built once and never changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    id: String,
    name: String,
    kind: String,
    provider: String,
    /// Attribute prefixes the downstream generator must keep even when empty
    #[serde(default)]
    allow_empty_values: Vec<String>,
}

impl Resource {
    /// Create a descriptor with a separate display name
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: &str,
        provider: &str,
        allow_empty_values: &[String],
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: kind.to_string(),
            provider: provider.to_string(),
            allow_empty_values: allow_empty_values.to_vec(),
        }
    }

    /// Create a descriptor whose name is its id
    pub fn named_by_id(
        id: impl Into<String>,
        kind: &str,
        provider: &str,
        allow_empty_values: &[String],
    ) -> Self {
        let id = id.into();
        Self::new(id.clone(), id, kind, provider, allow_empty_values)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn allow_empty_values(&self) -> &[String] {
        &self.allow_empty_values
    }

    /// Whether an empty value for `attribute` must survive downstream pruning
    pub fn keeps_empty(&self, attribute: &str) -> bool {
        self.allow_empty_values
            .iter()
            .any(|prefix| attribute.starts_with(prefix.as_str()))
    }
}
