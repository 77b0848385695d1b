//! Resource Generator
//!
//! Runs the steps of one generator definition in order against one client.
//! The first failing step ends the run and voids everything gathered so
//! far: a run yields either every descriptor or the error.

use super::descriptor::Resource;
use super::registry::{get_generator_def, parse_generator_key, GeneratorDef, ParentSource};
use super::step::{enumerate, RawObjects};
use crate::client::{connect, ClientSettings, ServiceClient};
use crate::error::{DiscoveryError, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;

/// Something that can discover the resources of one provider service
#[async_trait]
pub trait Generator: Send + Sync {
    fn provider(&self) -> &str;

    fn service(&self) -> &str;

    /// Registry key, e.g. `aws/cloudformation`
    fn key(&self) -> String {
        format!("{}/{}", self.provider(), self.service())
    }

    /// List every resource, or fail with the first error
    async fn discover(&self) -> Result<Vec<Resource>>;
}

/// Progress of one generator run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    /// Step `step` (0-based) is executing
    Running { step: usize },
    Completed,
    /// Step `step` failed; later steps were not attempted
    Failed { step: usize },
}

/// A single, non-resumable execution of a generator definition
pub struct GeneratorRun<'a> {
    def: &'a GeneratorDef,
    client: &'a dyn ServiceClient,
    state: RunState,
}

impl<'a> GeneratorRun<'a> {
    pub fn new(def: &'a GeneratorDef, client: &'a dyn ServiceClient) -> Self {
        Self {
            def,
            client,
            state: RunState::NotStarted,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Execute every step in order
    pub async fn run(&mut self) -> Result<Vec<Resource>> {
        let def = self.def;
        let client = self.client;
        let key = def.key();

        if self.state != RunState::NotStarted {
            return Err(DiscoveryError::config(format!(
                "{} run already started ({:?})",
                key, self.state
            )));
        }

        for unsupported in &def.unsupported {
            tracing::debug!("{}: {} not enumerable: {}", key, unsupported.kind, unsupported.reason);
        }

        // Only keep raw objects that a later step fans out over
        let parent_kinds: HashSet<&str> = def
            .steps
            .iter()
            .filter_map(|s| match s.parent.as_ref().map(|p| &p.source) {
                Some(ParentSource::Step(kind)) => Some(kind.as_str()),
                _ => None,
            })
            .collect();

        let mut resources = Vec::new();
        let mut earlier = RawObjects::new();

        for (idx, step) in def.steps.iter().enumerate() {
            self.state = RunState::Running { step: idx };

            match enumerate(def, step, client, &earlier).await {
                Ok(output) => {
                    tracing::debug!(
                        "{}: {} -> {} resources",
                        key,
                        step.kind,
                        output.resources.len()
                    );
                    resources.extend(output.resources);
                    if parent_kinds.contains(step.kind.as_str()) {
                        earlier.insert(step.kind.clone(), output.raw);
                    }
                }
                Err(err) => {
                    tracing::warn!("{}: {} failed: {}", key, step.kind, err);
                    self.state = RunState::Failed { step: idx };
                    return Err(err);
                }
            }
        }

        self.state = RunState::Completed;
        tracing::info!("{}: discovered {} resources", key, resources.len());
        Ok(resources)
    }
}

/// [`Generator`] backed by a registry definition
pub struct DefinedGenerator<'a> {
    def: &'a GeneratorDef,
    client: Arc<dyn ServiceClient>,
}

impl<'a> DefinedGenerator<'a> {
    pub fn new(def: &'a GeneratorDef, client: Arc<dyn ServiceClient>) -> Self {
        Self { def, client }
    }
}

#[async_trait]
impl<'a> Generator for DefinedGenerator<'a> {
    fn provider(&self) -> &str {
        &self.def.provider
    }

    fn service(&self) -> &str {
        &self.def.service
    }

    async fn discover(&self) -> Result<Vec<Resource>> {
        GeneratorRun::new(self.def, self.client.as_ref()).run().await
    }
}

/// Look up a registered generator and bind it to a client
pub fn build_generator(
    provider: &str,
    service: &str,
    client: Arc<dyn ServiceClient>,
) -> Result<DefinedGenerator<'static>> {
    let Some(def) = get_generator_def(provider, service) else {
        return Err(DiscoveryError::UnknownGenerator {
            provider: provider.to_string(),
            service: service.to_string(),
        });
    };
    Ok(DefinedGenerator::new(def, client))
}

/// Build generators for `provider/service` keys, connecting a client for each.
///
/// Every key is resolved and connected before anything runs, so bad keys
/// and unusable settings fail without a single remote call.
pub fn build_generators(
    keys: &[String],
    settings: &ClientSettings,
) -> Result<Vec<Box<dyn Generator>>> {
    let mut generators: Vec<Box<dyn Generator>> = Vec::with_capacity(keys.len());

    for key in keys {
        let (provider, service) = parse_generator_key(key)?;
        let Some(def) = get_generator_def(provider, service) else {
            return Err(DiscoveryError::UnknownGenerator {
                provider: provider.to_string(),
                service: service.to_string(),
            });
        };
        let client = connect(def, settings)?;
        generators.push(Box::new(DefinedGenerator::new(def, client)));
    }

    Ok(generators)
}
