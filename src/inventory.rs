//! Inventory Collector
//!
//! Runs a set of generators and merges what they found. Each generator
//! owns its result set until it finishes; merging happens afterwards, in
//! the order the generators were given.

use crate::client::http::status_hint;
use crate::error::Result;
use crate::resource::{Generator, Resource};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A generator that produced no inventory
#[derive(Debug, Clone, Serialize)]
pub struct GeneratorFailure {
    pub generator: String,
    pub error: String,
    /// Reported by the service or the transport rather than local setup
    pub remote: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

/// Merged result of one discovery run
#[derive(Debug, Clone, Serialize)]
pub struct Inventory {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub resources: Vec<Resource>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<GeneratorFailure>,
}

impl Inventory {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// How a collector schedules its generators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Schedule {
    #[default]
    Sequential,
    /// All generators at once; results are still merged in order
    Concurrent,
}

/// Runs generators and merges their output
pub struct Collector<'a> {
    generators: Vec<Box<dyn Generator + 'a>>,
    schedule: Schedule,
    continue_on_error: bool,
}

impl<'a> Collector<'a> {
    pub fn new(generators: Vec<Box<dyn Generator + 'a>>) -> Self {
        Self {
            generators,
            schedule: Schedule::default(),
            continue_on_error: true,
        }
    }

    pub fn schedule(mut self, schedule: Schedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// When false, the first failing generator fails the whole collection
    pub fn continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    pub async fn collect(&self) -> Result<Inventory> {
        let run_id = Uuid::new_v4();
        tracing::info!(
            "run {}: {} generators, {:?}",
            run_id,
            self.generators.len(),
            self.schedule
        );

        let outcomes: Vec<Result<Vec<Resource>>> = match self.schedule {
            Schedule::Sequential => {
                let mut outcomes = Vec::with_capacity(self.generators.len());
                for generator in &self.generators {
                    let outcome = generator.discover().await;
                    let failed = outcome.is_err();
                    outcomes.push(outcome);
                    if failed && !self.continue_on_error {
                        break;
                    }
                }
                outcomes
            }
            Schedule::Concurrent => {
                futures::future::join_all(self.generators.iter().map(|g| g.discover())).await
            }
        };

        let mut inventory = Inventory {
            run_id,
            generated_at: Utc::now(),
            resources: Vec::new(),
            failures: Vec::new(),
        };

        for (generator, outcome) in self.generators.iter().zip(outcomes) {
            match outcome {
                Ok(mut resources) => inventory.resources.append(&mut resources),
                Err(err) => {
                    tracing::error!("{} failed: {}", generator.key(), err);
                    if !self.continue_on_error {
                        return Err(err);
                    }
                    let remote = err.is_remote();
                    inventory.failures.push(GeneratorFailure {
                        generator: generator.key(),
                        error: err.to_string(),
                        remote,
                        hint: remote
                            .then(|| status_hint(&err))
                            .flatten()
                            .map(str::to_string),
                    });
                }
            }
        }

        tracing::info!(
            "run {}: {} resources, {} failed generators",
            run_id,
            inventory.resources.len(),
            inventory.failures.len()
        );
        Ok(inventory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiscoveryError;
    use async_trait::async_trait;

    /// Generator returning a canned outcome
    struct Canned {
        service: &'static str,
        ids: Vec<&'static str>,
        fail: bool,
    }

    #[async_trait]
    impl Generator for Canned {
        fn provider(&self) -> &str {
            "test"
        }

        fn service(&self) -> &str {
            self.service
        }

        async fn discover(&self) -> Result<Vec<Resource>> {
            if self.fail {
                return Err(DiscoveryError::Api {
                    operation: format!("List{}", self.service),
                    status: 500,
                    message: "boom".to_string(),
                });
            }
            Ok(self
                .ids
                .iter()
                .map(|id| Resource::named_by_id(*id, self.service, "test", &[]))
                .collect())
        }
    }

    fn canned(service: &'static str, ids: Vec<&'static str>, fail: bool) -> Box<dyn Generator> {
        Box::new(Canned { service, ids, fail })
    }

    #[tokio::test]
    async fn test_merges_in_generator_order() {
        for schedule in [Schedule::Sequential, Schedule::Concurrent] {
            let inventory = Collector::new(vec![
                canned("a", vec!["a1", "a2"], false),
                canned("b", vec!["b1"], false),
            ])
            .schedule(schedule)
            .collect()
            .await
            .unwrap();

            let ids: Vec<&str> = inventory.resources.iter().map(|r| r.id()).collect();
            assert_eq!(ids, vec!["a1", "a2", "b1"]);
            assert!(inventory.is_complete());
        }
    }

    #[tokio::test]
    async fn test_failed_generator_is_recorded_and_others_kept() {
        let inventory = Collector::new(vec![
            canned("a", vec!["a1"], false),
            canned("b", vec!["b1"], true),
            canned("c", vec!["c1"], false),
        ])
        .collect()
        .await
        .unwrap();

        let ids: Vec<&str> = inventory.resources.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["a1", "c1"]);
        assert_eq!(inventory.failures.len(), 1);
        assert_eq!(inventory.failures[0].generator, "test/b");
        assert_eq!(inventory.failures[0].error, "Listb failed with status 500: boom");
        assert!(inventory.failures[0].remote);
        assert!(inventory.failures[0].hint.is_some());
    }

    /// Generator whose definition cannot be used
    struct Misconfigured;

    #[async_trait]
    impl Generator for Misconfigured {
        fn provider(&self) -> &str {
            "test"
        }

        fn service(&self) -> &str {
            "broken"
        }

        async fn discover(&self) -> Result<Vec<Resource>> {
            Err(DiscoveryError::config("no Octopus server configured"))
        }
    }

    #[tokio::test]
    async fn test_local_failure_is_not_remote() {
        let generators: Vec<Box<dyn Generator>> =
            vec![Box::new(Misconfigured), canned("a", vec!["a1"], false)];
        let inventory = Collector::new(generators)
            .collect()
            .await
            .unwrap();

        assert_eq!(inventory.failures.len(), 1);
        let failure = &inventory.failures[0];
        assert_eq!(failure.generator, "test/broken");
        assert!(!failure.remote);
        assert!(failure.hint.is_none());

        let json = serde_json::to_value(failure).unwrap();
        assert_eq!(json["remote"], false);
        assert!(json.get("hint").is_none());
    }

    #[tokio::test]
    async fn test_strict_collection_returns_first_error() {
        let err = Collector::new(vec![
            canned("a", vec!["a1"], false),
            canned("b", vec![], true),
            canned("c", vec!["c1"], false),
        ])
        .continue_on_error(false)
        .collect()
        .await
        .unwrap_err();
        assert!(matches!(err, DiscoveryError::Api { ref operation, .. } if operation == "Listb"));
    }

    #[tokio::test]
    async fn test_inventory_serializes() {
        let inventory = Collector::new(vec![canned("a", vec!["a1"], false)])
            .collect()
            .await
            .unwrap();
        let json = serde_json::to_value(&inventory).unwrap();
        assert_eq!(json["resources"][0]["id"], "a1");
        assert!(json.get("failures").is_none());
    }
}
