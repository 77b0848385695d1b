//! Configuration Management
//!
//! Handles persistent configuration for stackscout. Values resolve as
//! command line > environment > config file > built-in default.

use crate::client::{ClientSettings, FixtureSet};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_AWS_REGION: &str = "us-east-1";
pub const DEFAULT_SERVICE: &str = "aws/cloudformation";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// AWS connection settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AwsConfig {
    #[serde(default)]
    pub region: Option<String>,
    /// Endpoint override (emulator or signing proxy)
    #[serde(default)]
    pub endpoint: Option<String>,
}

/// Octopus Deploy connection settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OctopusConfig {
    #[serde(default)]
    pub server: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub space: Option<String>,
}

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub aws: AwsConfig,
    #[serde(default)]
    pub octopusdeploy: OctopusConfig,
    /// Generators to run when none are given on the command line
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default)]
    pub parallel: bool,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Command line values that take precedence over the file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub octopus_server: Option<String>,
    pub octopus_space: Option<String>,
    pub fixture: Option<PathBuf>,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("stackscout").join("config.json"))
    }

    /// Load configuration from disk, falling back to defaults
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        Self::load_from(&path)
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            tracing::debug!("no config file at {:?}", path);
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("ignoring invalid config {:?}: {}", path, e);
                Self::default()
            }),
            Err(e) => {
                tracing::warn!("cannot read config {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    /// Get effective region (CLI > AWS_REGION > AWS_DEFAULT_REGION > config > us-east-1)
    pub fn effective_region(&self, cli: Option<&str>) -> String {
        self.region_with(cli, env_var)
    }

    fn region_with(&self, cli: Option<&str>, env: impl Fn(&str) -> Option<String>) -> String {
        cli.map(str::to_string)
            .or_else(|| env("AWS_REGION"))
            .or_else(|| env("AWS_DEFAULT_REGION"))
            .or_else(|| self.aws.region.clone())
            .unwrap_or_else(|| DEFAULT_AWS_REGION.to_string())
    }

    /// Get effective Octopus server (CLI > OCTOPUS_URL > config)
    pub fn effective_octopus_server(&self, cli: Option<&str>) -> Option<String> {
        self.octopus_server_with(cli, env_var)
    }

    fn octopus_server_with(
        &self,
        cli: Option<&str>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Option<String> {
        cli.map(str::to_string)
            .or_else(|| env("OCTOPUS_URL"))
            .or_else(|| self.octopusdeploy.server.clone())
    }

    /// Get effective Octopus API key (OCTOPUS_APIKEY > config)
    pub fn effective_octopus_api_key(&self) -> Option<String> {
        self.octopus_api_key_with(env_var)
    }

    fn octopus_api_key_with(&self, env: impl Fn(&str) -> Option<String>) -> Option<String> {
        env("OCTOPUS_APIKEY").or_else(|| self.octopusdeploy.api_key.clone())
    }

    /// Get effective generator selection (CLI > config > aws/cloudformation)
    pub fn effective_services(&self, cli: &[String]) -> Vec<String> {
        if !cli.is_empty() {
            return cli.to_vec();
        }
        if !self.services.is_empty() {
            return self.services.clone();
        }
        vec![DEFAULT_SERVICE.to_string()]
    }

    pub fn effective_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    /// Resolve everything into client settings
    ///
    /// A fixture file that cannot be read is an error; nothing falls back
    /// to live calls silently.
    pub fn client_settings(&self, overrides: &Overrides) -> Result<ClientSettings> {
        let fixtures = match &overrides.fixture {
            Some(path) => Some(Arc::new(FixtureSet::load(path)?)),
            None => None,
        };

        Ok(ClientSettings {
            aws_region: self.effective_region(overrides.region.as_deref()),
            aws_endpoint: overrides
                .endpoint
                .clone()
                .or_else(|| self.aws.endpoint.clone()),
            octopus_server: self.effective_octopus_server(overrides.octopus_server.as_deref()),
            octopus_api_key: self.effective_octopus_api_key(),
            octopus_space: overrides
                .octopus_space
                .clone()
                .or_else(|| self.octopusdeploy.space.clone()),
            timeout: self.effective_timeout(),
            fixtures,
        })
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
